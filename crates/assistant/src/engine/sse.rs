use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt};

use crate::errors::{EngineError, EngineResult};

/// Split a chunked SSE body into the payloads of its `data:` lines
///
/// Comments, blank lines and other fields are dropped. A transport error ends the
/// stream after being yielded once. A trailing line without a newline is still
/// delivered when the body ends.
pub(crate) fn data_lines<S>(byte_stream: S) -> impl Stream<Item = EngineResult<String>> + Send
where
    S: Stream<Item = Result<Bytes, reqwest::Error>> + Send + Unpin + 'static,
{
    futures::stream::unfold(
        (byte_stream, BytesMut::with_capacity(8192), false),
        |(mut stream, mut buffer, done)| async move {
            if done {
                return None;
            }

            loop {
                if let Some(newline) = buffer.iter().position(|&b| b == b'\n') {
                    let mut line = buffer.split_to(newline + 1);
                    line.truncate(line.len() - 1);
                    if line.last() == Some(&b'\r') {
                        line.truncate(line.len() - 1);
                    }

                    let Ok(line) = std::str::from_utf8(&line) else {
                        tracing::warn!("skipping SSE line with invalid UTF-8");
                        continue;
                    };
                    if let Some(data) = extract_data(line) {
                        return Some((Ok(data), (stream, buffer, false)));
                    }
                    continue;
                }

                match stream.next().await {
                    Some(Ok(chunk)) => buffer.extend_from_slice(&chunk),
                    Some(Err(e)) => {
                        return Some((Err(EngineError::Transport(e)), (stream, buffer, true)));
                    }
                    None => {
                        let rest = std::str::from_utf8(&buffer)
                            .ok()
                            .and_then(extract_data);
                        buffer.clear();
                        return rest.map(|data| (Ok(data), (stream, buffer, true)));
                    }
                }
            }
        },
    )
}

fn extract_data(line: &str) -> Option<String> {
    let line = line.trim();
    if line.is_empty() || line.starts_with(':') {
        return None;
    }

    let data = line
        .strip_prefix("data:")
        .map(str::trim)
        .filter(|data| !data.is_empty() && *data != "[DONE]")?;
    Some(data.to_string())
}
