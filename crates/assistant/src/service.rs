use std::sync::Arc;

use futures::stream::BoxStream;
use futures::StreamExt;
use serde_json::Value;
use uuid::Uuid;

use crate::errors::RunnerResult;
use crate::models::content::Content;
use crate::runner::AgentRunner;
use crate::trace::{LogTraceSink, TraceRecord, TraceSink};

/// Entry point used by the API layer
///
/// Wraps the runner and records a trace of every turn that completes.
pub struct AIService {
    runner: AgentRunner,
    trace: Arc<dyn TraceSink>,
}

impl AIService {
    pub fn new(runner: AgentRunner) -> Self {
        Self {
            runner,
            trace: Arc::new(LogTraceSink),
        }
    }

    pub fn with_trace_sink(mut self, trace: Arc<dyn TraceSink>) -> Self {
        self.trace = trace;
        self
    }

    pub fn runner(&self) -> &AgentRunner {
        &self.runner
    }

    /// Run a turn to completion and return the agent's answer as a single message
    pub async fn run(
        &self,
        session_id: Uuid,
        user_message: &str,
        user_id: &str,
    ) -> RunnerResult<Content> {
        let text = self.runner.run(session_id, user_message, user_id).await?;

        self.trace.update_current_trace(TraceRecord {
            user_id: user_id.to_string(),
            session_id,
            input: user_message.to_string(),
            output: text.clone(),
        });

        Ok(Content::message(Uuid::new_v4(), text)
            .with_metadata_entry("session_id", Value::String(session_id.to_string())))
    }

    /// Stream the content of a turn as the runner produces it
    ///
    /// The trace is recorded once the stream has been fully consumed; failed or
    /// abandoned turns are not traced.
    pub async fn run_stream(
        &self,
        session_id: Uuid,
        user_message: &str,
        user_id: &str,
    ) -> RunnerResult<BoxStream<'_, RunnerResult<Content>>> {
        let mut contents = self
            .runner
            .run_stream(session_id, user_message, user_id)
            .await?;
        let input = user_message.to_string();
        let user_id = user_id.to_string();

        Ok(Box::pin(async_stream::try_stream! {
            let mut output = String::new();
            while let Some(content) = contents.next().await {
                let content = content?;
                if let Some(text) = content.text() {
                    output.push_str(text);
                }
                yield content;
            }

            self.trace.update_current_trace(TraceRecord {
                user_id,
                session_id,
                input,
                output,
            });
        }))
    }
}
