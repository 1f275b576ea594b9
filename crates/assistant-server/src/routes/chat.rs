use crate::error::ApiError;
use crate::state::AppState;
use assistant::models::content::Content;
use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use bytes::Bytes;
use futures::{stream::StreamExt, Stream};
use serde::Deserialize;
use serde_json::json;
use std::{
    convert::Infallible,
    pin::Pin,
    task::{Context, Poll},
    time::Duration,
};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_stream::wrappers::ReceiverStream;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
struct ChatRequest {
    session_id: Uuid,
    user_id: String,
    message: String,
}

// Server-sent events body fed by the task driving the run
pub struct SseResponse {
    rx: ReceiverStream<String>,
}

impl SseResponse {
    fn new(rx: ReceiverStream<String>) -> Self {
        Self { rx }
    }
}

impl Stream for SseResponse {
    type Item = Result<Bytes, Infallible>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.rx)
            .poll_next(cx)
            .map(|opt| opt.map(|s| Ok(Bytes::from(s))))
    }
}

impl IntoResponse for SseResponse {
    fn into_response(self) -> axum::response::Response {
        let body = axum::body::Body::from_stream(self);

        (
            [
                (header::CONTENT_TYPE, "text/event-stream"),
                (header::CACHE_CONTROL, "no-cache"),
                (header::CONNECTION, "keep-alive"),
            ],
            body,
        )
            .into_response()
    }
}

// Each frame is a single `data:` line followed by a blank line
struct SseFormatter;

impl SseFormatter {
    fn format_content(content: &Content) -> Option<String> {
        match serde_json::to_string(content) {
            Ok(encoded) => Some(format!("data: {}\n\n", encoded)),
            Err(e) => {
                tracing::error!("Failed to encode content: {}", e);
                None
            }
        }
    }

    fn format_done(session_id: Uuid) -> String {
        let done = json!({
            "done": true,
            "metadata": {"session_id": session_id},
        });
        format!("data: {}\n\n", done)
    }

    fn format_error(session_id: Uuid, message: &str) -> String {
        let error = json!({
            "error": message,
            "session_id": session_id,
        });
        format!("data: {}\n\n", error)
    }
}

async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<Content>, ApiError> {
    tracing::info!(session_id = %request.session_id, "new chat request");

    let content = state
        .service
        .run(request.session_id, &request.message, &request.user_id)
        .await?;

    Ok(Json(content))
}

async fn chat_stream(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> SseResponse {
    tracing::info!(session_id = %request.session_id, "new chat stream request");

    // Create channel for streaming
    let (tx, rx) = mpsc::channel(100);
    let stream = ReceiverStream::new(rx);

    let service = state.service.clone();
    let ChatRequest {
        session_id,
        user_id,
        message,
    } = request;

    // Spawn task to handle streaming
    tokio::spawn(async move {
        let mut stream = match service.run_stream(session_id, &message, &user_id).await {
            Ok(stream) => stream,
            Err(e) => {
                tracing::error!(%session_id, "Failed to start stream: {}", e);
                let _ = tx
                    .send(SseFormatter::format_error(session_id, &e.to_string()))
                    .await;
                return;
            }
        };

        loop {
            tokio::select! {
                response = timeout(Duration::from_millis(500), stream.next()) => {
                    match response {
                        Ok(Some(Ok(content))) => {
                            let Some(frame) = SseFormatter::format_content(&content) else {
                                continue;
                            };
                            if let Err(e) = tx.send(frame).await {
                                tracing::info!(%session_id, "Client went away: {}", e);
                                return;
                            }
                        }
                        Ok(Some(Err(e))) => {
                            tracing::error!(%session_id, "Error during streaming: {}", e);
                            let _ = tx
                                .send(SseFormatter::format_error(session_id, &e.to_string()))
                                .await;
                            return;
                        }
                        Ok(None) => {
                            break;
                        }
                        Err(_) => { // Heartbeat, used to detect disconnected clients and abandon the run.
                            if tx.is_closed() {
                                tracing::info!(%session_id, "Client disconnected, abandoning run");
                                return;
                            }
                            continue;
                        }
                    }
                }
            }
        }

        tracing::info!(%session_id, "Stream completed");
        let _ = tx.send(SseFormatter::format_done(session_id)).await;
    });

    SseResponse::new(stream)
}

// Configure routes for this module
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/chat", post(chat))
        .route("/chat/stream", post(chat_stream))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::configure;
    use crate::routes::test_support::{body_bytes, body_json, json_request, test_state};
    use assistant::engine::mock::{MockEngine, MockFailure};
    use assistant::models::event::RawEvent;
    use axum::http::StatusCode;
    use serde_json::Value;
    use tower::ServiceExt;

    fn weather_events() -> Vec<RawEvent> {
        vec![
            RawEvent::text("user", "Weather in Lisbon?"),
            RawEvent::text("orchestrator", "Let me check."),
            RawEvent::function_call("weather_assistant", "get_weather", json!({"location": "Lisbon"})),
            RawEvent::function_response("weather_assistant", "get_weather", json!({"temperature": 25})),
            RawEvent::text("weather_assistant", "It is 25C in Lisbon."),
        ]
    }

    fn chat_body(session_id: Uuid) -> Value {
        json!({
            "session_id": session_id,
            "user_id": "user-1",
            "message": "Weather in Lisbon?",
        })
    }

    fn frames(body: &[u8]) -> Vec<Value> {
        std::str::from_utf8(body)
            .unwrap()
            .split("\n\n")
            .filter(|frame| !frame.is_empty())
            .map(|frame| serde_json::from_str(frame.strip_prefix("data: ").unwrap()).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_chat_returns_final_message() {
        let app = configure(test_state(MockEngine::new(weather_events())));
        let session_id = Uuid::new_v4();

        let response = app
            .oneshot(json_request("POST", "/api/v1/chat", chat_body(session_id)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["type"], json!("message"));
        assert_eq!(body["data"]["text"], json!("It is 25C in Lisbon."));
        assert_eq!(body["metadata"]["session_id"], json!(session_id.to_string()));
    }

    #[tokio::test]
    async fn test_chat_without_final_response() {
        let app = configure(test_state(MockEngine::new(vec![RawEvent::function_call(
            "weather_assistant",
            "get_weather",
            json!({}),
        )])));

        let response = app
            .oneshot(json_request("POST", "/api/v1/chat", chat_body(Uuid::new_v4())))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(response).await;
        assert!(body["detail"]
            .as_str()
            .unwrap()
            .starts_with("No final response from agent"));
    }

    #[tokio::test]
    async fn test_chat_rejects_malformed_request() {
        let app = configure(test_state(MockEngine::new(weather_events())));

        let response = app
            .oneshot(json_request(
                "POST",
                "/api/v1/chat",
                json!({"session_id": "not-a-uuid", "user_id": "user-1", "message": "hi"}),
            ))
            .await
            .unwrap();
        assert!(response.status().is_client_error());
    }

    #[tokio::test]
    async fn test_stream_frames() {
        let app = configure(test_state(MockEngine::new(weather_events())));
        let session_id = Uuid::new_v4();

        let response = app
            .oneshot(json_request("POST", "/api/v1/chat/stream", chat_body(session_id)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get("content-type").unwrap(),
            "text/event-stream"
        );

        let frames = frames(&body_bytes(response).await);
        assert_eq!(frames.len(), 4);

        let types: Vec<_> = frames[..3].iter().map(|f| f["type"].clone()).collect();
        assert_eq!(types, vec![json!("message"), json!("loader"), json!("message")]);
        assert_eq!(frames[0]["id"], frames[2]["id"]);
        assert_eq!(frames[1]["data"]["show_spinner"], json!(true));

        assert_eq!(
            frames[3],
            json!({"done": true, "metadata": {"session_id": session_id.to_string()}})
        );
    }

    #[tokio::test]
    async fn test_stream_error_frame() {
        let engine = MockEngine::new(weather_events())
            .with_failure(MockFailure::AfterEvents(2, "engine crashed".to_string()));
        let app = configure(test_state(engine));
        let session_id = Uuid::new_v4();

        let response = app
            .oneshot(json_request("POST", "/api/v1/chat/stream", chat_body(session_id)))
            .await
            .unwrap();

        let frames = frames(&body_bytes(response).await);
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0]["data"]["text"], json!("Let me check."));
        assert_eq!(
            frames[1],
            json!({"error": "Internal error: engine crashed", "session_id": session_id.to_string()})
        );
    }

    #[tokio::test]
    async fn test_stream_start_failure() {
        let engine =
            MockEngine::new(Vec::new()).with_failure(MockFailure::AtStart("unavailable".to_string()));
        let app = configure(test_state(engine));

        let response = app
            .oneshot(json_request("POST", "/api/v1/chat/stream", chat_body(Uuid::new_v4())))
            .await
            .unwrap();

        let frames = frames(&body_bytes(response).await);
        assert_eq!(frames.len(), 1);
        assert!(frames[0].get("error").is_some());
        assert!(frames[0].get("done").is_none());
    }

    #[tokio::test]
    async fn test_client_disconnect_abandons_run() {
        let engine = MockEngine::new(weather_events()).with_delay(Duration::from_millis(200));
        let app = configure(test_state(engine.clone()));

        let response = app
            .oneshot(json_request("POST", "/api/v1/chat/stream", chat_body(Uuid::new_v4())))
            .await
            .unwrap();
        drop(response);

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(engine.pulled_events() < weather_events().len());
    }
}
