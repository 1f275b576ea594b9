use crate::error::ApiError;
use crate::state::AppState;
use assistant::engine::Session;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const INTRO_MESSAGE: &str = "Hello, how can I help you today?";

#[derive(Debug, Deserialize, Serialize)]
struct CreateSessionRequest {
    user_id: String,
}

#[derive(Debug, Deserialize, Serialize)]
struct CreateSessionResponse {
    session_id: Uuid,
    intro_message: String,
}

#[derive(Debug, Deserialize, Serialize)]
struct SessionResponse {
    session_id: String,
    user_id: String,
    app_name: String,
    last_update_time: f64,
}

impl From<Session> for SessionResponse {
    fn from(session: Session) -> Self {
        Self {
            session_id: session.id,
            user_id: session.user_id,
            app_name: session.app_name,
            last_update_time: session.last_update_time,
        }
    }
}

async fn create_session(
    State(state): State<AppState>,
    Json(request): Json<CreateSessionRequest>,
) -> Result<(StatusCode, Json<CreateSessionResponse>), ApiError> {
    tracing::info!(user_id = %request.user_id, "creating new session");

    let session_id = Uuid::new_v4();
    let session = state
        .sessions
        .create_session(
            &state.app_name,
            &request.user_id,
            Some(session_id.to_string()),
        )
        .await?;

    tracing::info!(session_id = %session.id, user_id = %request.user_id, "created session");
    Ok((
        StatusCode::CREATED,
        Json(CreateSessionResponse {
            session_id,
            intro_message: INTRO_MESSAGE.to_string(),
        }),
    ))
}

async fn get_session(
    State(state): State<AppState>,
    Path((user_id, session_id)): Path<(String, String)>,
) -> Result<Json<SessionResponse>, ApiError> {
    let session = state
        .sessions
        .get_session(&state.app_name, &user_id, &session_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Session with ID {} not found", session_id)))?;

    Ok(Json(session.into()))
}

// Configure routes for this module
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/session", post(create_session))
        .route("/session/:user_id/:session_id", get(get_session))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::configure;
    use crate::routes::test_support::{body_json, json_request, test_state};
    use assistant::engine::mock::MockEngine;
    use axum::{body::Body, http::Request};
    use serde_json::json;
    use tower::ServiceExt;

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_create_and_fetch_session() {
        let app = configure(test_state(MockEngine::new(Vec::new())));

        let response = app
            .clone()
            .oneshot(json_request("POST", "/api/v1/session", json!({"user_id": "user-1"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let created: CreateSessionResponse =
            serde_json::from_value(body_json(response).await).unwrap();
        assert_eq!(created.intro_message, INTRO_MESSAGE);

        let response = app
            .clone()
            .oneshot(get(&format!("/api/v1/session/user-1/{}", created.session_id)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let fetched: SessionResponse = serde_json::from_value(body_json(response).await).unwrap();
        assert_eq!(fetched.session_id, created.session_id.to_string());
        assert_eq!(fetched.user_id, "user-1");
        assert_eq!(fetched.app_name, "ai_assistant");
    }

    #[tokio::test]
    async fn test_unknown_session() {
        let app = configure(test_state(MockEngine::new(Vec::new())));

        let response = app
            .clone()
            .oneshot(get("/api/v1/session/user-1/missing"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            body_json(response).await,
            json!({"detail": "Session with ID missing not found"})
        );
    }

    #[tokio::test]
    async fn test_session_belongs_to_user() {
        let app = configure(test_state(MockEngine::new(Vec::new())));

        let response = app
            .clone()
            .oneshot(json_request("POST", "/api/v1/session", json!({"user_id": "owner"})))
            .await
            .unwrap();
        let created: CreateSessionResponse =
            serde_json::from_value(body_json(response).await).unwrap();

        let response = app
            .oneshot(get(&format!("/api/v1/session/someone-else/{}", created.session_id)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_create_requires_user_id() {
        let app = configure(test_state(MockEngine::new(Vec::new())));

        let response = app
            .oneshot(json_request("POST", "/api/v1/session", json!({})))
            .await
            .unwrap();
        assert!(response.status().is_client_error());
    }
}
