use assistant::errors::{EngineError, RunnerError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

pub const ENV_PREFIX: &str = "ASSISTANT";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {env_var}")]
    MissingEnvVar { env_var: String },

    #[error("Invalid value for {env_var}: {reason}")]
    InvalidValue { env_var: String, reason: String },

    #[error("Configuration error: {0}")]
    Other(#[from] config::ConfigError),
}

/// Environment variable that sets the given config field, e.g. `engine.base_url`
/// becomes `ASSISTANT_ENGINE__BASE_URL`
pub fn to_env_var(field: &str) -> String {
    format!("{}_{}", ENV_PREFIX, field.replace('.', "__").to_uppercase())
}

/// Errors returned by the HTTP handlers, rendered as `{"detail": ...}`
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Runner(#[from] RunnerError),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Engine(EngineError::SessionNotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Runner(_) | ApiError::Engine(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::warn!(error = %self, "request rejected");
        }
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}
