use thiserror::Error;
use uuid::Uuid;

/// Failures talking to the execution engine
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Engine request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Engine returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid engine configuration: {0}")]
    Configuration(String),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type EngineResult<T> = Result<T, EngineError>;

/// Failures of a single agent run
#[derive(Error, Debug)]
pub enum RunnerError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// The engine ended the run without ever producing a terminal answer
    #[error("No final response from agent for session {session_id}")]
    NoFinalResponse { session_id: Uuid },
}

pub type RunnerResult<T> = Result<T, RunnerError>;
