//! Interface to the multi-agent execution engine.
//!
//! The engine runs the agents; this crate only submits turns to it and consumes the
//! events it emits. [`http`] talks to an engine exposed over HTTP, [`mock`] replays
//! scripted events in-process.
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

use crate::agents::AgentSpec;
use crate::errors::EngineResult;
use crate::models::event::{EventContent, RawEvent};

pub mod http;
pub mod mock;
pub mod session;
mod sse;

pub use session::{InMemorySessionService, Session, SessionService};

/// How the engine should deliver events for a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamingMode {
    /// Complete events only
    #[default]
    None,
    /// Incremental delivery, text may arrive as partial fragments
    Sse,
}

/// One user turn submitted to the engine
#[derive(Debug, Clone, PartialEq)]
pub struct RunRequest {
    pub app_name: String,
    pub user_id: String,
    pub session_id: String,
    pub new_message: EventContent,
    pub streaming: StreamingMode,
}

/// Events of one run, in the order the engine emitted them
pub type EventStream = BoxStream<'static, EngineResult<RawEvent>>;

/// A live connection to the engine, bound to a root agent
///
/// Every call to [`Engine::run`] opens an independent event stream, so one
/// connection can serve interleaved turns. Dropping the stream abandons the run.
#[async_trait]
pub trait Engine: Send + Sync {
    /// Submit a turn and return the stream of events it produces
    async fn run(&self, request: RunRequest) -> EngineResult<EventStream>;
}

/// Opens engine connections
#[async_trait]
pub trait EngineConnector: Send + Sync {
    /// Connect to the engine for the given application, rooted at `root_agent`, with
    /// conversation state kept by `sessions`
    async fn connect(
        &self,
        app_name: &str,
        root_agent: &'static AgentSpec,
        sessions: Arc<dyn SessionService>,
    ) -> EngineResult<Arc<dyn Engine>>;
}

/// Look up the session a turn is submitted against, creating it if the engine has
/// never seen it
///
/// Concurrent first turns on the same id may both try to create it. The loser's
/// create fails, so a failed create is followed by one more lookup.
pub async fn ensure_session(
    sessions: &dyn SessionService,
    app_name: &str,
    user_id: &str,
    session_id: &str,
) -> EngineResult<Session> {
    if let Some(session) = sessions.get_session(app_name, user_id, session_id).await? {
        return Ok(session);
    }

    tracing::info!(app_name, user_id, session_id, "creating engine session");
    match sessions
        .create_session(app_name, user_id, Some(session_id.to_string()))
        .await
    {
        Ok(session) => Ok(session),
        Err(e) => match sessions.get_session(app_name, user_id, session_id).await {
            Ok(Some(session)) => {
                tracing::debug!(session_id, error = %e, "session created concurrently");
                Ok(session)
            }
            _ => Err(e),
        },
    }
}
