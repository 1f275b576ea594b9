use std::sync::Arc;

use futures::stream::BoxStream;
use futures::StreamExt;
use tokio::sync::OnceCell;
use uuid::Uuid;

use crate::agents::ORCHESTRATOR_AGENT;
use crate::engine::{Engine, EngineConnector, RunRequest, SessionService, StreamingMode};
use crate::errors::{EngineResult, RunnerError, RunnerResult};
use crate::models::content::Content;
use crate::models::event::{EventContent, RawEvent};
use crate::registry::ProcessorRegistry;

/// Lifecycle of a single run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    NotStarted,
    Streaming,
    Complete,
    Failed,
}

impl RunState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunState::NotStarted => "not_started",
            RunState::Streaming => "streaming",
            RunState::Complete => "complete",
            RunState::Failed => "failed",
        }
    }
}

fn transition(session_id: Uuid, turn_id: Uuid, state: RunState) {
    tracing::debug!(%session_id, %turn_id, state = state.as_str(), "run state changed");
}

/// Drives turns through the engine and turns its events into client content
///
/// The engine connection is opened on first use and reused by every later run.
/// Events are routed to the processors registered for their author; content is
/// produced in arrival order and nothing is buffered across events.
pub struct AgentRunner {
    app_name: String,
    sessions: Arc<dyn SessionService>,
    connector: Arc<dyn EngineConnector>,
    registry: Arc<ProcessorRegistry>,
    engine: OnceCell<Arc<dyn Engine>>,
}

impl AgentRunner {
    pub fn new<S: Into<String>>(
        app_name: S,
        sessions: Arc<dyn SessionService>,
        connector: Arc<dyn EngineConnector>,
        registry: Arc<ProcessorRegistry>,
    ) -> Self {
        Self {
            app_name: app_name.into(),
            sessions,
            connector,
            registry,
            engine: OnceCell::new(),
        }
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    async fn engine(&self) -> EngineResult<Arc<dyn Engine>> {
        let engine = self
            .engine
            .get_or_try_init(|| async {
                self.connector
                    .connect(&self.app_name, &ORCHESTRATOR_AGENT, self.sessions.clone())
                    .await
            })
            .await?;
        Ok(engine.clone())
    }

    fn request(
        &self,
        session_id: Uuid,
        user_message: &str,
        user_id: &str,
        streaming: StreamingMode,
    ) -> RunRequest {
        RunRequest {
            app_name: self.app_name.clone(),
            user_id: user_id.to_string(),
            session_id: session_id.to_string(),
            new_message: EventContent::user_text(user_message),
            streaming,
        }
    }

    /// Content produced for a single event by the processors of its author
    pub fn process_event(&self, event: &RawEvent, session_id: Uuid, turn_id: Uuid) -> Vec<Content> {
        if event.is_user_echo() {
            return Vec::new();
        }

        let author = event.author_or_unknown();
        let mut contents = Vec::new();
        for processor in self.registry.get_processors(author) {
            let produced = processor.process_event(event, session_id, turn_id);
            tracing::trace!(
                author,
                processor = processor.name(),
                count = produced.len(),
                "processed event"
            );
            contents.extend(produced);
        }
        contents
    }

    /// Submit a user message and stream the content it produces
    ///
    /// Every item shares one freshly generated id. Dropping the stream abandons the
    /// run upstream.
    pub async fn run_stream(
        &self,
        session_id: Uuid,
        user_message: &str,
        user_id: &str,
    ) -> RunnerResult<BoxStream<'_, RunnerResult<Content>>> {
        let turn_id = Uuid::new_v4();
        transition(session_id, turn_id, RunState::NotStarted);

        let engine = self.engine().await?;
        let mut events = engine
            .run(self.request(session_id, user_message, user_id, StreamingMode::Sse))
            .await
            .map_err(|e| {
                transition(session_id, turn_id, RunState::Failed);
                RunnerError::from(e)
            })?;
        transition(session_id, turn_id, RunState::Streaming);

        Ok(Box::pin(async_stream::try_stream! {
            while let Some(event) = events.next().await {
                let event = match event {
                    Ok(event) => event,
                    Err(e) => {
                        tracing::error!(%session_id, error = %e, "engine failed mid-run");
                        transition(session_id, turn_id, RunState::Failed);
                        Err(RunnerError::from(e))?
                    }
                };

                for content in self.process_event(&event, session_id, turn_id) {
                    tracing::debug!(
                        %session_id,
                        author = event.author_or_unknown(),
                        content_type = content.content_type.as_str(),
                        "emitting content"
                    );
                    yield content;
                }
            }
            transition(session_id, turn_id, RunState::Complete);
        }))
    }

    /// Submit a user message and wait for the agent's final answer
    ///
    /// Tool activity along the way is not reported. Events authored by the user are
    /// never taken as the answer, even when they look final, so an echoed question
    /// cannot be returned. Fails when the engine finishes without a final response.
    pub async fn run(
        &self,
        session_id: Uuid,
        user_message: &str,
        user_id: &str,
    ) -> RunnerResult<String> {
        let engine = self.engine().await?;
        let mut events = engine
            .run(self.request(session_id, user_message, user_id, StreamingMode::None))
            .await?;

        let mut final_event: Option<RawEvent> = None;
        while let Some(event) = events.next().await {
            let event = event?;
            if event.is_user_echo() {
                continue;
            }
            if event.is_final_response() {
                final_event = Some(event);
            } else {
                tracing::debug!(
                    %session_id,
                    author = event.author_or_unknown(),
                    "ignoring intermediate event"
                );
            }
        }

        match final_event {
            Some(event) => Ok(event.first_text().unwrap_or_default().to_string()),
            None => {
                tracing::warn!(%session_id, "engine finished without a final response");
                Err(RunnerError::NoFinalResponse { session_id })
            }
        }
    }
}
