use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use tokio::sync::Mutex;

use super::session::SessionService;
use super::{ensure_session, Engine, EngineConnector, EventStream, RunRequest};
use crate::agents::AgentSpec;
use crate::errors::{EngineError, EngineResult};
use crate::models::event::RawEvent;

/// How a scripted run should fail
#[derive(Debug, Clone)]
pub enum MockFailure {
    /// `run` itself returns the error
    AtStart(String),
    /// The stream yields the error after this many events
    AfterEvents(usize, String),
}

/// An engine that replays the same pre-configured events on every run, for testing
///
/// Clones share the recorded requests and the pulled-event counter, so a test can
/// keep a handle while the runner owns another.
#[derive(Clone)]
pub struct MockEngine {
    events: Arc<Vec<RawEvent>>,
    failure: Option<MockFailure>,
    delay: Option<Duration>,
    sessions: Option<Arc<dyn SessionService>>,
    requests: Arc<Mutex<Vec<RunRequest>>>,
    pulled: Arc<AtomicUsize>,
}

impl MockEngine {
    pub fn new(events: Vec<RawEvent>) -> Self {
        Self {
            events: Arc::new(events),
            failure: None,
            delay: None,
            sessions: None,
            requests: Arc::new(Mutex::new(Vec::new())),
            pulled: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_failure(mut self, failure: MockFailure) -> Self {
        self.failure = Some(failure);
        self
    }

    /// Wait this long before emitting each event
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Create sessions on first use, like a real engine would
    pub fn with_sessions(mut self, sessions: Arc<dyn SessionService>) -> Self {
        self.sessions = Some(sessions);
        self
    }

    /// Every request submitted so far, oldest first
    pub async fn requests(&self) -> Vec<RunRequest> {
        self.requests.lock().await.clone()
    }

    /// Number of events consumers have pulled across all runs
    pub fn pulled_events(&self) -> usize {
        self.pulled.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Engine for MockEngine {
    async fn run(&self, request: RunRequest) -> EngineResult<EventStream> {
        if let Some(sessions) = &self.sessions {
            ensure_session(
                sessions.as_ref(),
                &request.app_name,
                &request.user_id,
                &request.session_id,
            )
            .await?;
        }
        self.requests.lock().await.push(request);

        let fail_after = match &self.failure {
            Some(MockFailure::AtStart(message)) => {
                return Err(EngineError::Internal(message.clone()))
            }
            Some(MockFailure::AfterEvents(count, message)) => Some((*count, message.clone())),
            None => None,
        };

        let events = self.events.clone();
        let delay = self.delay;
        let pulled = self.pulled.clone();
        let stream = async_stream::stream! {
            for (index, event) in events.iter().enumerate() {
                if let Some((count, message)) = &fail_after {
                    if index == *count {
                        yield Err(EngineError::Internal(message.clone()));
                        return;
                    }
                }
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                pulled.fetch_add(1, Ordering::SeqCst);
                yield Ok(event.clone());
            }
            if let Some((count, message)) = fail_after {
                if count >= events.len() {
                    yield Err(EngineError::Internal(message));
                }
            }
        };
        Ok(stream.boxed())
    }
}

/// Hands out a [`MockEngine`] and counts how often it was asked to
pub struct MockConnector {
    engine: MockEngine,
    connects: AtomicUsize,
}

impl MockConnector {
    pub fn new(engine: MockEngine) -> Self {
        Self {
            engine,
            connects: AtomicUsize::new(0),
        }
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EngineConnector for MockConnector {
    async fn connect(
        &self,
        _app_name: &str,
        _root_agent: &'static AgentSpec,
        sessions: Arc<dyn SessionService>,
    ) -> EngineResult<Arc<dyn Engine>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(self.engine.clone().with_sessions(sessions)))
    }
}
