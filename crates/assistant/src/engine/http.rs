use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::{future, StreamExt};
use reqwest::header::ACCEPT;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use url::Url;

use super::session::{Session, SessionService};
use super::sse::data_lines;
use super::{ensure_session, Engine, EngineConnector, EventStream, RunRequest, StreamingMode};
use crate::agents::AgentSpec;
use crate::errors::{EngineError, EngineResult};
use crate::models::event::RawEvent;

/// Where to find an engine served over HTTP
#[derive(Debug, Clone)]
pub struct HttpEngineConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl HttpEngineConfig {
    pub fn new<S: Into<String>>(base_url: S) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: Duration::from_secs(300),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn base(&self) -> EngineResult<String> {
        Url::parse(&self.base_url).map_err(|e| {
            EngineError::Configuration(format!("invalid engine url '{}': {}", self.base_url, e))
        })?;
        Ok(self.base_url.trim_end_matches('/').to_string())
    }

    fn client(&self) -> EngineResult<Client> {
        Ok(Client::builder().timeout(self.timeout).build()?)
    }
}

fn sessions_url(base: &str, app_name: &str, user_id: &str) -> String {
    format!(
        "{}/apps/{}/users/{}/sessions",
        base,
        urlencoding::encode(app_name),
        urlencoding::encode(user_id)
    )
}

async fn error_for_status(response: reqwest::Response) -> EngineResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(EngineError::Status {
        status: status.as_u16(),
        body,
    })
}

/// Sessions stored by the engine server itself
pub struct HttpSessionService {
    client: Client,
    base_url: String,
}

impl HttpSessionService {
    pub fn new(config: &HttpEngineConfig) -> EngineResult<Self> {
        Ok(Self {
            client: config.client()?,
            base_url: config.base()?,
        })
    }
}

#[async_trait]
impl SessionService for HttpSessionService {
    async fn create_session(
        &self,
        app_name: &str,
        user_id: &str,
        session_id: Option<String>,
    ) -> EngineResult<Session> {
        let mut url = sessions_url(&self.base_url, app_name, user_id);
        if let Some(id) = &session_id {
            url = format!("{}/{}", url, urlencoding::encode(id));
        }

        let response = self.client.post(&url).json(&json!({})).send().await?;
        let session = error_for_status(response).await?.json().await?;
        Ok(session)
    }

    async fn get_session(
        &self,
        app_name: &str,
        user_id: &str,
        session_id: &str,
    ) -> EngineResult<Option<Session>> {
        let url = format!(
            "{}/{}",
            sessions_url(&self.base_url, app_name, user_id),
            urlencoding::encode(session_id)
        );

        let response = self.client.get(&url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let session = error_for_status(response).await?.json().await?;
        Ok(Some(session))
    }

    async fn list_sessions(&self, app_name: &str, user_id: &str) -> EngineResult<Vec<Session>> {
        let url = sessions_url(&self.base_url, app_name, user_id);
        let response = self.client.get(&url).send().await?;
        Ok(error_for_status(response).await?.json().await?)
    }
}

/// Connects to an engine over its HTTP API
#[derive(Debug, Clone)]
pub struct HttpConnector {
    config: HttpEngineConfig,
}

impl HttpConnector {
    pub fn new(config: HttpEngineConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl EngineConnector for HttpConnector {
    async fn connect(
        &self,
        app_name: &str,
        root_agent: &'static AgentSpec,
        sessions: Arc<dyn SessionService>,
    ) -> EngineResult<Arc<dyn Engine>> {
        tracing::info!(
            base_url = %self.config.base_url,
            app_name,
            root_agent = root_agent.name,
            sub_agents = ?root_agent.sub_agents,
            "connecting to engine"
        );
        let engine = HttpEngine {
            client: self.config.client()?,
            base_url: self.config.base()?,
            sessions,
        };
        Ok(Arc::new(engine))
    }
}

pub struct HttpEngine {
    client: Client,
    base_url: String,
    sessions: Arc<dyn SessionService>,
}

// Payloads carrying an "error" key report a failure inside the engine
fn decode_event(line: &str) -> Option<EngineResult<RawEvent>> {
    let value: Value = match serde_json::from_str(line) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(error = %e, "skipping undecodable engine event");
            return None;
        }
    };

    if let Some(error) = value.get("error") {
        let message = error
            .as_str()
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string());
        return Some(Err(EngineError::Internal(message)));
    }

    match serde_json::from_value(value) {
        Ok(event) => Some(Ok(event)),
        Err(e) => {
            tracing::warn!(error = %e, "skipping engine event with unexpected shape");
            None
        }
    }
}

#[async_trait]
impl Engine for HttpEngine {
    async fn run(&self, request: RunRequest) -> EngineResult<EventStream> {
        ensure_session(
            self.sessions.as_ref(),
            &request.app_name,
            &request.user_id,
            &request.session_id,
        )
        .await?;

        let payload = json!({
            "appName": request.app_name,
            "userId": request.user_id,
            "sessionId": request.session_id,
            "newMessage": request.new_message,
            "streaming": request.streaming == StreamingMode::Sse,
        });

        let response = self
            .client
            .post(format!("{}/run_sse", self.base_url))
            .header(ACCEPT, "text/event-stream")
            .json(&payload)
            .send()
            .await?;
        let response = error_for_status(response).await?;

        let events = data_lines(Box::pin(response.bytes_stream()))
            .filter_map(|line| {
                future::ready(match line {
                    Ok(line) => decode_event(&line),
                    Err(e) => Some(Err(e)),
                })
            })
            .boxed();
        Ok(events)
    }
}
