use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::errors::EngineResult;

/// A conversation scope held by the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub app_name: String,
    pub user_id: String,
    /// Seconds since the epoch
    #[serde(default)]
    pub last_update_time: f64,
}

impl Session {
    pub fn new<A, U, I>(app_name: A, user_id: U, id: I) -> Self
    where
        A: Into<String>,
        U: Into<String>,
        I: Into<String>,
    {
        Self {
            id: id.into(),
            app_name: app_name.into(),
            user_id: user_id.into(),
            last_update_time: Utc::now().timestamp_millis() as f64 / 1000.0,
        }
    }
}

/// Creation and lookup of engine sessions
#[async_trait]
pub trait SessionService: Send + Sync {
    /// Create a session, with a generated id when `session_id` is `None`
    async fn create_session(
        &self,
        app_name: &str,
        user_id: &str,
        session_id: Option<String>,
    ) -> EngineResult<Session>;

    async fn get_session(
        &self,
        app_name: &str,
        user_id: &str,
        session_id: &str,
    ) -> EngineResult<Option<Session>>;

    async fn list_sessions(&self, app_name: &str, user_id: &str) -> EngineResult<Vec<Session>>;
}

type SessionKey = (String, String, String);

/// Sessions kept in process memory, lost on restart
#[derive(Debug, Default)]
pub struct InMemorySessionService {
    sessions: RwLock<HashMap<SessionKey, Session>>,
}

impl InMemorySessionService {
    pub fn new() -> Self {
        Self::default()
    }
}

fn key(app_name: &str, user_id: &str, session_id: &str) -> SessionKey {
    (
        app_name.to_string(),
        user_id.to_string(),
        session_id.to_string(),
    )
}

#[async_trait]
impl SessionService for InMemorySessionService {
    async fn create_session(
        &self,
        app_name: &str,
        user_id: &str,
        session_id: Option<String>,
    ) -> EngineResult<Session> {
        let session_id = session_id.unwrap_or_else(|| Uuid::new_v4().to_string());
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .entry(key(app_name, user_id, &session_id))
            .or_insert_with(|| Session::new(app_name, user_id, session_id.clone()))
            .clone();
        Ok(session)
    }

    async fn get_session(
        &self,
        app_name: &str,
        user_id: &str,
        session_id: &str,
    ) -> EngineResult<Option<Session>> {
        let sessions = self.sessions.read().await;
        Ok(sessions.get(&key(app_name, user_id, session_id)).cloned())
    }

    async fn list_sessions(&self, app_name: &str, user_id: &str) -> EngineResult<Vec<Session>> {
        let sessions = self.sessions.read().await;
        let mut found: Vec<Session> = sessions
            .values()
            .filter(|s| s.app_name == app_name && s.user_id == user_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(found)
    }
}
