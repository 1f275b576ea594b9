use assistant::engine::SessionService;
use assistant::service::AIService;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<AIService>,
    pub sessions: Arc<dyn SessionService>,
    pub app_name: String,
}

impl AppState {
    pub fn new(service: AIService, sessions: Arc<dyn SessionService>) -> Self {
        let app_name = service.runner().app_name().to_string();
        Self {
            service: Arc::new(service),
            sessions,
            app_name,
        }
    }
}
