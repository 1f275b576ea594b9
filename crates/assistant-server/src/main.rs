mod configuration;
mod error;
mod logging;
mod routes;
mod state;

use assistant::engine::http::{HttpConnector, HttpSessionService};
use assistant::engine::SessionService;
use assistant::registry::ProcessorRegistry;
use assistant::runner::AgentRunner;
use assistant::service::AIService;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, Instrument};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let settings = configuration::Settings::new()?;

    logging::init(&settings.logging)?;
    let span = tracing::info_span!("assistant", environment = %settings.app.environment);
    serve(settings).instrument(span).await
}

async fn serve(settings: configuration::Settings) -> anyhow::Result<()> {
    let addr = settings.server.socket_addr()?;
    let app_name = settings.app.name.clone();
    let engine_config = settings.engine.into_config();
    info!(base_url = %engine_config.base_url, "using engine");

    // Sessions live in the engine; the connection itself is opened on the first turn
    let sessions: Arc<dyn SessionService> = Arc::new(HttpSessionService::new(&engine_config)?);
    let registry = ProcessorRegistry::default();
    info!(?registry, "processor registry");

    let runner = AgentRunner::new(
        app_name,
        sessions.clone(),
        Arc::new(HttpConnector::new(engine_config)),
        Arc::new(registry),
    );
    let state = state::AppState::new(AIService::new(runner), sessions);

    // Create router with CORS support
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = routes::configure(state).layer(cors);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
