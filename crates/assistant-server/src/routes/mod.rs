// Export route modules
pub mod chat;
pub mod health;
pub mod session;

use crate::state::AppState;
use axum::Router;

// Function to configure all routes
pub fn configure(state: AppState) -> Router {
    Router::new()
        .merge(health::routes())
        .nest(
            "/api/v1",
            Router::new()
                .merge(session::routes(state.clone()))
                .merge(chat::routes(state)),
        )
}
