//! Route definitions

use axum::{Router, routing::get};

use crate::{handlers, state::AppState};

/// Create the main router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health endpoint
        .route("/health", get(handlers::health::health_check))
        // Messenger webhook
        .route(
            "/webhook",
            get(handlers::webhook::verify_webhook).post(handlers::webhook::handle_webhook),
        )
        // Attach state
        .with_state(state)
}
