use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Session queries
        .route("/channel", get(handlers::get_channel))
        // Session control
        .route("/channel/join", post(handlers::join_channel))
        .route("/channel/leave", post(handlers::leave_channel))
        .route("/channel/mute", post(handlers::toggle_mute))
        .route("/channel/speaker", post(handlers::toggle_speaker))
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
