use super::handlers;
use super::state::AppState;
use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Text agents
        .route("/agent/generate", post(handlers::generate_response))
        .route("/agent/review", post(handlers::review_response))
        .route("/agent/rewrite", post(handlers::rewrite_response))
        .route("/agent/chat", post(handlers::chat))
        // Uploaded question files
        .route("/files/extract", post(handlers::extract_file))
        // Voice sessions
        .route("/voice/sessions", post(handlers::create_session))
        .route("/voice/sessions/:session_id", delete(handlers::delete_session))
        .route(
            "/voice/sessions/:session_id/record/start",
            post(handlers::start_recording),
        )
        .route(
            "/voice/sessions/:session_id/record/stop",
            post(handlers::stop_recording),
        )
        .route("/voice/sessions/:session_id/play", post(handlers::play_audio))
        .route("/voice/sessions/:session_id/stop", post(handlers::stop_audio))
        .route(
            "/voice/sessions/:session_id/waveform",
            post(handlers::waveform),
        )
        .route("/voice/respond", post(handlers::respond_with_voice))
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
