pub mod health;
pub mod settings;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
    Router,
};

use crate::assistant::handlers as assistant;
use crate::extraction::handlers as extraction;
use crate::state::AppState;

/// Room for multipart framing on top of the largest accepted file.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn build_router(state: AppState) -> Router {
    let limits = state.orchestrator.limits();
    let body_limit = limits.cv_max_bytes.max(limits.job_posting_max_bytes) + MULTIPART_OVERHEAD;

    Router::new()
        .route("/health", get(health::health_handler))
        // Reviews and extraction
        .route("/api/v1/reviews", post(extraction::handle_create_review))
        .route("/api/v1/reviews/:id", get(extraction::handle_get_review))
        .route(
            "/api/v1/reviews/:id/documents",
            post(extraction::handle_upload),
        )
        .route("/api/v1/reviews/:id/text", post(extraction::handle_submit_text))
        .route(
            "/api/v1/reviews/:id/document",
            delete(extraction::handle_clear_document),
        )
        // Assistant
        .route(
            "/api/v1/reviews/:id/assistant",
            post(assistant::handle_open).get(assistant::handle_history),
        )
        .route(
            "/api/v1/reviews/:id/assistant/messages",
            post(assistant::handle_ask),
        )
        // Settings
        .route(
            "/api/v1/settings/credential",
            put(settings::handle_set_credential).delete(settings::handle_delete_credential),
        )
        .route(
            "/api/v1/settings/ghost-mode",
            get(settings::handle_get_ghost_mode).put(settings::handle_set_ghost_mode),
        )
        .route("/api/v1/profile/latest", get(settings::handle_latest_profile))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
