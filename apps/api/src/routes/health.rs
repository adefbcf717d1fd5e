use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health
/// Service version plus credential and ghost-mode status.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "cvlens-api",
        "credential_configured": state.credential.get().await.is_some(),
        "ghost_mode": state.preferences.ghost_mode(),
    }))
}
