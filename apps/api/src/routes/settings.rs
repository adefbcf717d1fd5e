use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::AppError;
use crate::models::profile::CanonicalProfile;
use crate::state::AppState;
use crate::store::CREDENTIAL_KEY;

#[derive(Debug, Deserialize)]
pub struct CredentialRequest {
    pub api_key: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GhostMode {
    pub enabled: bool,
}

/// PUT /api/v1/settings/credential
/// Persists the key and swaps it into the running LLM clients.
pub async fn handle_set_credential(
    State(state): State<AppState>,
    Json(req): Json<CredentialRequest>,
) -> Result<StatusCode, AppError> {
    let key = req.api_key.trim();
    if key.is_empty() {
        return Err(AppError::BadRequest("api_key must not be empty".to_string()));
    }
    state.store.set(CREDENTIAL_KEY, key).await?;
    state.credential.set(Some(key.to_string())).await;
    info!("API credential updated");
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/v1/settings/credential
pub async fn handle_delete_credential(
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    state.store.delete(CREDENTIAL_KEY).await?;
    state.credential.set(None).await;
    info!("API credential removed");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/settings/ghost-mode
pub async fn handle_get_ghost_mode(State(state): State<AppState>) -> Json<GhostMode> {
    Json(GhostMode {
        enabled: state.preferences.ghost_mode(),
    })
}

/// PUT /api/v1/settings/ghost-mode
pub async fn handle_set_ghost_mode(
    State(state): State<AppState>,
    Json(req): Json<GhostMode>,
) -> Result<Json<GhostMode>, AppError> {
    state.preferences.set_ghost_mode(req.enabled).await?;
    Ok(Json(GhostMode {
        enabled: state.preferences.ghost_mode(),
    }))
}

/// GET /api/v1/profile/latest
pub async fn handle_latest_profile(
    State(state): State<AppState>,
) -> Result<Json<CanonicalProfile>, AppError> {
    state
        .preferences
        .latest_profile()
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("No profile has been stored yet".to_string()))
}
