use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::llm_client::{ChatMessage, Role};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct AskResponse {
    pub reply: String,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub review_id: Uuid,
    /// User and assistant turns; the system message stays server-side.
    pub messages: Vec<ChatMessage>,
}

/// POST /api/v1/reviews/:id/assistant
pub async fn handle_open(
    State(state): State<AppState>,
    Path(review_id): Path<Uuid>,
) -> Result<Json<HistoryResponse>, AppError> {
    let session = state.reviews.open_conversation(review_id).await?;
    let session = session.lock().await;
    Ok(Json(history(review_id, session.messages())))
}

/// GET /api/v1/reviews/:id/assistant
pub async fn handle_history(
    State(state): State<AppState>,
    Path(review_id): Path<Uuid>,
) -> Result<Json<HistoryResponse>, AppError> {
    let session = state.reviews.conversation(review_id).await?;
    // A reply in progress holds the lock; the history is returned once it lands.
    let session = session.lock().await;
    Ok(Json(history(review_id, session.messages())))
}

/// POST /api/v1/reviews/:id/assistant/messages
pub async fn handle_ask(
    State(state): State<AppState>,
    Path(review_id): Path<Uuid>,
    Json(req): Json<AskRequest>,
) -> Result<Json<AskResponse>, AppError> {
    let session = state.reviews.conversation(review_id).await?;
    let reply = state.assistant.ask(&session, &req.message).await?;
    Ok(Json(AskResponse { reply }))
}

fn history(review_id: Uuid, messages: &[ChatMessage]) -> HistoryResponse {
    HistoryResponse {
        review_id,
        messages: messages
            .iter()
            .filter(|m| m.role != Role::System)
            .cloned()
            .collect(),
    }
}
