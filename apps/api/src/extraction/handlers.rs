use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::extraction::input::validate;
use crate::models::document::{DocumentInput, DocumentKind, UploadedFile};
use crate::models::profile::ExtractionOutcome;
use crate::preferences::HandOff;
use crate::state::AppState;

const FILE_FIELD: &str = "file";

#[derive(Debug, Serialize)]
pub struct CreateReviewResponse {
    pub review_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct ReviewResponse {
    pub review_id: Uuid,
    /// `None` until an extraction has been committed.
    pub outcome: Option<ExtractionOutcome>,
}

#[derive(Debug, Deserialize)]
pub struct KindQuery {
    pub kind: DocumentKind,
}

#[derive(Debug, Deserialize)]
pub struct TextRequest {
    pub kind: DocumentKind,
    pub text: String,
}

// ────────────────────────────────────────────
// Reviews
// ────────────────────────────────────────────

/// POST /api/v1/reviews
pub async fn handle_create_review(
    State(state): State<AppState>,
) -> (StatusCode, Json<CreateReviewResponse>) {
    let review_id = state.reviews.create().await;
    info!("Created review {review_id}");
    (StatusCode::CREATED, Json(CreateReviewResponse { review_id }))
}

/// GET /api/v1/reviews/:id
pub async fn handle_get_review(
    State(state): State<AppState>,
    Path(review_id): Path<Uuid>,
) -> Result<Json<ReviewResponse>, AppError> {
    let outcome = state.reviews.document(review_id).await?;
    Ok(Json(ReviewResponse {
        review_id,
        outcome: outcome.map(|o| (*o).clone()),
    }))
}

/// DELETE /api/v1/reviews/:id/document
pub async fn handle_clear_document(
    State(state): State<AppState>,
    Path(review_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.reviews.clear(review_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ────────────────────────────────────────────
// Extraction
// ────────────────────────────────────────────

/// POST /api/v1/reviews/:id/documents?kind=cv|job_posting
/// Multipart body with a single `file` field.
pub async fn handle_upload(
    State(state): State<AppState>,
    Path(review_id): Path<Uuid>,
    Query(query): Query<KindQuery>,
    mut multipart: Multipart,
) -> Result<Json<ExtractionOutcome>, AppError> {
    let file = read_file_field(&mut multipart).await?;
    info!(
        "Upload for review {review_id}: '{}' ({} bytes, {})",
        file.name,
        file.size(),
        query.kind.as_str()
    );
    run_extraction(&state, review_id, DocumentInput::File(file), query.kind).await
}

/// POST /api/v1/reviews/:id/text
pub async fn handle_submit_text(
    State(state): State<AppState>,
    Path(review_id): Path<Uuid>,
    Json(req): Json<TextRequest>,
) -> Result<Json<ExtractionOutcome>, AppError> {
    run_extraction(&state, review_id, DocumentInput::Text(req.text), req.kind).await
}

async fn read_file_field(multipart: &mut Multipart) -> Result<UploadedFile, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Malformed multipart body: {e}")))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let name = field.file_name().unwrap_or_default().to_string();
        let media_type = field.content_type().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("Could not read uploaded file: {e}")))?;
        return Ok(UploadedFile {
            name,
            media_type,
            bytes,
        });
    }
    Err(AppError::BadRequest(format!(
        "Missing multipart field '{FILE_FIELD}'"
    )))
}

/// A rejected input leaves the current document in place. Anything valid
/// replaces it, and only the newest extraction on the review is kept.
async fn run_extraction(
    state: &AppState,
    review_id: Uuid,
    input: DocumentInput,
    kind: DocumentKind,
) -> Result<Json<ExtractionOutcome>, AppError> {
    validate(&input, kind, state.orchestrator.limits())?;

    let ticket = state.reviews.begin_extraction(review_id).await?;
    let outcome = state.orchestrator.parse(input, kind).await?;
    let outcome = state.reviews.commit(ticket, outcome).await?;

    if let Some(profile) = outcome.document.as_profile() {
        match state.preferences.hand_off_profile(profile, ticket.sequence()).await {
            Ok(HandOff::Stored) => info!("Stored latest profile from review {review_id}"),
            Ok(HandOff::GhostMode) => info!("Ghost mode on; latest profile not stored"),
            Ok(HandOff::Stale) => info!("A newer profile is already stored; skipping review {review_id}"),
            Err(e) => warn!("Could not store latest profile: {e}"),
        }
    }

    Ok(Json((*outcome).clone()))
}
