//! Review sessions: one current document and at most one conversation each.
//!
//! Every upload takes a ticket carrying the review's new generation. Only the
//! holder of the latest ticket may commit; an older extraction finishing late is
//! told it was superseded and its result is dropped. Tickets also carry a
//! registry-wide sequence that orders the latest-profile hand-off.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::debug;
use uuid::Uuid;

use crate::assistant::session::ConversationSession;
use crate::errors::AppError;
use crate::models::profile::ExtractionOutcome;

#[derive(Default)]
struct Review {
    generation: u64,
    outcome: Option<Arc<ExtractionOutcome>>,
    conversation: Option<Arc<Mutex<ConversationSession>>>,
}

impl Review {
    fn dispose(&mut self) {
        self.generation += 1;
        self.outcome = None;
        self.conversation = None;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractionTicket {
    pub review_id: Uuid,
    generation: u64,
    sequence: u64,
}

impl ExtractionTicket {
    /// Issue order across all reviews; later tickets compare greater.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }
}

#[derive(Clone, Default)]
pub struct ReviewRegistry {
    reviews: Arc<RwLock<HashMap<Uuid, Review>>>,
    issued: Arc<AtomicU64>,
}

impl ReviewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn create(&self) -> Uuid {
        let id = Uuid::new_v4();
        self.reviews.write().await.insert(id, Review::default());
        id
    }

    /// Disposes the current document and conversation and claims the next generation.
    pub async fn begin_extraction(&self, review_id: Uuid) -> Result<ExtractionTicket, AppError> {
        let mut reviews = self.reviews.write().await;
        let review = reviews.get_mut(&review_id).ok_or_else(|| not_found(review_id))?;
        review.dispose();
        Ok(ExtractionTicket {
            review_id,
            generation: review.generation,
            sequence: self.issued.fetch_add(1, Ordering::SeqCst) + 1,
        })
    }

    /// Stores the outcome if no newer extraction has started since `ticket` was issued.
    pub async fn commit(
        &self,
        ticket: ExtractionTicket,
        outcome: ExtractionOutcome,
    ) -> Result<Arc<ExtractionOutcome>, AppError> {
        let mut reviews = self.reviews.write().await;
        let review = reviews
            .get_mut(&ticket.review_id)
            .ok_or_else(|| not_found(ticket.review_id))?;

        if review.generation != ticket.generation {
            debug!(
                "Dropping superseded extraction for review {} (generation {} < {})",
                ticket.review_id, ticket.generation, review.generation
            );
            return Err(AppError::Superseded(ticket.review_id));
        }

        let outcome = Arc::new(outcome);
        review.outcome = Some(outcome.clone());
        Ok(outcome)
    }

    pub async fn document(&self, review_id: Uuid) -> Result<Option<Arc<ExtractionOutcome>>, AppError> {
        let reviews = self.reviews.read().await;
        let review = reviews.get(&review_id).ok_or_else(|| not_found(review_id))?;
        Ok(review.outcome.clone())
    }

    /// Drops the document and conversation; an extraction still running is superseded too.
    pub async fn clear(&self, review_id: Uuid) -> Result<(), AppError> {
        let mut reviews = self.reviews.write().await;
        let review = reviews.get_mut(&review_id).ok_or_else(|| not_found(review_id))?;
        review.dispose();
        Ok(())
    }

    /// Returns the review's conversation, creating it on first call.
    pub async fn open_conversation(
        &self,
        review_id: Uuid,
    ) -> Result<Arc<Mutex<ConversationSession>>, AppError> {
        let mut reviews = self.reviews.write().await;
        let review = reviews.get_mut(&review_id).ok_or_else(|| not_found(review_id))?;

        if let Some(existing) = &review.conversation {
            return Ok(existing.clone());
        }
        let outcome = review.outcome.as_ref().ok_or_else(|| {
            AppError::BadRequest("No document has been parsed for this review yet".to_string())
        })?;
        let session = Arc::new(Mutex::new(ConversationSession::new(outcome.document.clone())));
        review.conversation = Some(session.clone());
        Ok(session)
    }

    pub async fn conversation(
        &self,
        review_id: Uuid,
    ) -> Result<Arc<Mutex<ConversationSession>>, AppError> {
        let reviews = self.reviews.read().await;
        let review = reviews.get(&review_id).ok_or_else(|| not_found(review_id))?;
        review
            .conversation
            .clone()
            .ok_or_else(|| AppError::NotFound(format!("No open conversation for review {review_id}")))
    }
}

fn not_found(review_id: Uuid) -> AppError {
    AppError::NotFound(format!("Review {review_id} not found"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::fallback::static_record;
    use crate::extraction::normalizer::normalize;
    use crate::models::document::DocumentKind;
    use crate::models::extraction::ExtractionSource;
    use chrono::NaiveDate;

    fn outcome(kind: DocumentKind) -> ExtractionOutcome {
        let record = static_record(kind);
        ExtractionOutcome {
            source: ExtractionSource::StaticFallback,
            confidence: record.confidence,
            fallback_used: true,
            failures: Vec::new(),
            document: normalize(&record, NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()),
        }
    }

    #[tokio::test]
    async fn test_late_result_of_first_upload_is_discarded() {
        let registry = ReviewRegistry::new();
        let id = registry.create().await;

        let first = registry.begin_extraction(id).await.unwrap();
        let second = registry.begin_extraction(id).await.unwrap();

        registry.commit(second, outcome(DocumentKind::JobPosting)).await.unwrap();
        let late = registry.commit(first, outcome(DocumentKind::Cv)).await;
        assert!(matches!(late, Err(AppError::Superseded(r)) if r == id));

        let current = registry.document(id).await.unwrap().unwrap();
        assert_eq!(current.document.kind(), DocumentKind::JobPosting);
    }

    #[tokio::test]
    async fn test_new_upload_disposes_document_and_conversation() {
        let registry = ReviewRegistry::new();
        let id = registry.create().await;
        let ticket = registry.begin_extraction(id).await.unwrap();
        registry.commit(ticket, outcome(DocumentKind::Cv)).await.unwrap();
        registry.open_conversation(id).await.unwrap();

        registry.begin_extraction(id).await.unwrap();
        assert!(registry.document(id).await.unwrap().is_none());
        assert!(matches!(registry.conversation(id).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_clear_supersedes_running_extraction() {
        let registry = ReviewRegistry::new();
        let id = registry.create().await;
        let ticket = registry.begin_extraction(id).await.unwrap();
        registry.clear(id).await.unwrap();
        assert!(matches!(
            registry.commit(ticket, outcome(DocumentKind::Cv)).await,
            Err(AppError::Superseded(_))
        ));
    }

    #[tokio::test]
    async fn test_open_conversation_requires_document_and_is_idempotent() {
        let registry = ReviewRegistry::new();
        let id = registry.create().await;
        assert!(matches!(
            registry.open_conversation(id).await,
            Err(AppError::BadRequest(_))
        ));

        let ticket = registry.begin_extraction(id).await.unwrap();
        registry.commit(ticket, outcome(DocumentKind::Cv)).await.unwrap();
        let a = registry.open_conversation(id).await.unwrap();
        let b = registry.open_conversation(id).await.unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[tokio::test]
    async fn test_ticket_sequence_spans_reviews() {
        let registry = ReviewRegistry::new();
        let a = registry.create().await;
        let b = registry.create().await;
        let first = registry.begin_extraction(a).await.unwrap();
        let second = registry.begin_extraction(b).await.unwrap();
        let third = registry.begin_extraction(a).await.unwrap();
        assert!(first.sequence() < second.sequence());
        assert!(second.sequence() < third.sequence());
    }

    #[tokio::test]
    async fn test_unknown_review_is_not_found() {
        let registry = ReviewRegistry::new();
        assert!(matches!(
            registry.document(Uuid::new_v4()).await,
            Err(AppError::NotFound(_))
        ));
    }
}
