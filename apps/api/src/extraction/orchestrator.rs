//! Extraction Orchestrator: runs the strategy chain and always produces a document.
//!
//! Chain: remote (when configured) → heuristic → static record. Each attempt
//! runs on its own task under its own timeout, strictly one after another.
//! Timeouts and panics are recorded as failures and the chain moves on.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Local, NaiveDate};
use thiserror::Error;
use tracing::{info, warn};

use crate::extraction::fallback;
use crate::extraction::heuristics;
use crate::extraction::input::{self, PreparedDocument, UploadLimits, ValidationError};
use crate::extraction::normalizer;
use crate::llm_client::LlmError;
use crate::models::document::{DocumentInput, DocumentKind};
use crate::models::extraction::{ExtractionResult, ExtractionSource};
use crate::models::profile::ExtractionOutcome;

/// The heuristics are local and bounded; this only guards against pathological input.
const HEURISTIC_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StrategyFailure {
    #[error("network error: {0}")]
    Network(String),

    #[error("remote API error: {0}")]
    Api(String),

    #[error("response did not match the expected schema: {0}")]
    Decode(String),

    #[error("timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("unavailable: {0}")]
    Unavailable(String),

    #[error("panicked: {0}")]
    Panicked(String),
}

impl From<LlmError> for StrategyFailure {
    fn from(e: LlmError) -> Self {
        match e {
            LlmError::Http(e) if e.is_timeout() => StrategyFailure::Network(format!("timeout: {e}")),
            LlmError::Http(e) => StrategyFailure::Network(e.to_string()),
            e @ (LlmError::Api { .. } | LlmError::RateLimited { .. }) => {
                StrategyFailure::Api(e.to_string())
            }
            e @ (LlmError::Parse(_) | LlmError::EmptyContent) => {
                StrategyFailure::Decode(e.to_string())
            }
            LlmError::MissingCredential => {
                StrategyFailure::Unavailable("no API credential configured".to_string())
            }
        }
    }
}

#[derive(Debug, Clone)]
pub enum StrategyOutcome {
    Success(ExtractionResult),
    Failure(StrategyFailure),
}

impl From<Result<ExtractionResult, StrategyFailure>> for StrategyOutcome {
    fn from(result: Result<ExtractionResult, StrategyFailure>) -> Self {
        match result {
            Ok(r) => StrategyOutcome::Success(r),
            Err(f) => StrategyOutcome::Failure(f),
        }
    }
}

/// One link of the chain. Implementations must not panic on bad input,
/// but the runner survives it if they do.
#[async_trait]
pub trait ExtractionStrategy: Send + Sync {
    fn source(&self) -> ExtractionSource;

    async fn attempt(&self, doc: &PreparedDocument) -> StrategyOutcome;
}

pub struct HeuristicStrategy;

#[async_trait]
impl ExtractionStrategy for HeuristicStrategy {
    fn source(&self) -> ExtractionSource {
        ExtractionSource::Heuristic
    }

    async fn attempt(&self, doc: &PreparedDocument) -> StrategyOutcome {
        StrategyOutcome::Success(heuristics::extract(
            &doc.text,
            doc.kind,
            doc.filename.as_deref(),
        ))
    }
}

#[derive(Clone)]
struct Stage {
    strategy: Arc<dyn ExtractionStrategy>,
    timeout: Duration,
}

#[derive(Clone)]
pub struct Orchestrator {
    stages: Vec<Stage>,
    limits: UploadLimits,
}

impl Orchestrator {
    /// An empty chain; every parse ends at the static record.
    pub fn new(limits: UploadLimits) -> Self {
        Self {
            stages: Vec::new(),
            limits,
        }
    }

    /// Remote strategy (if any) under `remote_timeout`, then the heuristics.
    pub fn standard(
        remote: Option<Arc<dyn ExtractionStrategy>>,
        remote_timeout: Duration,
        limits: UploadLimits,
    ) -> Self {
        let mut orchestrator = Self::new(limits);
        if let Some(remote) = remote {
            orchestrator = orchestrator.with_strategy(remote, remote_timeout);
        }
        orchestrator.with_strategy(Arc::new(HeuristicStrategy), HEURISTIC_TIMEOUT)
    }

    pub fn with_strategy(mut self, strategy: Arc<dyn ExtractionStrategy>, timeout: Duration) -> Self {
        self.stages.push(Stage { strategy, timeout });
        self
    }

    pub fn limits(&self) -> &UploadLimits {
        &self.limits
    }

    pub async fn parse(
        &self,
        input: DocumentInput,
        kind: DocumentKind,
    ) -> Result<ExtractionOutcome, ValidationError> {
        self.parse_at(input, kind, Local::now().date_naive()).await
    }

    /// As `parse`, with the date used for open-ended experience spans.
    pub async fn parse_at(
        &self,
        input: DocumentInput,
        kind: DocumentKind,
        today: NaiveDate,
    ) -> Result<ExtractionOutcome, ValidationError> {
        let doc = input::prepare(input, kind, &self.limits).await?;
        let (result, failures) = self.run_chain(Arc::new(doc)).await;

        Ok(ExtractionOutcome {
            source: result.source,
            confidence: result.confidence,
            fallback_used: result.source != ExtractionSource::Remote,
            failures,
            document: normalizer::normalize(&result, today),
        })
    }

    async fn run_chain(&self, doc: Arc<PreparedDocument>) -> (ExtractionResult, Vec<String>) {
        let mut failures = Vec::new();

        for stage in &self.stages {
            let source = stage.strategy.source();
            match run_stage(stage, doc.clone()).await {
                StrategyOutcome::Success(result) if result.kind == doc.kind => {
                    info!(
                        "Extracted {} document with {} strategy ({} earlier failures)",
                        doc.kind.as_str(),
                        source.as_str(),
                        failures.len()
                    );
                    return (result, failures);
                }
                StrategyOutcome::Success(result) => {
                    let failure = StrategyFailure::Decode(format!(
                        "expected a {} result, got {}",
                        doc.kind.as_str(),
                        result.kind.as_str()
                    ));
                    warn!("{} strategy failed: {failure}", source.as_str());
                    failures.push(format!("{}: {failure}", source.as_str()));
                }
                StrategyOutcome::Failure(failure) => {
                    warn!("{} strategy failed: {failure}", source.as_str());
                    failures.push(format!("{}: {failure}", source.as_str()));
                }
            }
        }

        warn!(
            "Every strategy failed for {} document; using the static record",
            doc.kind.as_str()
        );
        (fallback::static_record(doc.kind), failures)
    }
}

async fn run_stage(stage: &Stage, doc: Arc<PreparedDocument>) -> StrategyOutcome {
    let strategy = stage.strategy.clone();
    let mut handle = tokio::spawn(async move { strategy.attempt(&doc).await });

    match tokio::time::timeout(stage.timeout, &mut handle).await {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(join_error)) => StrategyOutcome::Failure(StrategyFailure::Panicked(join_error.to_string())),
        Err(_) => {
            handle.abort();
            StrategyOutcome::Failure(StrategyFailure::Timeout(stage.timeout))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::profile::{ParsedDocument, NOT_DETECTED, NOT_SPECIFIED};
    use serde_json::{json, Map};

    struct Failing(StrategyFailure);

    #[async_trait]
    impl ExtractionStrategy for Failing {
        fn source(&self) -> ExtractionSource {
            ExtractionSource::Remote
        }

        async fn attempt(&self, _doc: &PreparedDocument) -> StrategyOutcome {
            StrategyOutcome::Failure(self.0.clone())
        }
    }

    struct Slow;

    #[async_trait]
    impl ExtractionStrategy for Slow {
        fn source(&self) -> ExtractionSource {
            ExtractionSource::Remote
        }

        async fn attempt(&self, doc: &PreparedDocument) -> StrategyOutcome {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            StrategyOutcome::Success(ExtractionResult::new(doc.kind, self.source(), Map::new()))
        }
    }

    struct Panicking;

    #[async_trait]
    impl ExtractionStrategy for Panicking {
        fn source(&self) -> ExtractionSource {
            ExtractionSource::Heuristic
        }

        async fn attempt(&self, _doc: &PreparedDocument) -> StrategyOutcome {
            panic!("boom")
        }
    }

    struct Scripted(serde_json::Value);

    #[async_trait]
    impl ExtractionStrategy for Scripted {
        fn source(&self) -> ExtractionSource {
            ExtractionSource::Remote
        }

        async fn attempt(&self, doc: &PreparedDocument) -> StrategyOutcome {
            let fields = self.0.as_object().cloned().unwrap_or_default();
            StrategyOutcome::Success(ExtractionResult::new(doc.kind, self.source(), fields))
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    fn posting_text() -> DocumentInput {
        DocumentInput::Text(
            "Développeur Rust\nEntreprise : Acme\nLieu : Lyon\nCompétences : Rust, SQL".to_string(),
        )
    }

    fn chain(first: Arc<dyn ExtractionStrategy>, timeout: Duration) -> Orchestrator {
        Orchestrator::standard(Some(first), timeout, UploadLimits::default())
    }

    #[tokio::test]
    async fn test_remote_success_is_not_a_fallback() {
        let orch = chain(
            Arc::new(Scripted(json!({"title": "Data Engineer", "company": "Globex"}))),
            Duration::from_secs(5),
        );
        let outcome = orch
            .parse_at(posting_text(), DocumentKind::JobPosting, today())
            .await
            .unwrap();
        assert_eq!(outcome.source, ExtractionSource::Remote);
        assert!(!outcome.fallback_used);
        assert!(outcome.failures.is_empty());
        assert_eq!(outcome.document.title(), "Data Engineer");
    }

    #[tokio::test]
    async fn test_network_failure_falls_through_to_heuristics() {
        let orch = chain(
            Arc::new(Failing(StrategyFailure::Network("connection refused".into()))),
            Duration::from_secs(5),
        );
        let outcome = orch
            .parse_at(posting_text(), DocumentKind::JobPosting, today())
            .await
            .unwrap();
        assert_eq!(outcome.source, ExtractionSource::Heuristic);
        assert!(outcome.fallback_used);
        assert_eq!(outcome.failures.len(), 1);
        assert!(outcome.failures[0].starts_with("remote: network error"));
        match &outcome.document {
            ParsedDocument::JobPosting(job) => {
                assert_eq!(job.title, "Développeur Rust");
                assert_eq!(job.company, "Acme");
                assert!(!job.skills.is_empty());
                assert!(!job.responsibilities.is_empty());
                assert!(!job.benefits.is_empty());
            }
            other => panic!("expected posting, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_remote_timeout_falls_through_to_heuristics() {
        let orch = chain(Arc::new(Slow), Duration::from_secs(45));
        let outcome = orch
            .parse_at(posting_text(), DocumentKind::JobPosting, today())
            .await
            .unwrap();
        assert_eq!(outcome.source, ExtractionSource::Heuristic);
        assert_eq!(outcome.failures, vec!["remote: timed out after 45s".to_string()]);
    }

    #[tokio::test]
    async fn test_panicking_strategy_ends_at_static_record() {
        let orch = Orchestrator::new(UploadLimits::default())
            .with_strategy(Arc::new(Panicking), Duration::from_secs(5));
        let outcome = orch
            .parse_at(posting_text(), DocumentKind::JobPosting, today())
            .await
            .unwrap();
        assert_eq!(outcome.source, ExtractionSource::StaticFallback);
        assert!(outcome.failures[0].starts_with("heuristic: panicked"));
        match outcome.document {
            ParsedDocument::JobPosting(job) => {
                assert_eq!(job.title, NOT_SPECIFIED);
                assert_eq!(job.skills, vec![NOT_SPECIFIED.to_string()]);
            }
            other => panic!("expected posting, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_cv_filename_drives_name_when_remote_fails() {
        let orch = chain(
            Arc::new(Failing(StrategyFailure::Decode("not an object".into()))),
            Duration::from_secs(5),
        );
        let input = DocumentInput::File(crate::models::document::UploadedFile {
            name: "CV_Jean_Dupont.txt".to_string(),
            media_type: "text/plain".to_string(),
            bytes: bytes::Bytes::from_static(b" "),
        });
        let outcome = orch.parse_at(input, DocumentKind::Cv, today()).await.unwrap();
        let profile = outcome.document.as_profile().unwrap();
        assert_eq!(profile.name, "Jean Dupont");
        assert!(!profile.skills.is_empty());
    }

    #[tokio::test]
    async fn test_cv_lists_never_empty_when_remote_fails() {
        let orch = chain(
            Arc::new(Failing(StrategyFailure::Network("connection refused".into()))),
            Duration::from_secs(5),
        );
        let input = DocumentInput::Text("Jean Dupont\nAucune autre information".to_string());
        let outcome = orch.parse_at(input, DocumentKind::Cv, today()).await.unwrap();
        assert_eq!(outcome.source, ExtractionSource::Heuristic);

        let profile = outcome.document.as_profile().unwrap();
        assert_eq!(profile.experiences.len(), 1);
        assert_eq!(profile.experiences[0].title, NOT_DETECTED);
        assert_eq!(profile.experiences[0].organization, NOT_DETECTED);
        assert!(!profile.skills.is_empty());
        assert_eq!(profile.total_experience_years, None);
        assert_eq!(profile.experience, NOT_DETECTED);
    }

    #[tokio::test]
    async fn test_validation_runs_before_any_strategy() {
        let orch = chain(Arc::new(Panicking), Duration::from_secs(5));
        let err = orch
            .parse_at(DocumentInput::Text("   ".into()), DocumentKind::Cv, today())
            .await
            .unwrap_err();
        assert_eq!(err, ValidationError::Empty);
    }

    #[test]
    fn test_llm_errors_map_to_failures() {
        assert!(matches!(
            StrategyFailure::from(LlmError::MissingCredential),
            StrategyFailure::Unavailable(_)
        ));
        assert!(matches!(
            StrategyFailure::from(LlmError::EmptyContent),
            StrategyFailure::Decode(_)
        ));
        assert!(matches!(
            StrategyFailure::from(LlmError::Api { status: 502, message: "bad gateway".into() }),
            StrategyFailure::Api(_)
        ));
    }
}
