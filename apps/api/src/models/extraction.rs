use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::models::document::DocumentKind;

/// Which strategy produced an extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionSource {
    Remote,
    Heuristic,
    StaticFallback,
}

impl ExtractionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionSource::Remote => "remote",
            ExtractionSource::Heuristic => "heuristic",
            ExtractionSource::StaticFallback => "static_fallback",
        }
    }

    pub fn confidence(&self) -> Confidence {
        match self {
            ExtractionSource::Remote => Confidence::Remote,
            ExtractionSource::Heuristic => Confidence::Heuristic,
            ExtractionSource::StaticFallback => Confidence::StaticFallback,
        }
    }
}

/// Ordered lowest to highest, so `Remote > Heuristic > StaticFallback`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Confidence {
    StaticFallback,
    Heuristic,
    Remote,
}

/// Raw, strategy-specific output. Field names loosely follow the canonical schema;
/// the normalizer tolerates aliases and missing fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub kind: DocumentKind,
    pub source: ExtractionSource,
    pub confidence: Confidence,
    pub fields: Map<String, Value>,
}

impl ExtractionResult {
    pub fn new(kind: DocumentKind, source: ExtractionSource, fields: Map<String, Value>) -> Self {
        Self {
            kind,
            source,
            confidence: source.confidence(),
            fields,
        }
    }
}
