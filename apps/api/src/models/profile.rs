use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::document::DocumentKind;
use crate::models::extraction::{Confidence, ExtractionSource};

/// Placeholder for CV fields that could not be determined.
pub const NOT_DETECTED: &str = "Non détecté";
/// Placeholder for job-posting fields that could not be determined.
pub const NOT_SPECIFIED: &str = "Not specified";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkExperience {
    pub title: String,
    pub organization: String,
    /// Verbatim as extracted; the parsed form drives the experience total.
    pub start: Option<String>,
    /// `None` = open-ended (current position).
    pub end: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl WorkExperience {
    /// Placeholder entry for a CV where no experience was found. Undated, so
    /// it adds nothing to the total.
    pub fn not_detected() -> Self {
        Self {
            title: NOT_DETECTED.to_string(),
            organization: NOT_DETECTED.to_string(),
            start: None,
            end: None,
            start_date: None,
            end_date: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalProfile {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub title: String,
    pub experiences: Vec<WorkExperience>,
    pub skills: Vec<String>,
    /// Rounded total; `None` when nothing could be summed.
    pub total_experience_years: Option<u32>,
    /// Display form of `total_experience_years`, or the sentinel.
    pub experience: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalJobPosting {
    pub title: String,
    pub company: String,
    pub location: String,
    pub experience: String,
    pub salary: String,
    /// Never empty: `[NOT_SPECIFIED]` when nothing was found.
    pub skills: Vec<String>,
    pub responsibilities: Vec<String>,
    pub benefits: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum ParsedDocument {
    Cv(CanonicalProfile),
    JobPosting(CanonicalJobPosting),
}

impl ParsedDocument {
    pub fn kind(&self) -> DocumentKind {
        match self {
            ParsedDocument::Cv(_) => DocumentKind::Cv,
            ParsedDocument::JobPosting(_) => DocumentKind::JobPosting,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            ParsedDocument::Cv(p) => &p.title,
            ParsedDocument::JobPosting(j) => &j.title,
        }
    }

    pub fn skills(&self) -> &[String] {
        match self {
            ParsedDocument::Cv(p) => &p.skills,
            ParsedDocument::JobPosting(j) => &j.skills,
        }
    }

    pub fn experience(&self) -> &str {
        match self {
            ParsedDocument::Cv(p) => &p.experience,
            ParsedDocument::JobPosting(j) => &j.experience,
        }
    }

    pub fn as_profile(&self) -> Option<&CanonicalProfile> {
        match self {
            ParsedDocument::Cv(p) => Some(p),
            ParsedDocument::JobPosting(_) => None,
        }
    }
}

/// What `parse` hands back: the canonical document plus provenance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionOutcome {
    pub source: ExtractionSource,
    pub confidence: Confidence,
    /// True whenever the remote strategy did not produce the result.
    pub fallback_used: bool,
    /// One line per failed strategy, in chain order.
    pub failures: Vec<String>,
    pub document: ParsedDocument,
}

/// True when a value is a sentinel rather than extracted data.
pub fn is_sentinel(value: &str) -> bool {
    value == NOT_DETECTED || value == NOT_SPECIFIED
}
