//! Upload-surface validation and plain-text preparation.
//!
//! Validation runs before any strategy; a rejected input never reaches the chain.

use bytes::Bytes;
use thiserror::Error;
use tracing::warn;

use crate::models::document::{DocumentInput, DocumentKind, MediaType, UploadedFile};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadLimits {
    pub cv_max_bytes: usize,
    pub job_posting_max_bytes: usize,
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            cv_max_bytes: 10 * 1024 * 1024,
            job_posting_max_bytes: 5 * 1024 * 1024,
        }
    }
}

impl UploadLimits {
    pub fn max_bytes(&self, kind: DocumentKind) -> usize {
        match kind {
            DocumentKind::Cv => self.cv_max_bytes,
            DocumentKind::JobPosting => self.job_posting_max_bytes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Input is empty")]
    Empty,

    #[error("Unsupported file type for {kind}: {detail}")]
    UnsupportedType { kind: &'static str, detail: String },

    #[error("File is {size} bytes; the limit for {kind} documents is {limit} bytes")]
    TooLarge {
        kind: &'static str,
        size: usize,
        limit: usize,
    },
}

/// Text plus the hints the strategies work from.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedDocument {
    pub kind: DocumentKind,
    pub text: String,
    pub filename: Option<String>,
    pub media_type: Option<MediaType>,
    /// Raw upload, kept for strategies that read the file themselves.
    pub bytes: Option<Bytes>,
}

/// Checks an input against the upload surface rules for `kind`.
pub fn validate(
    input: &DocumentInput,
    kind: DocumentKind,
    limits: &UploadLimits,
) -> Result<(), ValidationError> {
    match input {
        DocumentInput::Text(text) => {
            if text.trim().is_empty() {
                return Err(ValidationError::Empty);
            }
            Ok(())
        }
        DocumentInput::File(file) => {
            if file.size() == 0 {
                return Err(ValidationError::Empty);
            }
            let limit = limits.max_bytes(kind);
            if file.size() > limit {
                return Err(ValidationError::TooLarge {
                    kind: kind.as_str(),
                    size: file.size(),
                    limit,
                });
            }
            resolve_media_type(file, kind).map(|_| ())
        }
    }
}

/// The extension decides the format; a declared media type must agree with it
/// unless it is empty or generic.
pub fn resolve_media_type(
    file: &UploadedFile,
    kind: DocumentKind,
) -> Result<MediaType, ValidationError> {
    let unsupported = |detail: String| ValidationError::UnsupportedType {
        kind: kind.as_str(),
        detail,
    };

    let by_ext = MediaType::from_filename(&file.name)
        .ok_or_else(|| unsupported(format!("unrecognised extension in '{}'", file.name)))?;

    let declared = file
        .media_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_lowercase();
    if !declared.is_empty() && declared != "application/octet-stream" {
        match MediaType::from_mime(&declared) {
            Some(mt) if mt == by_ext => {}
            _ => {
                return Err(unsupported(format!(
                    "declared type '{declared}' does not match '{}'",
                    file.name
                )))
            }
        }
    }

    if by_ext.is_image() && kind != DocumentKind::Cv {
        return Err(unsupported("images are only accepted for CVs".to_string()));
    }

    Ok(by_ext)
}

/// Validates and turns the input into text. Extraction problems degrade to
/// empty text (the filename still drives the heuristics); only validation fails.
pub async fn prepare(
    input: DocumentInput,
    kind: DocumentKind,
    limits: &UploadLimits,
) -> Result<PreparedDocument, ValidationError> {
    validate(&input, kind, limits)?;

    match input {
        DocumentInput::Text(text) => Ok(PreparedDocument {
            kind,
            text,
            filename: None,
            media_type: None,
            bytes: None,
        }),
        DocumentInput::File(file) => {
            let media_type = resolve_media_type(&file, kind)?;
            let text = extract_text(&file, media_type).await;
            Ok(PreparedDocument {
                kind,
                text,
                filename: Some(file.name),
                media_type: Some(media_type),
                bytes: Some(file.bytes),
            })
        }
    }
}

async fn extract_text(file: &UploadedFile, media_type: MediaType) -> String {
    match media_type {
        MediaType::PlainText => String::from_utf8_lossy(&file.bytes).into_owned(),
        MediaType::Pdf => {
            let bytes = file.bytes.clone();
            let extracted =
                tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
                    .await;
            match extracted {
                Ok(Ok(text)) => text,
                Ok(Err(e)) => {
                    warn!("PDF text extraction failed for '{}': {e}", file.name);
                    String::new()
                }
                Err(e) => {
                    warn!("PDF text extraction task failed for '{}': {e}", file.name);
                    String::new()
                }
            }
        }
        // No local reader for Word or image formats. Remote strategies get the raw
        // bytes; the heuristics work from the filename.
        MediaType::Doc | MediaType::Docx | MediaType::Jpeg | MediaType::Png => String::new(),
    }
}
