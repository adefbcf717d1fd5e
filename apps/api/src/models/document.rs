use std::path::Path;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// What the document is expected to be. Fixed for the lifetime of one extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Cv,
    JobPosting,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Cv => "cv",
            DocumentKind::JobPosting => "job_posting",
        }
    }
}

/// File formats accepted on the upload surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaType {
    Pdf,
    Doc,
    Docx,
    PlainText,
    Jpeg,
    Png,
}

impl MediaType {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "doc" => Some(Self::Doc),
            "docx" => Some(Self::Docx),
            "txt" => Some(Self::PlainText),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            _ => None,
        }
    }

    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime {
            "application/pdf" => Some(Self::Pdf),
            "application/msword" => Some(Self::Doc),
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => {
                Some(Self::Docx)
            }
            "text/plain" => Some(Self::PlainText),
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/png" => Some(Self::Png),
            _ => None,
        }
    }

    pub fn mime(&self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Doc => "application/msword",
            Self::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            Self::PlainText => "text/plain",
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
        }
    }

    pub fn from_filename(name: &str) -> Option<Self> {
        Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    pub fn is_image(&self) -> bool {
        matches!(self, Self::Jpeg | Self::Png)
    }
}

/// A file received on the upload surface, before validation.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub name: String,
    /// Declared by the client. May be empty or generic.
    pub media_type: String,
    pub bytes: Bytes,
}

impl UploadedFile {
    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

/// Input to the extraction pipeline: an uploaded file or pasted text, never both.
#[derive(Debug, Clone)]
pub enum DocumentInput {
    File(UploadedFile),
    Text(String),
}
