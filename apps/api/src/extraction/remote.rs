//! Remote extraction strategies.
//!
//! `ChatExtractor` prompts the chat-completion model through `LlmClient` (and so
//! through the request augmentor), attaching image uploads inline.
//! `ServiceExtractor` posts to a dedicated extraction service, sending the raw
//! file when no text could be read. Either way the reply must be a JSON object
//! carrying at least one field we expect for the document kind.

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::Client;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::extraction::input::PreparedDocument;
use crate::extraction::orchestrator::{ExtractionStrategy, StrategyFailure, StrategyOutcome};
use crate::extraction::prompts::{
    CV_EXTRACTION_PROMPT, CV_EXTRACTION_SYSTEM, JOB_POSTING_EXTRACTION_PROMPT,
    JOB_POSTING_EXTRACTION_SYSTEM,
};
use crate::llm_client::{ChatMessage, LlmClient};
use crate::models::document::DocumentKind;
use crate::models::extraction::{ExtractionResult, ExtractionSource};

const CV_FIELDS: &[&str] = &[
    "name", "full_name", "email", "phone", "title", "experiences", "experience",
    "work_history", "skills", "personal_info",
];

const JOB_POSTING_FIELDS: &[&str] = &[
    "title", "job_title", "company", "location", "experience", "salary", "compensation",
    "skills", "responsibilities", "benefits",
];

/// Keeps the prompt inside the model's context window.
const MAX_PROMPT_CHARS: usize = 24_000;

/// Accepts a reply only if it is an object holding at least one expected field.
pub fn decode_fields(kind: DocumentKind, value: Value) -> Result<Map<String, Value>, StrategyFailure> {
    let Value::Object(fields) = value else {
        return Err(StrategyFailure::Decode("reply is not a JSON object".to_string()));
    };
    let expected = match kind {
        DocumentKind::Cv => CV_FIELDS,
        DocumentKind::JobPosting => JOB_POSTING_FIELDS,
    };
    if !expected
        .iter()
        .any(|k| fields.get(*k).is_some_and(|v| !v.is_null()))
    {
        return Err(StrategyFailure::Decode(format!(
            "no expected {} field in reply",
            kind.as_str()
        )));
    }
    Ok(fields)
}

/// Stands in for the content when the model reads the attached image instead.
const ATTACHED_IMAGE: &str = "(the document is the attached image)";

fn unreadable() -> StrategyFailure {
    StrategyFailure::Unavailable("no text could be read from the document".to_string())
}

/// `data:` URI for image uploads, the form chat models accept inline.
fn image_data_uri(doc: &PreparedDocument) -> Option<String> {
    let media_type = doc.media_type.filter(|m| m.is_image())?;
    let bytes = doc.bytes.as_ref().filter(|b| !b.is_empty())?;
    Some(format!(
        "data:{};base64,{}",
        media_type.mime(),
        STANDARD.encode(bytes)
    ))
}

// ────────────────────────────────────────────
// Chat model
// ────────────────────────────────────────────

pub struct ChatExtractor {
    llm: LlmClient,
}

impl ChatExtractor {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }

    /// Text goes inline in the prompt; an image upload rides along as an
    /// `image_url` part. Word files without text have nothing to send.
    fn messages(doc: &PreparedDocument) -> Result<Vec<ChatMessage>, StrategyFailure> {
        let (system, template) = match doc.kind {
            DocumentKind::Cv => (CV_EXTRACTION_SYSTEM, CV_EXTRACTION_PROMPT),
            DocumentKind::JobPosting => (JOB_POSTING_EXTRACTION_SYSTEM, JOB_POSTING_EXTRACTION_PROMPT),
        };
        let text = doc.text.trim();
        let image = image_data_uri(doc);
        let content: String = match (text.is_empty(), &image) {
            (false, _) => text.chars().take(MAX_PROMPT_CHARS).collect(),
            (true, Some(_)) => ATTACHED_IMAGE.to_string(),
            (true, None) => return Err(unreadable()),
        };
        let prompt = template
            .replace("{filename}", doc.filename.as_deref().unwrap_or("(pasted text)"))
            .replace("{content}", &content);
        let user = match image {
            Some(uri) => ChatMessage::user(prompt).with_image(uri),
            None => ChatMessage::user(prompt),
        };
        Ok(vec![ChatMessage::system(system), user])
    }

    async fn extract(&self, doc: &PreparedDocument) -> Result<ExtractionResult, StrategyFailure> {
        let messages = Self::messages(doc)?;
        let value: Value = self.llm.call_json(&messages).await?;
        let fields = decode_fields(doc.kind, value)?;
        debug!("Chat model returned {} fields", fields.len());
        Ok(ExtractionResult::new(doc.kind, ExtractionSource::Remote, fields))
    }
}

#[async_trait]
impl ExtractionStrategy for ChatExtractor {
    fn source(&self) -> ExtractionSource {
        ExtractionSource::Remote
    }

    async fn attempt(&self, doc: &PreparedDocument) -> StrategyOutcome {
        self.extract(doc).await.into()
    }
}

// ────────────────────────────────────────────
// Extraction service
// ────────────────────────────────────────────

/// Text when we have it; otherwise the raw file, base64-encoded, for the
/// service to read itself.
#[derive(Debug, Serialize)]
struct ExtractRequest<'a> {
    kind: DocumentKind,
    content: &'a str,
    filename: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    media_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<String>,
}

impl<'a> ExtractRequest<'a> {
    fn from_document(doc: &'a PreparedDocument) -> Result<Self, StrategyFailure> {
        let content = doc.text.trim();
        let data = if content.is_empty() {
            let bytes = doc
                .bytes
                .as_ref()
                .filter(|b| !b.is_empty())
                .ok_or_else(unreadable)?;
            Some(STANDARD.encode(bytes))
        } else {
            None
        };
        Ok(Self {
            kind: doc.kind,
            content,
            filename: doc.filename.as_deref(),
            media_type: doc.media_type.map(|m| m.mime()),
            data,
        })
    }
}

pub struct ServiceExtractor {
    client: Client,
    endpoint: String,
}

impl ServiceExtractor {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            endpoint: format!("{}/extract", base_url.trim_end_matches('/')),
        })
    }

    async fn extract(&self, doc: &PreparedDocument) -> Result<ExtractionResult, StrategyFailure> {
        let body = ExtractRequest::from_document(doc)?;

        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| StrategyFailure::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(StrategyFailure::Api(format!("status {status}: {message}")));
        }

        let value: Value = response
            .json()
            .await
            .map_err(|e| StrategyFailure::Decode(e.to_string()))?;
        // Some deployments wrap the fields as {"data": {...}}.
        let value = match value {
            Value::Object(mut obj) if obj.len() == 1 && obj.contains_key("data") => {
                obj.remove("data").unwrap_or(Value::Null)
            }
            other => other,
        };
        let fields = decode_fields(doc.kind, value)?;
        Ok(ExtractionResult::new(doc.kind, ExtractionSource::Remote, fields))
    }
}

#[async_trait]
impl ExtractionStrategy for ServiceExtractor {
    fn source(&self) -> ExtractionSource {
        ExtractionSource::Remote
    }

    async fn attempt(&self, doc: &PreparedDocument) -> StrategyOutcome {
        self.extract(doc).await.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::Credential;
    use crate::models::document::MediaType;
    use bytes::Bytes;
    use serde_json::json;

    fn doc(kind: DocumentKind, text: &str) -> PreparedDocument {
        PreparedDocument {
            kind,
            text: text.to_string(),
            filename: Some("CV_Jean_Dupont.pdf".to_string()),
            media_type: None,
            bytes: None,
        }
    }

    fn scan(kind: DocumentKind, name: &str, media_type: MediaType) -> PreparedDocument {
        PreparedDocument {
            kind,
            text: String::new(),
            filename: Some(name.to_string()),
            media_type: Some(media_type),
            bytes: Some(Bytes::from_static(b"\x89PNG fake")),
        }
    }

    #[test]
    fn test_decode_rejects_non_object() {
        assert!(matches!(
            decode_fields(DocumentKind::Cv, json!(["Rust"])),
            Err(StrategyFailure::Decode(_))
        ));
    }

    #[test]
    fn test_decode_rejects_object_without_expected_fields() {
        assert!(matches!(
            decode_fields(DocumentKind::JobPosting, json!({"answer": "I cannot read this"})),
            Err(StrategyFailure::Decode(_))
        ));
        assert!(matches!(
            decode_fields(DocumentKind::Cv, json!({"name": null})),
            Err(StrategyFailure::Decode(_))
        ));
    }

    #[test]
    fn test_decode_accepts_partial_object() {
        let fields = decode_fields(DocumentKind::Cv, json!({"skills": ["Rust"], "extra": 1})).unwrap();
        assert_eq!(fields.len(), 2);
    }

    #[test]
    fn test_prompt_embeds_filename_and_text() {
        let messages = ChatExtractor::messages(&doc(DocumentKind::Cv, "Jean Dupont")).unwrap();
        assert_eq!(messages.len(), 2);
        assert!(messages[1].content.contains("CV_Jean_Dupont.pdf"));
        assert!(messages[1].content.contains("Jean Dupont"));
        assert!(!messages[1].content.contains("{content}"));
        assert!(messages[1].image.is_none());
    }

    #[test]
    fn test_image_upload_is_sent_as_data_uri() {
        let messages =
            ChatExtractor::messages(&scan(DocumentKind::Cv, "cv_scan.png", MediaType::Png)).unwrap();
        let uri = messages[1].image.as_deref().unwrap();
        assert!(uri.starts_with("data:image/png;base64,"));
        assert_eq!(&uri["data:image/png;base64,".len()..], STANDARD.encode(b"\x89PNG fake"));
        assert!(messages[1].content.contains(ATTACHED_IMAGE));

        let wire = serde_json::to_value(&messages[1]).unwrap();
        assert_eq!(wire["content"][1]["type"], "image_url");
    }

    #[test]
    fn test_word_file_without_text_has_nothing_for_chat_model() {
        assert!(matches!(
            ChatExtractor::messages(&scan(DocumentKind::Cv, "cv.docx", MediaType::Docx)),
            Err(StrategyFailure::Unavailable(_))
        ));
    }

    #[test]
    fn test_service_request_carries_raw_file_when_text_is_empty() {
        let upload = scan(DocumentKind::Cv, "cv.docx", MediaType::Docx);
        let body = serde_json::to_value(ExtractRequest::from_document(&upload).unwrap()).unwrap();
        assert_eq!(body["filename"], "cv.docx");
        assert_eq!(
            body["media_type"],
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        );
        assert_eq!(body["data"], STANDARD.encode(b"\x89PNG fake"));

        let text = doc(DocumentKind::JobPosting, "Développeur");
        let body = serde_json::to_value(ExtractRequest::from_document(&text).unwrap()).unwrap();
        assert_eq!(body["content"], "Développeur");
        assert!(body.get("data").is_none());
    }

    /// Serves `/extract`, handing each request body back to the test.
    async fn spawn_service() -> (String, tokio::sync::mpsc::UnboundedReceiver<Value>) {
        use axum::{routing::post, Json, Router};

        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let app = Router::new().route(
            "/extract",
            post(move |Json(body): Json<Value>| {
                let tx = tx.clone();
                async move {
                    let _ = tx.send(body);
                    Json(json!({"data": {"name": "Jean Dupont", "skills": ["Rust"]}}))
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        (format!("http://{addr}"), rx)
    }

    #[tokio::test]
    async fn test_service_reads_image_upload() {
        let (base, mut requests) = spawn_service().await;
        let service = ServiceExtractor::new(&base, Duration::from_secs(5)).unwrap();
        let outcome = service
            .attempt(&scan(DocumentKind::Cv, "cv_scan.jpg", MediaType::Jpeg))
            .await;

        let result = match outcome {
            StrategyOutcome::Success(result) => result,
            other => panic!("expected success, got {other:?}"),
        };
        assert_eq!(result.fields["name"], "Jean Dupont");

        let sent = requests.recv().await.unwrap();
        assert_eq!(sent["kind"], "cv");
        assert_eq!(sent["media_type"], "image/jpeg");
        assert_eq!(sent["data"], STANDARD.encode(b"\x89PNG fake"));
    }

    #[tokio::test]
    async fn test_empty_text_is_unavailable() {
        let llm = LlmClient::new(
            "http://127.0.0.1:9/v1/chat/completions".to_string(),
            "m".to_string(),
            100,
            Credential::new(Some("k".to_string())),
        )
        .unwrap();
        let outcome = ChatExtractor::new(llm).attempt(&doc(DocumentKind::Cv, "  ")).await;
        assert!(matches!(
            outcome,
            StrategyOutcome::Failure(StrategyFailure::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_credential_is_unavailable() {
        let llm = LlmClient::new(
            "http://127.0.0.1:9/v1/chat/completions".to_string(),
            "m".to_string(),
            100,
            Credential::default(),
        )
        .unwrap();
        let outcome = ChatExtractor::new(llm)
            .attempt(&doc(DocumentKind::Cv, "Jean Dupont"))
            .await;
        assert!(matches!(
            outcome,
            StrategyOutcome::Failure(StrategyFailure::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_service_is_network_failure() {
        let service = ServiceExtractor::new("http://127.0.0.1:9/", Duration::from_secs(2)).unwrap();
        assert_eq!(service.endpoint, "http://127.0.0.1:9/extract");
        let outcome = service.attempt(&doc(DocumentKind::JobPosting, "Développeur")).await;
        assert!(matches!(
            outcome,
            StrategyOutcome::Failure(StrategyFailure::Network(_))
        ));
    }
}
