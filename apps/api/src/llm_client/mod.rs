//! LLM Client: the single point of entry for all chat-completion calls in cvlens.
//!
//! ARCHITECTURAL RULE: No other module may call the language-model endpoint directly.
//! All LLM interactions MUST go through this module, so the request augmentor sees them.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use serde::ser::SerializeStruct;
use serde::{de::DeserializeOwned, Deserialize, Serialize, Serializer};
use serde_json::json;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::llm_client::augment::{OutboundCall, RequestAugmentor};

pub mod augment;
pub mod prompts;

const MAX_RETRIES: u32 = 3;
const HTTP_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Rate limited after {retries} retries")]
    RateLimited { retries: u32 },

    #[error("LLM returned empty content")]
    EmptyContent,

    #[error("No API credential configured")]
    MissingCredential,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    /// Data URI sent as an `image_url` part after the text.
    #[serde(skip)]
    pub image: Option<String>,
}

// Plain messages keep the string form; an attached image switches `content`
// to the multi-part array.
impl Serialize for ChatMessage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ChatMessage", 2)?;
        state.serialize_field("role", &self.role)?;
        match &self.image {
            None => state.serialize_field("content", &self.content)?,
            Some(url) => state.serialize_field(
                "content",
                &json!([
                    {"type": "text", "text": self.content},
                    {"type": "image_url", "image_url": {"url": url}},
                ]),
            )?,
        }
        state.end()
    }
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
            image: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            image: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            image: None,
        }
    }

    pub fn with_image(mut self, data_uri: String) -> Self {
        self.image = Some(data_uri);
        self
    }
}

#[derive(Debug, Deserialize)]
pub struct ChatCompletionResponse {
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    pub message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
pub struct ResponseMessage {
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

impl ChatCompletionResponse {
    /// Extracts the text content from the first choice.
    pub fn text(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|c| c.message.content.as_deref())
            .filter(|t| !t.trim().is_empty())
    }
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// User-supplied API credential, shared by every client instance.
/// Replaced at runtime when the user saves a new key.
#[derive(Debug, Clone, Default)]
pub struct Credential(Arc<RwLock<Option<String>>>);

impl Credential {
    pub fn new(initial: Option<String>) -> Self {
        Self(Arc::new(RwLock::new(initial)))
    }

    pub async fn get(&self) -> Option<String> {
        self.0.read().await.clone()
    }

    pub async fn set(&self, value: Option<String>) {
        *self.0.write().await = value;
    }
}

/// Anything that can answer a chat history. Implemented by `LlmClient`;
/// tests swap in scripted backends.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, LlmError>;
}

/// Chat-completions client with retry logic and structured output helpers.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    endpoint: String,
    model: String,
    max_tokens: u32,
    credential: Credential,
    augmentor: Option<RequestAugmentor>,
}

impl LlmClient {
    pub fn new(
        endpoint: String,
        model: String,
        max_tokens: u32,
        credential: Credential,
    ) -> Result<Self, LlmError> {
        Ok(Self {
            client: Client::builder().timeout(HTTP_TIMEOUT).build()?,
            endpoint,
            model,
            max_tokens,
            credential,
            augmentor: None,
        })
    }

    /// Routes every outbound call through `augmentor` before it is sent.
    pub fn with_augmentor(mut self, augmentor: RequestAugmentor) -> Self {
        self.augmentor = Some(augmentor);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn build_call(&self, messages: &[ChatMessage], api_key: &str) -> Result<OutboundCall, LlmError> {
        let body = json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "messages": messages,
        });
        let call = OutboundCall {
            url: self.endpoint.clone(),
            headers: vec![
                ("authorization".to_string(), format!("Bearer {api_key}")),
                ("content-type".to_string(), "application/json".to_string()),
            ],
            body: Bytes::from(serde_json::to_vec(&body)?),
        };
        Ok(match &self.augmentor {
            Some(augmentor) => augmentor.augment(call),
            None => call,
        })
    }

    /// Makes a raw chat-completion call, returning the full response object.
    /// Retries on 429 (rate limit) and 5xx errors with exponential backoff.
    pub async fn call(&self, messages: &[ChatMessage]) -> Result<ChatCompletionResponse, LlmError> {
        let api_key = self
            .credential
            .get()
            .await
            .ok_or(LlmError::MissingCredential)?;
        let call = self.build_call(messages, &api_key)?;

        let mut last_error: Option<LlmError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s
                let delay = Duration::from_millis(1000 * (1 << (attempt - 1)));
                warn!(
                    "LLM call attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let mut request = self.client.post(&call.url);
            for (name, value) in &call.headers {
                request = request.header(name.as_str(), value.as_str());
            }
            let response = request.body(call.body.clone()).send().await;

            let response = match response {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(LlmError::Http(e));
                    continue;
                }
            };

            let status = response.status();

            if status.as_u16() == 429 || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("LLM API returned {}: {}", status, body);
                last_error = Some(LlmError::Api {
                    status: status.as_u16(),
                    message: body,
                });
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                let message = serde_json::from_str::<ApiError>(&body)
                    .map(|e| e.error.message)
                    .unwrap_or(body);
                return Err(LlmError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            let completion: ChatCompletionResponse = response.json().await?;

            if let Some(usage) = &completion.usage {
                debug!(
                    "LLM call succeeded: prompt_tokens={}, completion_tokens={}",
                    usage.prompt_tokens, usage.completion_tokens
                );
            }

            return Ok(completion);
        }

        Err(last_error.unwrap_or(LlmError::RateLimited {
            retries: MAX_RETRIES,
        }))
    }

    /// Calls the model and returns the text of the first choice.
    pub async fn chat(&self, messages: &[ChatMessage]) -> Result<String, LlmError> {
        let response = self.call(messages).await?;
        response
            .text()
            .map(str::to_string)
            .ok_or(LlmError::EmptyContent)
    }

    /// Convenience method that calls the LLM and deserializes the text response as JSON.
    /// The prompt must instruct the model to return valid JSON.
    pub async fn call_json<T: DeserializeOwned>(
        &self,
        messages: &[ChatMessage],
    ) -> Result<T, LlmError> {
        let text = self.chat(messages).await?;
        serde_json::from_str(strip_json_fences(&text)).map_err(LlmError::Parse)
    }
}

#[async_trait]
impl ChatBackend for LlmClient {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, LlmError> {
        self.chat(messages).await
    }
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
pub fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}
