//! Request augmentation for outbound chat-completion calls.
//!
//! Only calls whose URL path equals the configured chat endpoint are touched.
//! Everything else (including matching calls whose body is not a JSON object)
//! passes through byte-for-byte.

use bytes::Bytes;
use reqwest::Url;
use serde_json::Value;
use tracing::debug;

use crate::llm_client::prompts::EXHAUSTIVE_READING_PREFIX;

/// Baseline ceiling our callers used before augmentation raised it.
pub const BASELINE_TOKEN_CEILING: u32 = 2500;
pub const DEFAULT_TOKEN_CEILING: u32 = 3500;

#[derive(Debug, Clone)]
pub struct AugmentationPolicy {
    /// URL path of the chat endpoint, e.g. `/v1/chat/completions`.
    pub endpoint_path: String,
    pub token_ceiling: u32,
    pub instruction_prefix: String,
}

impl Default for AugmentationPolicy {
    fn default() -> Self {
        Self {
            endpoint_path: "/v1/chat/completions".to_string(),
            token_ceiling: DEFAULT_TOKEN_CEILING,
            instruction_prefix: EXHAUSTIVE_READING_PREFIX.to_string(),
        }
    }
}

/// Descriptor of a call about to leave the process.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundCall {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

#[derive(Debug, Clone)]
pub struct RequestAugmentor {
    policy: AugmentationPolicy,
}

impl RequestAugmentor {
    pub fn new(policy: AugmentationPolicy) -> Self {
        Self { policy }
    }

    /// Returns the call, rewritten when it targets the chat endpoint.
    pub fn augment(&self, call: OutboundCall) -> OutboundCall {
        if !self.targets(&call.url) {
            return call;
        }

        let mut body: Value = match serde_json::from_slice(&call.body) {
            Ok(v @ Value::Object(_)) => v,
            _ => return call,
        };

        self.raise_token_ceiling(&mut body);
        self.prefix_last_user_message(&mut body);

        match serde_json::to_vec(&body) {
            Ok(rewritten) => {
                debug!(url = %call.url, "augmented outbound chat call");
                OutboundCall {
                    body: Bytes::from(rewritten),
                    ..call
                }
            }
            Err(_) => call,
        }
    }

    fn targets(&self, url: &str) -> bool {
        let wanted = self.policy.endpoint_path.trim_end_matches('/');
        Url::parse(url)
            .map(|u| u.path().trim_end_matches('/') == wanted)
            .unwrap_or(false)
    }

    /// Raises `max_tokens` to the ceiling; never lowers a higher caller value.
    fn raise_token_ceiling(&self, body: &mut Value) {
        let ceiling = self.policy.token_ceiling;
        // Any JSON number counts, so `8000.0` is as high as `8000`.
        let current = body.get("max_tokens").and_then(Value::as_f64);
        if current.map_or(true, |c| c < f64::from(ceiling)) {
            body["max_tokens"] = Value::from(ceiling);
        }
    }

    fn prefix_last_user_message(&self, body: &mut Value) {
        let prefix = &self.policy.instruction_prefix;
        let Some(message) = body
            .get_mut("messages")
            .and_then(Value::as_array_mut)
            .and_then(|msgs| {
                msgs.iter_mut()
                    .rev()
                    .find(|m| m.get("role").and_then(Value::as_str) == Some("user"))
            })
        else {
            return;
        };

        match message.get_mut("content") {
            Some(Value::String(text)) => {
                if !text.starts_with(prefix.as_str()) {
                    *text = format!("{prefix}\n\n{text}");
                }
            }
            // Multi-part content: prefix the first text part.
            Some(Value::Array(parts)) => {
                if let Some(Value::String(text)) = parts
                    .iter_mut()
                    .find(|p| p.get("type").and_then(Value::as_str) == Some("text"))
                    .and_then(|p| p.get_mut("text"))
                {
                    if !text.starts_with(prefix.as_str()) {
                        *text = format!("{prefix}\n\n{text}");
                    }
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const CHAT_URL: &str = "https://llm.example.com/v1/chat/completions";

    fn call(url: &str, body: Value) -> OutboundCall {
        OutboundCall {
            url: url.to_string(),
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: Bytes::from(serde_json::to_vec(&body).unwrap()),
        }
    }

    fn body_of(call: &OutboundCall) -> Value {
        serde_json::from_slice(&call.body).unwrap()
    }

    #[test]
    fn test_raises_baseline_ceiling_and_prefixes_last_user_message() {
        let augmentor = RequestAugmentor::new(AugmentationPolicy::default());
        let out = augmentor.augment(call(
            CHAT_URL,
            json!({
                "model": "m",
                "max_tokens": BASELINE_TOKEN_CEILING,
                "messages": [
                    {"role": "system", "content": "sys"},
                    {"role": "user", "content": "first"},
                    {"role": "assistant", "content": "ok"},
                    {"role": "user", "content": "Extract this CV"}
                ]
            }),
        ));

        let body = body_of(&out);
        assert_eq!(body["max_tokens"], 3500);
        let last = body["messages"][3]["content"].as_str().unwrap();
        assert!(last.starts_with(EXHAUSTIVE_READING_PREFIX));
        assert!(last.ends_with("Extract this CV"));
        // Earlier user message and other fields untouched
        assert_eq!(body["messages"][1]["content"], "first");
        assert_eq!(body["messages"][0]["content"], "sys");
        assert_eq!(body["model"], "m");
    }

    #[test]
    fn test_never_lowers_higher_ceiling() {
        let augmentor = RequestAugmentor::new(AugmentationPolicy::default());
        let out = augmentor.augment(call(
            CHAT_URL,
            json!({"max_tokens": 8000, "messages": [{"role": "user", "content": "x"}]}),
        ));
        assert_eq!(body_of(&out)["max_tokens"], 8000);
    }

    #[test]
    fn test_missing_ceiling_is_set() {
        let augmentor = RequestAugmentor::new(AugmentationPolicy::default());
        let out = augmentor.augment(call(CHAT_URL, json!({"messages": []})));
        assert_eq!(body_of(&out)["max_tokens"], 3500);
    }

    #[test]
    fn test_unrelated_destination_is_byte_for_byte_unchanged() {
        let augmentor = RequestAugmentor::new(AugmentationPolicy::default());
        // Deliberately odd formatting so a re-serialization would differ.
        let raw = Bytes::from_static(b"{ \"max_tokens\" : 2500, \"messages\": [{\"role\":\"user\",\"content\":\"hi\"}] }");
        let original = OutboundCall {
            url: "https://llm.example.com/v1/embeddings".to_string(),
            headers: vec![],
            body: raw.clone(),
        };
        let out = augmentor.augment(original.clone());
        assert_eq!(out, original);
        assert_eq!(out.body, raw);
    }

    #[test]
    fn test_matching_destination_with_non_json_body_passes_through() {
        let augmentor = RequestAugmentor::new(AugmentationPolicy::default());
        let original = OutboundCall {
            url: CHAT_URL.to_string(),
            headers: vec![],
            body: Bytes::from_static(b"not json"),
        };
        assert_eq!(augmentor.augment(original.clone()), original);
    }

    #[test]
    fn test_float_ceiling_above_ours_is_kept() {
        let augmentor = RequestAugmentor::new(AugmentationPolicy::default());
        let out = augmentor.augment(call(
            CHAT_URL,
            json!({"max_tokens": 8000.0, "messages": [{"role": "user", "content": "doc"}]}),
        ));
        assert_eq!(body_of(&out)["max_tokens"], 8000.0);

        let out = augmentor.augment(call(
            CHAT_URL,
            json!({"max_tokens": 1200.5, "messages": []}),
        ));
        assert_eq!(body_of(&out)["max_tokens"], 3500);
    }

    #[test]
    fn test_prefix_is_not_applied_twice() {
        let augmentor = RequestAugmentor::new(AugmentationPolicy::default());
        let once = augmentor.augment(call(
            CHAT_URL,
            json!({"messages": [{"role": "user", "content": "doc"}]}),
        ));
        let twice = augmentor.augment(once.clone());
        assert_eq!(body_of(&once), body_of(&twice));
    }

    #[test]
    fn test_multipart_content_prefixes_first_text_part() {
        let augmentor = RequestAugmentor::new(AugmentationPolicy::default());
        let out = augmentor.augment(call(
            CHAT_URL,
            json!({"messages": [{"role": "user", "content": [
                {"type": "image_url", "image_url": {"url": "data:..."}},
                {"type": "text", "text": "read the scan"}
            ]}]}),
        ));
        let body = body_of(&out);
        let text = body["messages"][0]["content"][1]["text"].as_str().unwrap();
        assert!(text.starts_with(EXHAUSTIVE_READING_PREFIX));
        assert_eq!(body["messages"][0]["content"][0]["type"], "image_url");
    }
}
