use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::extraction::input::UploadLimits;
use crate::llm_client::augment::{AugmentationPolicy, BASELINE_TOKEN_CEILING, DEFAULT_TOKEN_CEILING};

/// Application configuration loaded from environment variables.
/// Every variable has a default; a malformed value fails startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    pub llm_base_url: String,
    pub llm_chat_path: String,
    pub llm_model: String,
    /// Optional here: the credential can also be supplied at runtime and persisted.
    pub llm_api_key: Option<String>,
    /// Baseline token ceiling sent by our own calls, before augmentation.
    pub llm_max_tokens: u32,
    pub llm_token_ceiling: u32,
    /// When set, the remote strategy posts to `{url}/extract` instead of prompting the chat model.
    pub extraction_service_url: Option<String>,
    pub remote_timeout: Duration,
    pub assistant_timeout: Duration,
    pub cv_max_bytes: usize,
    pub job_posting_max_bytes: usize,
    /// Unset = in-memory store, nothing survives a restart.
    pub redis_url: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            port: parse_env("PORT", 8080)?,
            rust_log: env_or("RUST_LOG", "info"),
            llm_base_url: env_or("LLM_BASE_URL", "https://api.openai.com"),
            llm_chat_path: env_or("LLM_CHAT_PATH", "/v1/chat/completions"),
            llm_model: env_or("LLM_MODEL", "gpt-4o-mini"),
            llm_api_key: optional_env("LLM_API_KEY"),
            llm_max_tokens: parse_env("LLM_MAX_TOKENS", BASELINE_TOKEN_CEILING)?,
            llm_token_ceiling: parse_env("LLM_TOKEN_CEILING", DEFAULT_TOKEN_CEILING)?,
            extraction_service_url: optional_env("EXTRACTION_SERVICE_URL"),
            remote_timeout: Duration::from_secs(parse_env("REMOTE_TIMEOUT_SECS", 45)?),
            assistant_timeout: Duration::from_secs(parse_env("ASSISTANT_TIMEOUT_SECS", 30)?),
            cv_max_bytes: parse_env("CV_MAX_BYTES", 10 * 1024 * 1024)?,
            job_posting_max_bytes: parse_env("JOB_POSTING_MAX_BYTES", 5 * 1024 * 1024)?,
            redis_url: optional_env("REDIS_URL"),
        })
    }

    pub fn chat_endpoint(&self) -> String {
        format!(
            "{}{}",
            self.llm_base_url.trim_end_matches('/'),
            self.llm_chat_path
        )
    }

    pub fn augmentation_policy(&self) -> AugmentationPolicy {
        AugmentationPolicy {
            endpoint_path: self.llm_chat_path.clone(),
            token_ceiling: self.llm_token_ceiling,
            ..AugmentationPolicy::default()
        }
    }

    pub fn upload_limits(&self) -> UploadLimits {
        UploadLimits {
            cv_max_bytes: self.cv_max_bytes,
            job_posting_max_bytes: self.job_posting_max_bytes,
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value: {raw}")),
        Err(_) => Ok(default),
    }
}
