//! Model Provider Abstraction
//!
//! A provider takes a system instruction and a user instruction and returns a
//! parsed JSON object, or fails with an error whose text is the input to
//! failure classification. Vendor adapters (OpenAI-compatible, Gemini) are
//! interchangeable behind [`StructuredProvider`].

use crate::config::AiConfig;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

pub mod fixture;
pub mod gemini;
pub mod openai;

pub use fixture::FixtureProvider;
pub use gemini::GeminiProvider;
pub use openai::OpenAiProvider;

/// Parsed JSON object returned by a provider
pub type JsonObject = Map<String, Value>;

/// Sampling temperature used for structured generation.
pub const STRUCTURED_TEMPERATURE: f32 = 0.3;

const PROVIDER_HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const ERROR_BODY_LIMIT: usize = 200;

/// Provider failures; the `Display` form is what gets classified
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("{0}")]
    Config(String),

    #[error("{0}")]
    Request(String),

    #[error("{0}")]
    Envelope(String),

    #[error("json decode error: {0}")]
    Json(String),

    #[error("ai_response_not_object")]
    NotObject,
}

/// Supported vendors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Gemini,
    #[serde(rename = "openai")]
    OpenAi,
}

impl ProviderKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ProviderKind::Gemini => "gemini",
            ProviderKind::OpenAi => "openai",
        }
    }
}

/// Structured-output provider capability
#[async_trait]
pub trait StructuredProvider: Send + Sync {
    /// Generate a JSON object from a system and a user instruction
    async fn generate_json(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<JsonObject, ProviderError>;

    /// Get the provider name
    fn provider_name(&self) -> &str;

    /// Get the model name
    fn model_name(&self) -> &str;
}

/// Builds the configured provider
pub struct ProviderFactory;

impl ProviderFactory {
    pub fn create(config: &AiConfig) -> Result<Arc<dyn StructuredProvider>, ProviderError> {
        let timeout = Duration::from_secs(config.request_timeout_sec);
        match config.provider {
            ProviderKind::Gemini => Ok(Arc::new(GeminiProvider::new(
                config.gemini_api_key.clone(),
                config.gemini_model.clone(),
                timeout,
            )?)),
            ProviderKind::OpenAi => Ok(Arc::new(OpenAiProvider::new(
                config.openai_api_key.clone(),
                config.openai_model.clone(),
                config.openai_base_url.clone(),
                timeout,
            )?)),
        }
    }
}

pub(crate) fn build_provider_http_client(request_timeout: Duration) -> Result<Client, ProviderError> {
    Client::builder()
        .connect_timeout(PROVIDER_HTTP_CONNECT_TIMEOUT)
        .timeout(request_timeout)
        .build()
        .map_err(|e| ProviderError::Config(format!("http_client_init_failed:{}", e)))
}

/// Map transport errors so that timeouts and status codes survive as text.
pub(crate) fn map_http_error(vendor: &str, error: reqwest::Error) -> ProviderError {
    let reason = if error.is_timeout() {
        format!("request timed out: {}", error)
    } else if let Some(status) = error.status() {
        format!("HTTP {}: {}", status.as_u16(), error)
    } else if error.is_connect() {
        format!("connection error: {}", error)
    } else {
        error.to_string()
    };
    ProviderError::Request(format!("{}_request_failed:{}", vendor, reason))
}

/// Build the error for a non-success HTTP status.
///
/// The reason carries the status code and its canonical phrase only. The
/// response body is logged, never classified.
pub(crate) fn status_error(vendor: &str, status: reqwest::StatusCode, body: &str) -> ProviderError {
    debug!(
        vendor,
        status = status.as_u16(),
        body = %crate::failure::truncate_chars(body.trim(), ERROR_BODY_LIMIT),
        "Provider returned an error status"
    );
    ProviderError::Request(format!(
        "{}_request_failed:HTTP {}: {}",
        vendor,
        status.as_u16(),
        status.canonical_reason().unwrap_or("Unknown Status")
    ))
}

/// Remove a surrounding markdown code fence, if both fence lines are present.
pub fn strip_code_fence(text: &str) -> &str {
    let raw = text.trim();
    if !raw.starts_with("```") {
        return raw;
    }
    let lines: Vec<&str> = raw.lines().collect();
    if lines.len() >= 2 && lines[lines.len() - 1].trim().starts_with("```") {
        let start = lines[0].len();
        let end = raw.len() - lines[lines.len() - 1].len();
        if start <= end {
            return raw[start..end].trim();
        }
    }
    raw
}

/// Parse model text into a JSON object.
pub fn parse_json_object(text: &str) -> Result<JsonObject, ProviderError> {
    let cleaned = strip_code_fence(text);
    let parsed: Value =
        serde_json::from_str(cleaned).map_err(|e| ProviderError::Json(e.to_string()))?;
    match parsed {
        Value::Object(map) => Ok(map),
        _ => Err(ProviderError::NotObject),
    }
}
