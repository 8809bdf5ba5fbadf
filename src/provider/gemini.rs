//! Gemini `generateContent` adapter.

use super::{
    build_provider_http_client, map_http_error, parse_json_object, status_error, JsonObject,
    ProviderError, StructuredProvider, STRUCTURED_TEMPERATURE,
};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde_json::{json, Value};
use std::time::Duration;

const VENDOR: &str = "gemini";
const GEMINI_MODELS_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models/";

/// Gemini client; instructions are sent as a single user turn
pub struct GeminiProvider {
    client: Client,
    api_key: String,
    model: String,
}

impl GeminiProvider {
    pub fn new(api_key: String, model: String, request_timeout: Duration) -> Result<Self, ProviderError> {
        if api_key.trim().is_empty() {
            return Err(ProviderError::Config("gemini_api_key_missing".to_string()));
        }
        Ok(Self {
            client: build_provider_http_client(request_timeout)?,
            api_key,
            model,
        })
    }

    fn endpoint(&self) -> Result<Url, ProviderError> {
        let mut url = Url::parse(GEMINI_MODELS_URL)
            .map_err(|e| ProviderError::Config(format!("gemini_endpoint_invalid:{}", e)))?;
        url.path_segments_mut()
            .map_err(|_| ProviderError::Config("gemini_endpoint_invalid".to_string()))?
            .pop_if_empty()
            .push(&format!("{}:generateContent", self.model));
        url.query_pairs_mut().append_pair("key", &self.api_key);
        Ok(url)
    }

    pub(crate) fn request_body(system_prompt: &str, user_prompt: &str) -> Value {
        json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": format!("{}\n\n{}", system_prompt, user_prompt) }],
            }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "temperature": STRUCTURED_TEMPERATURE,
            },
        })
    }

    /// First non-blank text part of the first candidate.
    pub(crate) fn extract_text(envelope: &Value) -> Result<String, ProviderError> {
        let first = envelope
            .get("candidates")
            .and_then(Value::as_array)
            .and_then(|candidates| candidates.first())
            .ok_or_else(|| ProviderError::Envelope("gemini_candidates_missing".to_string()))?;

        let parts = match first.pointer("/content/parts") {
            None => return Err(ProviderError::Envelope("gemini_text_missing".to_string())),
            Some(Value::Array(parts)) => parts,
            Some(_) => return Err(ProviderError::Envelope("gemini_parts_missing".to_string())),
        };

        parts
            .iter()
            .filter_map(|part| part.get("text").and_then(Value::as_str))
            .find(|text| !text.trim().is_empty())
            .map(str::to_string)
            .ok_or_else(|| ProviderError::Envelope("gemini_text_missing".to_string()))
    }
}

#[async_trait]
impl StructuredProvider for GeminiProvider {
    async fn generate_json(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<JsonObject, ProviderError> {
        let response = self
            .client
            .post(self.endpoint()?)
            .json(&Self::request_body(system_prompt, user_prompt))
            .send()
            .await
            .map_err(|e| map_http_error(VENDOR, e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| map_http_error(VENDOR, e))?;
        if !status.is_success() {
            return Err(status_error(VENDOR, status, &body));
        }

        let envelope: Value =
            serde_json::from_str(&body).map_err(|e| ProviderError::Json(e.to_string()))?;
        let text = Self::extract_text(&envelope)?;
        parse_json_object(&text)
    }

    fn provider_name(&self) -> &str {
        VENDOR
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
