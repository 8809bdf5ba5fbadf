//! OpenAI-compatible chat completions adapter.

use super::{
    build_provider_http_client, map_http_error, parse_json_object, status_error, JsonObject,
    ProviderError, StructuredProvider, STRUCTURED_TEMPERATURE,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

const VENDOR: &str = "openai";

/// OpenAI chat completions client
pub struct OpenAiProvider {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

impl OpenAiProvider {
    pub fn new(
        api_key: String,
        model: String,
        base_url: String,
        request_timeout: Duration,
    ) -> Result<Self, ProviderError> {
        if api_key.trim().is_empty() {
            return Err(ProviderError::Config("openai_api_key_missing".to_string()));
        }
        if base_url.trim().is_empty() {
            return Err(ProviderError::Config("openai_base_url_missing".to_string()));
        }
        Ok(Self {
            client: build_provider_http_client(request_timeout)?,
            api_key,
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Pull the assistant text out of a chat completions envelope.
    ///
    /// Content may be a plain string or a list of parts with `text` fields.
    pub(crate) fn extract_text(envelope: &Value) -> Result<String, ProviderError> {
        let first = envelope
            .get("choices")
            .and_then(Value::as_array)
            .and_then(|choices| choices.first())
            .ok_or_else(|| ProviderError::Envelope("openai_choices_missing".to_string()))?;

        match first.pointer("/message/content") {
            Some(Value::String(text)) if !text.trim().is_empty() => Ok(text.clone()),
            Some(Value::Array(parts)) => {
                let texts: Vec<&str> = parts
                    .iter()
                    .filter_map(|part| part.get("text").and_then(Value::as_str))
                    .filter(|text| !text.trim().is_empty())
                    .collect();
                if texts.is_empty() {
                    Err(ProviderError::Envelope("openai_content_missing".to_string()))
                } else {
                    Ok(texts.join("\n"))
                }
            }
            _ => Err(ProviderError::Envelope("openai_content_missing".to_string())),
        }
    }
}

#[async_trait]
impl StructuredProvider for OpenAiProvider {
    async fn generate_json(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<JsonObject, ProviderError> {
        let request = ChatCompletionRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt,
                },
            ],
            temperature: STRUCTURED_TEMPERATURE,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
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
