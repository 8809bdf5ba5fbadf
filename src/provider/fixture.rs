//! Offline provider replaying canned JSON responses.
//!
//! A fixture file holds either one JSON object, returned for every call, or an
//! array of entries replayed in order with the last one repeated. An entry of
//! the form `{"error": "<text>"}` fails that call with the given text.

use super::{JsonObject, ProviderError, StructuredProvider};
use crate::error::ApiError;
use async_trait::async_trait;
use serde_json::Value;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

pub struct FixtureProvider {
    responses: Vec<Value>,
    cursor: AtomicUsize,
}

impl FixtureProvider {
    pub fn new(responses: Vec<Value>) -> Result<Self, ApiError> {
        if responses.is_empty() {
            return Err(ApiError::InvalidRequest("fixture_empty".to_string()));
        }
        Ok(Self {
            responses,
            cursor: AtomicUsize::new(0),
        })
    }

    pub fn from_file(path: &Path) -> Result<Self, ApiError> {
        let text = std::fs::read_to_string(path)?;
        match serde_json::from_str::<Value>(&text)? {
            Value::Array(items) => Self::new(items),
            single => Self::new(vec![single]),
        }
    }

    /// Number of calls served so far
    pub fn calls(&self) -> usize {
        self.cursor.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StructuredProvider for FixtureProvider {
    async fn generate_json(
        &self,
        _system_prompt: &str,
        _user_prompt: &str,
    ) -> Result<JsonObject, ProviderError> {
        let index = self.cursor.fetch_add(1, Ordering::SeqCst);
        let entry = &self.responses[index.min(self.responses.len() - 1)];
        match entry {
            Value::Object(map) if map.len() == 1 && map.contains_key("error") => {
                let reason = map
                    .get("error")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                Err(ProviderError::Request(reason))
            }
            Value::Object(map) => Ok(map.clone()),
            _ => Err(ProviderError::NotObject),
        }
    }

    fn provider_name(&self) -> &str {
        "fixture"
    }

    fn model_name(&self) -> &str {
        "fixture"
    }
}
