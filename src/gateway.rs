//! Provider Admission Gateway
//!
//! Bounds the number of in-flight provider calls per process. Callers wait a
//! short, bounded time for a slot and are rejected with the backpressure
//! sentinel instead of queuing indefinitely. The slot is an owned semaphore
//! permit, so it is released on every exit path, including cancellation.

use crate::failure::BACKPRESSURE_SENTINEL;
use crate::pipeline::AttemptError;
use crate::provider::{JsonObject, StructuredProvider};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

const MIN_ACQUIRE_TIMEOUT: Duration = Duration::from_millis(10);

/// Admission limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GatewayConfig {
    pub max_concurrency: usize,
    pub acquire_timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 4,
            acquire_timeout: Duration::from_millis(200),
        }
    }
}

/// Concurrency-limited front for a single provider
pub struct ProviderGateway {
    provider: Arc<dyn StructuredProvider>,
    semaphore: Arc<Semaphore>,
    capacity: usize,
    acquire_timeout: Duration,
}

impl ProviderGateway {
    /// Capacity is clamped to at least 1 and the wait to at least 10ms.
    pub fn new(provider: Arc<dyn StructuredProvider>, config: GatewayConfig) -> Self {
        let capacity = config.max_concurrency.max(1);
        Self {
            provider,
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
            acquire_timeout: config.acquire_timeout.max(MIN_ACQUIRE_TIMEOUT),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn acquire_timeout(&self) -> Duration {
        self.acquire_timeout
    }

    pub fn available_slots(&self) -> usize {
        self.semaphore.available_permits()
    }

    pub fn provider(&self) -> &dyn StructuredProvider {
        self.provider.as_ref()
    }

    /// Admit one call and forward it to the provider.
    ///
    /// Fails with `ai_backpressure_busy` when no slot frees up in time, and
    /// wraps provider failures as `ai_primary_failed:<reason>`.
    pub async fn generate_json(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<JsonObject, AttemptError> {
        let acquired =
            tokio::time::timeout(self.acquire_timeout, Arc::clone(&self.semaphore).acquire_owned())
                .await;
        let _permit = match acquired {
            Ok(Ok(permit)) => permit,
            Ok(Err(_)) | Err(_) => {
                warn!(
                    provider = self.provider.provider_name(),
                    capacity = self.capacity,
                    wait_ms = self.acquire_timeout.as_millis() as u64,
                    "Provider gateway saturated"
                );
                return Err(AttemptError::provider(BACKPRESSURE_SENTINEL));
            }
        };

        debug!(
            provider = self.provider.provider_name(),
            model = self.provider.model_name(),
            "Provider call admitted"
        );
        self.provider
            .generate_json(system_prompt, user_prompt)
            .await
            .map_err(|e| AttemptError::provider(format!("ai_primary_failed:{}", e)))
    }
}
