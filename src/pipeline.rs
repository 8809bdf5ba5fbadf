//! Retry Orchestrator
//!
//! Drives a unit of work for a named pipeline up to `max_attempts` times.
//! Every attempt-level error is classified here; only a successful value or a
//! terminal [`PipelineFailure`] leaves [`run_with_retry`]. Attempts are strictly
//! sequential and the attempt number is handed to the unit of work so call
//! sites can tighten their instructions on a retry.

use crate::failure::{
    self, classify, Classification, FailureKind, QUALITY_SENTINEL,
};
use serde::Serialize;
use std::collections::HashSet;
use std::future::Future;
use thiserror::Error;
use tracing::{error, info, warn};

/// Reason recorded when the loop finishes without running an attempt.
pub const RETRY_EXHAUSTED_REASON: &str = "ai_retry_exhausted";

/// Error raised by a single attempt
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttemptError {
    /// Unstructured provider or gateway failure, classified by its text.
    #[error("{0}")]
    Provider(String),

    /// Output parsed but failed the quality gate.
    #[error("{}:{}", QUALITY_SENTINEL, .0.join("|"))]
    Quality(Vec<String>),

    /// Failure whose kind is already known at the source.
    #[error("{reason}")]
    Classified { kind: FailureKind, reason: String },
}

impl AttemptError {
    pub fn provider(reason: impl Into<String>) -> Self {
        AttemptError::Provider(reason.into())
    }

    /// Classification used for retry decisions and status mapping.
    pub fn classification(&self) -> Classification {
        match self {
            AttemptError::Provider(reason) => classify(reason),
            AttemptError::Quality(_) => FailureKind::QualityFailed.classification(),
            AttemptError::Classified { kind, .. } => kind.classification(),
        }
    }

    /// Reason text carried into the terminal failure.
    pub fn reason(&self) -> String {
        failure::error_detail(&self.to_string())
    }
}

/// Terminal failure of a pipeline run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("{pipeline}:{kind}:{reason}")]
pub struct PipelineFailure {
    pub pipeline: String,
    pub kind: FailureKind,
    pub http_status: u16,
    pub retryable: bool,
    pub reason: String,
    pub attempt_count: u32,
}

impl PipelineFailure {
    fn from_classification(
        pipeline: &str,
        classification: Classification,
        reason: String,
        attempt_count: u32,
    ) -> Self {
        Self {
            pipeline: pipeline.to_string(),
            kind: classification.kind,
            http_status: classification.http_status,
            retryable: classification.retryable,
            reason,
            attempt_count,
        }
    }

    /// Legacy compatibility string: `<pipeline>_failed:<kind>:<reason>`.
    pub fn legacy_detail(&self) -> String {
        format_pipeline_error_detail(&self.pipeline, self.kind, &self.reason)
    }
}

/// Format the legacy detail string shared by every pipeline.
pub fn format_pipeline_error_detail(pipeline: &str, kind: FailureKind, reason: &str) -> String {
    format!(
        "{}_failed:{}:{}",
        pipeline,
        kind,
        failure::normalize_reason(reason)
    )
}

/// Retry policy for one call site
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Upper bound on attempts, values below 1 are treated as 1
    pub max_attempts: u32,
    /// Kinds this call site is willing to retry
    pub retryable_kinds: HashSet<FailureKind>,
}

impl RetryPolicy {
    /// Kinds retried when a call site does not pass its own allow-list.
    pub fn default_retryable_kinds() -> HashSet<FailureKind> {
        [
            FailureKind::RateLimited,
            FailureKind::Timeout,
            FailureKind::SchemaMismatch,
        ]
        .into_iter()
        .collect()
    }

    pub fn new(max_attempts: u32, retryable_kinds: HashSet<FailureKind>) -> Self {
        Self {
            max_attempts,
            retryable_kinds,
        }
    }

    /// Default allow-list plus `quality_failed`, for quality-gated call sites.
    pub fn with_quality(max_attempts: u32) -> Self {
        let mut kinds = Self::default_retryable_kinds();
        kinds.insert(FailureKind::QualityFailed);
        Self::new(max_attempts, kinds)
    }

    pub fn allows(&self, kind: FailureKind) -> bool {
        self.retryable_kinds.contains(&kind)
    }

    fn effective_attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(2, Self::default_retryable_kinds())
    }
}

/// Run `work` until it succeeds or fails terminally.
///
/// An attempt is retried only when attempts remain, the kind is retryable by
/// default, and the policy's allow-list contains it. Returns the value with
/// the number of attempts used.
pub async fn run_with_retry<T, F, Fut>(
    pipeline: &str,
    policy: &RetryPolicy,
    mut work: F,
) -> Result<(T, u32), PipelineFailure>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, AttemptError>>,
{
    let attempts = policy.effective_attempts();

    for attempt in 1..=attempts {
        let err = match work(attempt).await {
            Ok(value) => return Ok((value, attempt)),
            Err(err) => err,
        };

        let reason = err.reason();
        let classification = err.classification();
        let should_retry = attempt < attempts
            && classification.retryable
            && policy.allows(classification.kind);

        if should_retry {
            warn!(
                pipeline,
                attempt,
                kind = %classification.kind,
                reason = %reason,
                "Generation attempt failed, retrying"
            );
            info!(pipeline, next_attempt = attempt + 1, "Retrying generation attempt");
            continue;
        }

        error!(
            pipeline,
            attempt,
            kind = %classification.kind,
            reason = %reason,
            "Generation pipeline failed"
        );
        return Err(PipelineFailure::from_classification(
            pipeline,
            classification,
            reason,
            attempt,
        ));
    }

    Err(PipelineFailure::from_classification(
        pipeline,
        FailureKind::ProviderError.classification(),
        RETRY_EXHAUSTED_REASON.to_string(),
        attempts,
    ))
}
