//! Failure Taxonomy
//!
//! The closed vocabulary of failure categories shared by classification,
//! retry eligibility and the wire error contract. Provider errors arrive as
//! unstructured text, so classification is substring based and evaluated in a
//! fixed priority order: the first matching token set wins.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Reason used when a provider failure carries no text at all.
pub const EMPTY_REASON: &str = "ai_provider_failed";

/// Sentinel raised by the gateway when no concurrency slot frees up in time.
pub const BACKPRESSURE_SENTINEL: &str = "ai_backpressure_busy";

/// Sentinel prefix for quality-gate failures.
pub const QUALITY_SENTINEL: &str = "quality_validation_failed";

const RAW_REASON_LIMIT: usize = 300;
const NORMALIZED_REASON_LIMIT: usize = 260;

const RATE_LIMIT_TOKENS: &[&str] = &[
    "429",
    "too many requests",
    "rate limit",
    "rate_limit",
    "resource exhausted",
    "quota",
    BACKPRESSURE_SENTINEL,
];

const TIMEOUT_TOKENS: &[&str] = &["timed out", "timeout", "read operation timed out"];

const SCHEMA_TOKENS: &[&str] = &[
    "schema",
    "json",
    "jsondecodeerror",
    "expecting value",
    "no object generated",
    "did not match schema",
    "ai_response_not_object",
];

const CONFIG_TOKENS: &[&str] = &[
    "api_key_missing",
    "openai_base_url_missing",
    "unsupported_ai_provider",
    "ai_service_init_failed",
    "config_error",
];

/// Failure category exposed to clients as `error_code`.
///
/// This set is a client contract. Adding or renaming a variant is a breaking
/// change for every consumer of the error payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    SchemaMismatch,
    RateLimited,
    Timeout,
    QualityFailed,
    ConfigError,
    EmptyOutput,
    ProviderError,
    DbError,
    Unknown,
}

impl FailureKind {
    pub const ALL: [FailureKind; 9] = [
        FailureKind::SchemaMismatch,
        FailureKind::RateLimited,
        FailureKind::Timeout,
        FailureKind::QualityFailed,
        FailureKind::ConfigError,
        FailureKind::EmptyOutput,
        FailureKind::ProviderError,
        FailureKind::DbError,
        FailureKind::Unknown,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FailureKind::SchemaMismatch => "schema_mismatch",
            FailureKind::RateLimited => "rate_limited",
            FailureKind::Timeout => "timeout",
            FailureKind::QualityFailed => "quality_failed",
            FailureKind::ConfigError => "config_error",
            FailureKind::EmptyOutput => "empty_output",
            FailureKind::ProviderError => "provider_error",
            FailureKind::DbError => "db_error",
            FailureKind::Unknown => "unknown",
        }
    }

    /// Parse an error code, mapping anything unrecognized to `Unknown`.
    pub fn parse_lenient(value: &str) -> FailureKind {
        let raw = value.trim().to_lowercase();
        FailureKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == raw)
            .unwrap_or(FailureKind::Unknown)
    }

    /// Whether this kind is retryable unless a call site says otherwise.
    pub fn is_default_retryable(self) -> bool {
        matches!(
            self,
            FailureKind::SchemaMismatch
                | FailureKind::RateLimited
                | FailureKind::Timeout
                | FailureKind::QualityFailed
        )
    }

    pub fn http_status(self) -> u16 {
        match self {
            FailureKind::RateLimited => 429,
            FailureKind::Timeout => 504,
            FailureKind::QualityFailed | FailureKind::SchemaMismatch => 422,
            FailureKind::ConfigError => 503,
            FailureKind::ProviderError | FailureKind::DbError | FailureKind::EmptyOutput => 502,
            FailureKind::Unknown => 500,
        }
    }

    /// Client-facing message used when a failure carries no reason text.
    pub fn default_message(self) -> &'static str {
        match self {
            FailureKind::SchemaMismatch => "AI response schema mismatch",
            FailureKind::RateLimited => "AI provider rate limited the request",
            FailureKind::Timeout => "AI request timed out",
            FailureKind::QualityFailed => "Generated output did not pass quality checks",
            FailureKind::ConfigError => "AI service configuration error",
            FailureKind::EmptyOutput => "AI returned empty content",
            FailureKind::ProviderError => "AI provider request failed",
            FailureKind::DbError => "Failed to persist generated result",
            FailureKind::Unknown => "Request failed",
        }
    }

    pub fn classification(self) -> Classification {
        Classification {
            kind: self,
            http_status: self.http_status(),
            retryable: self.is_default_retryable(),
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of classifying a failure reason
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub kind: FailureKind,
    pub http_status: u16,
    pub retryable: bool,
}

/// Classify a free-text failure reason.
///
/// Priority: rate limit > timeout > quality sentinel > schema > config > provider error.
pub fn classify(reason: &str) -> Classification {
    let text = reason.to_lowercase();
    let matches_any = |tokens: &[&str]| tokens.iter().any(|token| text.contains(token));

    let kind = if matches_any(RATE_LIMIT_TOKENS) {
        FailureKind::RateLimited
    } else if matches_any(TIMEOUT_TOKENS) {
        FailureKind::Timeout
    } else if text.contains(QUALITY_SENTINEL) {
        FailureKind::QualityFailed
    } else if matches_any(SCHEMA_TOKENS) {
        FailureKind::SchemaMismatch
    } else if matches_any(CONFIG_TOKENS) {
        FailureKind::ConfigError
    } else {
        FailureKind::ProviderError
    };
    kind.classification()
}

/// Trim a raw failure reason and cap it for classification and logging.
pub fn error_detail(reason: &str) -> String {
    let trimmed = reason.trim();
    if trimmed.is_empty() {
        return EMPTY_REASON.to_string();
    }
    truncate_chars(trimmed, RAW_REASON_LIMIT)
}

/// Collapse whitespace and cap a reason for client-facing strings.
pub fn normalize_reason(reason: &str) -> String {
    let collapsed = collapse_whitespace(reason);
    if collapsed.is_empty() {
        return EMPTY_REASON.to_string();
    }
    truncate_chars(&collapsed, NORMALIZED_REASON_LIMIT)
}

pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub(crate) fn truncate_chars(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((byte_idx, _)) => text[..byte_idx].to_string(),
        None => text.to_string(),
    }
}
