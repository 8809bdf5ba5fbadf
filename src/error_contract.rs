//! Structured Error Contract
//!
//! Builds the public error payload returned to clients. Payloads come from a
//! terminal [`PipelineFailure`], from a failure caught at a non-retried call
//! site, or from a legacy detail string sent by older clients. `error_code`
//! is always a member of [`FailureKind`].

use crate::failure::{self, collapse_whitespace, FailureKind};
use crate::pipeline::{format_pipeline_error_detail, AttemptError, PipelineFailure};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Maximum length of the client-facing `message`.
pub const MESSAGE_LIMIT: usize = 260;

/// Legacy prefix for provider construction failures.
pub const INIT_FAILED_PREFIX: &str = "ai_service_init_failed";

/// Legacy prefix for request bodies that fail to decode.
pub const INVALID_REQUEST_PREFIX: &str = "invalid_request";

static PIPELINE_FAILURE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9_]+_failed:([a-z_]+):(.*)$").expect("valid pattern"));

/// Per-request trace identifier echoed in every error payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TraceId(String);

impl TraceId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    /// Use a caller-supplied id (e.g. an `x-trace-id` header) when present.
    pub fn from_header(value: Option<&str>) -> Self {
        match value.map(str::trim).filter(|v| !v.is_empty()) {
            Some(v) => Self(v.to_string()),
            None => Self::new(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TraceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Error detail attached to a failed call before a trace id is assigned
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredErrorDetail {
    pub error_code: FailureKind,
    pub message: String,
    pub retryable: bool,
    pub detail: String,
}

/// Detail as received from a call site: structured, or a bare legacy string
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ErrorDetail {
    Structured(StructuredErrorDetail),
    Legacy(String),
}

/// Wire-level error body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub error_code: FailureKind,
    pub message: String,
    pub retryable: bool,
    pub trace_id: String,
    pub detail: String,
}

/// Build a structured detail, defaulting message and retryability from the kind.
pub fn build_structured_error_detail(
    error_code: &str,
    message: Option<&str>,
    retryable: Option<bool>,
    detail: Option<&str>,
) -> StructuredErrorDetail {
    let code = FailureKind::parse_lenient(error_code);
    let mut message_text = collapse_whitespace(message.unwrap_or_default());
    if message_text.is_empty() {
        message_text = build_message(code, detail.unwrap_or_default());
    }
    let retryable = retryable.unwrap_or_else(|| code.is_default_retryable());

    let mut legacy_detail = collapse_whitespace(detail.unwrap_or_default());
    if legacy_detail.is_empty() {
        legacy_detail = message_text.clone();
    }

    StructuredErrorDetail {
        error_code: code,
        message: failure::truncate_chars(&message_text, MESSAGE_LIMIT),
        retryable,
        detail: legacy_detail,
    }
}

fn build_message(code: FailureKind, reason: &str) -> String {
    let message = collapse_whitespace(reason);
    if message.is_empty() {
        return code.default_message().to_string();
    }
    failure::truncate_chars(&message, MESSAGE_LIMIT)
}

/// Parsed form of a legacy detail string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyDetail {
    pub code: FailureKind,
    pub message: String,
    pub detail: String,
}

/// Recover a failure kind from an unstructured legacy detail string.
pub fn parse_legacy_detail(detail: &str) -> LegacyDetail {
    let text = collapse_whitespace(detail);
    let legacy = |code: FailureKind, reason: &str| LegacyDetail {
        code,
        message: build_message(code, reason),
        detail: text.clone(),
    };

    if text.is_empty() {
        return legacy(FailureKind::Unknown, "");
    }

    if let Some(reason) = text
        .strip_prefix(INIT_FAILED_PREFIX)
        .and_then(|rest| rest.strip_prefix(':'))
    {
        return legacy(FailureKind::ConfigError, reason);
    }

    if text == "chat_empty_assistant" {
        return legacy(FailureKind::EmptyOutput, "");
    }

    if let Some(captures) = PIPELINE_FAILURE_PATTERN.captures(&text) {
        let mut code = FailureKind::parse_lenient(&captures[1]);
        if code == FailureKind::Unknown {
            code = FailureKind::ProviderError;
        }
        return legacy(code, &captures[2]);
    }

    let (head, tail) = match text.split_once(':') {
        Some((head, tail)) => (head.trim().to_lowercase(), tail),
        None => (text.trim().to_lowercase(), ""),
    };
    let token_code = FailureKind::parse_lenient(&head);
    if token_code != FailureKind::Unknown {
        return legacy(token_code, tail);
    }

    if head.ends_with("_failed") {
        return legacy(FailureKind::ProviderError, &text);
    }

    legacy(FailureKind::Unknown, &text)
}

impl StructuredErrorDetail {
    /// Detail for a terminal pipeline failure.
    pub fn from_pipeline_failure(failure: &PipelineFailure) -> Self {
        build_structured_error_detail(
            failure.kind.as_str(),
            Some(&failure.reason),
            Some(failure.retryable),
            Some(&failure.legacy_detail()),
        )
    }
}

impl ErrorPayload {
    pub fn from_detail(detail: &ErrorDetail, trace_id: &TraceId) -> Self {
        match detail {
            ErrorDetail::Structured(structured) => Self::from_structured(structured, trace_id),
            ErrorDetail::Legacy(text) => {
                let parsed = parse_legacy_detail(text);
                Self {
                    error_code: parsed.code,
                    message: parsed.message,
                    retryable: parsed.code.is_default_retryable(),
                    trace_id: trace_id.to_string(),
                    detail: parsed.detail,
                }
            }
        }
    }

    fn from_structured(detail: &StructuredErrorDetail, trace_id: &TraceId) -> Self {
        let mut code = detail.error_code;
        let mut inferred_legacy = String::new();
        if code == FailureKind::Unknown {
            let parsed = parse_legacy_detail(&detail.detail);
            code = parsed.code;
            inferred_legacy = parsed.detail;
        }

        let mut message = collapse_whitespace(&detail.message);
        if message.is_empty() {
            message = build_message(code, &detail.detail);
        }

        let mut legacy_detail = detail.detail.trim().to_string();
        if legacy_detail.is_empty() {
            legacy_detail = if inferred_legacy.is_empty() {
                message.clone()
            } else {
                inferred_legacy
            };
        }

        Self {
            error_code: code,
            message: failure::truncate_chars(&message, MESSAGE_LIMIT),
            retryable: detail.retryable,
            trace_id: trace_id.to_string(),
            detail: legacy_detail,
        }
    }

    /// Payload for failures outside the pipeline boundary; leaks nothing but the trace id.
    pub fn unexpected(trace_id: &TraceId) -> Self {
        Self {
            error_code: FailureKind::Unknown,
            message: "Unexpected server error".to_string(),
            retryable: false,
            trace_id: trace_id.to_string(),
            detail: "unexpected_server_error".to_string(),
        }
    }
}

/// Failure returned by a call site: HTTP status plus structured detail
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{detail}")]
pub struct ServiceError {
    pub status: u16,
    pub detail: ErrorDetail,
}

impl ServiceError {
    pub fn new(status: u16, detail: StructuredErrorDetail) -> Self {
        Self {
            status,
            detail: ErrorDetail::Structured(detail),
        }
    }

    /// Surface a terminal pipeline failure to the client.
    pub fn from_pipeline_failure(failure: &PipelineFailure) -> Self {
        Self::new(
            failure.http_status,
            StructuredErrorDetail::from_pipeline_failure(failure),
        )
    }

    /// Classify a failure caught at a call site that does not retry.
    pub fn from_direct_failure(pipeline: &str, err: &AttemptError) -> Self {
        let reason = err.reason();
        let classification = err.classification();
        Self::new(
            classification.http_status,
            build_structured_error_detail(
                classification.kind.as_str(),
                Some(&reason),
                Some(classification.retryable),
                Some(&format_pipeline_error_detail(
                    pipeline,
                    classification.kind,
                    &reason,
                )),
            ),
        )
    }

    /// Provider could not be constructed; reported on first use.
    pub fn service_init_failed(reason: &str) -> Self {
        let reason = failure::error_detail(reason);
        Self::new(
            FailureKind::ConfigError.http_status(),
            build_structured_error_detail(
                FailureKind::ConfigError.as_str(),
                Some(&reason),
                Some(false),
                Some(&format!("{}:config_error:{}", INIT_FAILED_PREFIX, reason)),
            ),
        )
    }

    /// Caller input that does not decode into a request. The caller must fix
    /// the input, so it is never retryable.
    pub fn invalid_request(reason: &str) -> Self {
        let reason = failure::error_detail(reason);
        Self::new(
            400,
            build_structured_error_detail(
                FailureKind::SchemaMismatch.as_str(),
                Some(&reason),
                Some(false),
                Some(&format!("{}:{}", INVALID_REQUEST_PREFIX, reason)),
            ),
        )
    }

    /// The provider answered but produced nothing usable; never retried.
    pub fn empty_output(reason: &str) -> Self {
        Self::new(
            FailureKind::EmptyOutput.http_status(),
            build_structured_error_detail(
                FailureKind::EmptyOutput.as_str(),
                Some(reason),
                Some(false),
                Some(reason),
            ),
        )
    }

    /// Wrap a bare legacy detail string.
    pub fn legacy(status: u16, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: ErrorDetail::Legacy(detail.into()),
        }
    }

    pub fn to_payload(&self, trace_id: &TraceId) -> ErrorPayload {
        ErrorPayload::from_detail(&self.detail, trace_id)
    }
}

impl fmt::Display for ErrorDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorDetail::Structured(detail) => f.write_str(&detail.detail),
            ErrorDetail::Legacy(text) => f.write_str(text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trace(id: &str) -> TraceId {
        TraceId::from_header(Some(id))
    }

    #[test]
    fn test_structured_detail_round_trip() {
        let detail = build_structured_error_detail(
            "rate_limited",
            Some("429 too many requests"),
            Some(true),
            Some("content_generate_failed:rate_limited:429 too many requests"),
        );
        let err = ServiceError::new(429, detail);
        let payload = err.to_payload(&trace("trace-1"));

        assert_eq!(payload.error_code, FailureKind::RateLimited);
        assert_eq!(payload.message, "429 too many requests");
        assert!(payload.retryable);
        assert_eq!(payload.trace_id, "trace-1");
        assert!(payload.detail.contains("content_generate_failed:rate_limited"));
    }

    #[test]
    fn test_structured_detail_defaults_retryable_from_code() {
        let detail = build_structured_error_detail(
            "provider_error",
            Some("downstream unavailable"),
            None,
            Some("curriculum_refine_failed:provider_error:downstream unavailable"),
        );
        let payload = ServiceError::new(502, detail).to_payload(&trace("trace-2"));

        assert_eq!(payload.error_code, FailureKind::ProviderError);
        assert_eq!(payload.message, "downstream unavailable");
        assert!(!payload.retryable);
    }

    #[test]
    fn test_unrecognized_code_defaults_to_unknown() {
        let detail = build_structured_error_detail("exploded", None, None, None);
        assert_eq!(detail.error_code, FailureKind::Unknown);
        assert_eq!(detail.message, "Request failed");
        assert_eq!(detail.detail, "Request failed");
        assert!(!detail.retryable);
    }

    #[test]
    fn test_message_is_collapsed_and_capped() {
        let long = format!("  {}  \n ", "word ".repeat(100));
        let detail = build_structured_error_detail("timeout", Some(&long), None, None);
        assert!(detail.message.chars().count() <= MESSAGE_LIMIT);
        assert!(!detail.message.contains("  "));
        assert!(detail.retryable);
    }

    #[test]
    fn test_parse_legacy_pipeline_detail() {
        let parsed = parse_legacy_detail("content_generate_failed:timeout:read timed out");
        assert_eq!(parsed.code, FailureKind::Timeout);
        assert_eq!(parsed.message, "read timed out");

        let parsed = parse_legacy_detail("content_generate_failed:weird_kind:oops");
        assert_eq!(parsed.code, FailureKind::ProviderError);
    }

    #[test]
    fn test_parse_legacy_special_prefixes() {
        let parsed = parse_legacy_detail("ai_service_init_failed:gemini_api_key_missing");
        assert_eq!(parsed.code, FailureKind::ConfigError);
        assert_eq!(parsed.message, "gemini_api_key_missing");

        assert_eq!(
            parse_legacy_detail("chat_empty_assistant").code,
            FailureKind::EmptyOutput
        );
        assert_eq!(parse_legacy_detail("schema_mismatch:bad").code, FailureKind::SchemaMismatch);
        assert_eq!(parse_legacy_detail("search_failed").code, FailureKind::ProviderError);
        assert_eq!(parse_legacy_detail("something odd").code, FailureKind::Unknown);
        assert_eq!(parse_legacy_detail("   ").code, FailureKind::Unknown);
    }

    #[test]
    fn test_structured_unknown_code_infers_from_legacy_detail() {
        let detail = StructuredErrorDetail {
            error_code: FailureKind::Unknown,
            message: String::new(),
            retryable: false,
            detail: "curriculum_generate_failed:schema_mismatch:bad json".to_string(),
        };
        let payload = ServiceError::new(422, detail).to_payload(&trace("t"));
        assert_eq!(payload.error_code, FailureKind::SchemaMismatch);
        assert_eq!(payload.message, "curriculum_generate_failed:schema_mismatch:bad json");
    }

    #[test]
    fn test_legacy_service_error_payload() {
        let err = ServiceError::legacy(502, "curriculum_sections_failed:rate_limited:quota");
        let payload = err.to_payload(&trace("t"));
        assert_eq!(payload.error_code, FailureKind::RateLimited);
        assert!(payload.retryable);
        assert_eq!(payload.detail, "curriculum_sections_failed:rate_limited:quota");
    }

    #[test]
    fn test_direct_failure_classifies_reason() {
        let err = ServiceError::from_direct_failure(
            "curriculum_reasoning",
            &AttemptError::provider("ai_primary_failed:gemini_request_failed: timed out"),
        );
        assert_eq!(err.status, 504);
        let payload = err.to_payload(&trace("t"));
        assert_eq!(payload.error_code, FailureKind::Timeout);
        assert!(payload.detail.starts_with("curriculum_reasoning_failed:timeout:"));
    }

    #[test]
    fn test_service_init_failed_is_config_error() {
        let err = ServiceError::service_init_failed("gemini_api_key_missing");
        assert_eq!(err.status, 503);
        let payload = err.to_payload(&trace("t"));
        assert_eq!(payload.error_code, FailureKind::ConfigError);
        assert!(!payload.retryable);
        assert_eq!(
            payload.detail,
            "ai_service_init_failed:config_error:gemini_api_key_missing"
        );
    }

    #[test]
    fn test_unexpected_payload_hides_detail() {
        let payload = ErrorPayload::unexpected(&trace("t-9"));
        assert_eq!(payload.error_code, FailureKind::Unknown);
        assert_eq!(payload.detail, "unexpected_server_error");
        assert_eq!(payload.trace_id, "t-9");
    }

    #[test]
    fn test_trace_id_generation() {
        let a = TraceId::new();
        let b = TraceId::from_header(Some("  "));
        assert_eq!(a.as_str().len(), 32);
        assert_ne!(a, b);
    }
}
