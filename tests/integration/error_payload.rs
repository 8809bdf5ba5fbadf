//! Integration tests for the client-facing error contract

use studygen::cli::{map_error, CommandError};
use studygen::error::ApiError;
use studygen::error_contract::{
    build_structured_error_detail, ErrorDetail, ErrorPayload, ServiceError, TraceId, MESSAGE_LIMIT,
};
use studygen::failure::FailureKind;
use studygen::pipeline::PipelineFailure;

fn quality_failure() -> PipelineFailure {
    PipelineFailure {
        pipeline: "content_generate".to_string(),
        kind: FailureKind::QualityFailed,
        http_status: 422,
        retryable: true,
        reason: "quality_validation_failed:topic_keyword_missing".to_string(),
        attempt_count: 2,
    }
}

#[test]
fn pipeline_failure_becomes_retryable_payload() {
    let trace_id = TraceId::from_header(Some("trace-e2e"));
    let err = ServiceError::from_pipeline_failure(&quality_failure());
    assert_eq!(err.status, 422);

    let payload = err.to_payload(&trace_id);
    assert_eq!(payload.error_code, FailureKind::QualityFailed);
    assert!(payload.retryable);
    assert_eq!(payload.trace_id, "trace-e2e");
    assert_eq!(payload.message, "quality_validation_failed:topic_keyword_missing");
    assert!(payload.detail.starts_with("content_generate_failed:quality_failed:"));
}

#[test]
fn payload_wire_shape() {
    let payload = ServiceError::from_pipeline_failure(&quality_failure())
        .to_payload(&TraceId::from_header(Some("t-1")));
    let value = serde_json::to_value(&payload).unwrap();
    let mut keys: Vec<&str> = value.as_object().unwrap().keys().map(String::as_str).collect();
    keys.sort_unstable();
    assert_eq!(keys, vec!["detail", "error_code", "message", "retryable", "trace_id"]);
    assert_eq!(value["error_code"], "quality_failed");
}

#[test]
fn legacy_details_are_parsed_into_known_kinds() {
    let trace_id = TraceId::new();
    let cases = [
        ("curriculum_sections_failed:rate_limited:ai_backpressure_busy", FailureKind::RateLimited),
        ("ai_service_init_failed:openai_api_key_missing", FailureKind::ConfigError),
        ("chat_empty_assistant", FailureKind::EmptyOutput),
        ("timeout: upstream slow", FailureKind::Timeout),
        ("content_generate_failed:mystery:boom", FailureKind::ProviderError),
        ("assessment_save_failed", FailureKind::ProviderError),
        ("something odd happened", FailureKind::Unknown),
    ];
    for (detail, expected) in cases {
        let payload = ErrorPayload::from_detail(&ErrorDetail::Legacy(detail.to_string()), &trace_id);
        assert_eq!(payload.error_code, expected, "detail: {detail}");
        assert_eq!(payload.retryable, expected.is_default_retryable());
        assert_eq!(payload.detail, detail);
    }
}

#[test]
fn unknown_structured_code_is_inferred_from_detail() {
    let detail = build_structured_error_detail(
        "not_a_code",
        None,
        Some(false),
        Some("content_generate_failed:timeout:read timed out"),
    );
    assert_eq!(detail.error_code, FailureKind::Unknown);

    let payload = ServiceError::new(500, detail).to_payload(&TraceId::new());
    assert_eq!(payload.error_code, FailureKind::Timeout);
    assert!(!payload.retryable);
}

#[test]
fn message_is_capped() {
    let long_reason = "x".repeat(MESSAGE_LIMIT * 2);
    let detail = build_structured_error_detail("provider_error", Some(&long_reason), None, None);
    assert_eq!(detail.message.chars().count(), MESSAGE_LIMIT);
    assert!(!detail.retryable);
}

#[test]
fn unexpected_errors_carry_only_the_trace_id() {
    let trace_id = TraceId::from_header(Some("trace-secret"));
    let err = CommandError::Api(ApiError::InvalidRequest("token=abc123".to_string()));
    let (payload, code) = map_error(&err, &trace_id);
    assert_eq!(payload.error_code, FailureKind::Unknown);
    assert_eq!(payload.message, "Unexpected server error");
    assert!(!payload.detail.contains("abc123"));
    assert_eq!(code, 5);
}

#[test]
fn every_kind_round_trips_through_its_code() {
    for kind in FailureKind::ALL {
        assert_eq!(FailureKind::parse_lenient(kind.as_str()), kind);
        let detail = build_structured_error_detail(kind.as_str(), None, None, None);
        assert_eq!(detail.message, kind.default_message());
        assert_eq!(detail.detail, kind.default_message());
    }
}
