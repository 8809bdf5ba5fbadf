//! CLI output: command errors to error payloads and exit codes.

use crate::error::ApiError;
use crate::error_contract::{build_structured_error_detail, ErrorPayload, ServiceError, TraceId};
use crate::failure::FailureKind;
use thiserror::Error;

/// Failure of a CLI command
#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Exit code for request input that does not decode.
pub const USAGE_ERROR: i32 = 2;

/// `4` for 4xx statuses, `5` for 5xx, `1` otherwise.
pub fn exit_code(status: u16) -> i32 {
    match status / 100 {
        code @ 4..=5 => i32::from(code),
        _ => 1,
    }
}

/// Payload and exit code for a failed command.
///
/// Configuration problems keep their reason and undecodable input is a
/// non-retryable `schema_mismatch`; any other ambient error is reported as an
/// unexpected failure carrying only the trace id.
pub fn map_error(err: &CommandError, trace_id: &TraceId) -> (ErrorPayload, i32) {
    match err {
        CommandError::Service(service) => (service.to_payload(trace_id), exit_code(service.status)),
        CommandError::Api(ApiError::InvalidRequest(reason)) => (
            ServiceError::invalid_request(reason).to_payload(trace_id),
            USAGE_ERROR,
        ),
        CommandError::Api(api) => match api.failure_kind() {
            FailureKind::Unknown => (
                ErrorPayload::unexpected(trace_id),
                exit_code(FailureKind::Unknown.http_status()),
            ),
            kind => {
                let reason = api.to_string();
                let detail = build_structured_error_detail(
                    kind.as_str(),
                    Some(&reason),
                    Some(kind.is_default_retryable()),
                    Some(&format!("{}:{}", kind, reason)),
                );
                let service = ServiceError::new(kind.http_status(), detail);
                (service.to_payload(trace_id), exit_code(service.status))
            }
        },
    }
}
