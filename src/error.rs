//! Error types for the studygen generation pipeline.
//!
//! Pipeline failures (provider calls, quality gates) are expressed through
//! [`crate::failure::FailureKind`] and [`crate::pipeline::PipelineFailure`].
//! `ApiError` covers everything around the pipeline: configuration, provider
//! construction, request decoding and the CLI boundary.

use crate::failure::FailureKind;
use thiserror::Error;

/// Ambient errors raised outside of a generation attempt
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Provider not configured: {0}")]
    ProviderNotConfigured(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl ApiError {
    /// Map an ambient error onto the public failure vocabulary.
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            ApiError::ConfigError(_) | ApiError::ProviderNotConfigured(_) => {
                FailureKind::ConfigError
            }
            ApiError::InvalidRequest(_) => FailureKind::SchemaMismatch,
            ApiError::IoError(_) | ApiError::JsonError(_) => FailureKind::Unknown,
        }
    }
}

impl From<config::ConfigError> for ApiError {
    fn from(err: config::ConfigError) -> Self {
        ApiError::ConfigError(err.to_string())
    }
}
