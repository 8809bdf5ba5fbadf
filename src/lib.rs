//! Studygen: Quality-Gated Learning Content Generation
//!
//! Turns short structured requests (a lesson, a quiz set, a curriculum, an
//! assessment) into validated JSON by delegating generation to an LLM
//! provider. Provider calls pass an admission gateway, failures are classified
//! into a stable taxonomy and retried under a per-call-site policy, and
//! well-formed but poor outputs are rejected by quality gates. Some call sites
//! substitute a deterministic fallback once attempts are exhausted.

pub mod cli;
pub mod config;
pub mod content;
pub mod error;
pub mod error_contract;
pub mod failure;
pub mod gateway;
pub mod logging;
pub mod pipeline;
pub mod provider;
pub mod service;

pub use error::ApiError;
pub use failure::{classify, Classification, FailureKind};
pub use pipeline::{run_with_retry, AttemptError, PipelineFailure, RetryPolicy};
pub use service::{GenerationMeta, GenerationService, WithMeta};
