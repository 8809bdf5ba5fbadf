//! Merge rules: defaults first, every later source overrides key by key.

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError};

/// Create a Config builder with the built-in defaults applied.
pub fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("ai.provider", "gemini")?
        .set_default("ai.request_timeout_sec", 30)?
        .set_default("ai.max_concurrency", 4)?
        .set_default("ai.backpressure_acquire_timeout_ms", 200)?
        .set_default("ai.gemini_model", "gemini-2.0-flash")?
        .set_default("ai.openai_model", "gpt-4o-mini")?
        .set_default("ai.openai_base_url", "https://api.openai.com/v1")?
        .set_default("assessment.analysis_mode", "rule")?
        .set_default("pipeline.max_attempts", 2)
}
