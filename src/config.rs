//! Configuration System
//!
//! Layered settings for the generation service. Later layers win:
//! built-in defaults, the global file (`$XDG_CONFIG_HOME/studygen/config.toml`),
//! the project file (`--config` or `./studygen.toml`), `STUDYGEN__SECTION__KEY`
//! environment variables, then the vendor API key aliases for keys still empty.

use crate::error::ApiError;
use crate::gateway::GatewayConfig;
use crate::logging::LoggingConfig;
use crate::provider::ProviderKind;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

mod merge;
mod sources;

pub use sources::global_file::global_config_path;
pub use sources::project_file::PROJECT_CONFIG_FILE;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudygenConfig {
    pub ai: AiConfig,
    pub assessment: AssessmentConfig,
    pub pipeline: PipelineConfig,
    pub logging: LoggingConfig,
}

/// Provider selection and admission limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    pub provider: ProviderKind,
    pub request_timeout_sec: u64,
    pub max_concurrency: usize,
    pub backpressure_acquire_timeout_ms: u64,
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub openai_api_key: String,
    pub openai_model: String,
    pub openai_base_url: String,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Gemini,
            request_timeout_sec: 30,
            max_concurrency: 4,
            backpressure_acquire_timeout_ms: 200,
            gemini_api_key: String::new(),
            gemini_model: "gemini-2.0-flash".to_string(),
            openai_api_key: String::new(),
            openai_model: "gpt-4o-mini".to_string(),
            openai_base_url: "https://api.openai.com/v1".to_string(),
        }
    }
}

impl AiConfig {
    pub fn gateway_config(&self) -> GatewayConfig {
        GatewayConfig {
            max_concurrency: self.max_concurrency,
            acquire_timeout: Duration::from_millis(self.backpressure_acquire_timeout_ms),
        }
    }
}

/// How assessment results are analyzed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisMode {
    #[default]
    Rule,
    Llm,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssessmentConfig {
    pub analysis_mode: AnalysisMode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub max_attempts: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self { max_attempts: 2 }
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    Ai(String),
    Pipeline(String),
    Logging(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Ai(msg) => write!(f, "ai: {}", msg),
            ValidationError::Pipeline(msg) => write!(f, "pipeline: {}", msg),
            ValidationError::Logging(msg) => write!(f, "logging: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl StudygenConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if self.ai.max_concurrency == 0 {
            errors.push(ValidationError::Ai("max_concurrency must be at least 1".to_string()));
        }
        if self.ai.request_timeout_sec == 0 {
            errors.push(ValidationError::Ai("request_timeout_sec must be positive".to_string()));
        }
        if self.ai.backpressure_acquire_timeout_ms == 0 {
            errors.push(ValidationError::Ai(
                "backpressure_acquire_timeout_ms must be positive".to_string(),
            ));
        }
        if self.pipeline.max_attempts == 0 {
            errors.push(ValidationError::Pipeline("max_attempts must be at least 1".to_string()));
        }
        if let Err(e) = crate::logging::validate(&self.logging) {
            errors.push(ValidationError::Logging(e));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Snapshot of the process environment used while loading
#[derive(Debug, Clone, Default)]
pub struct EnvSnapshot(HashMap<String, String>);

impl EnvSnapshot {
    pub fn from_process() -> Self {
        Self(std::env::vars().collect())
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self(pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }

    /// Non-blank value of a variable
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.trim().is_empty())
    }

    pub(crate) fn vars(&self) -> &HashMap<String, String> {
        &self.0
    }
}

/// Loads and validates [`StudygenConfig`]
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    env: EnvSnapshot,
    working_dir: PathBuf,
    explicit_file: Option<PathBuf>,
}

impl ConfigLoader {
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            env: EnvSnapshot::from_process(),
            working_dir: working_dir.into(),
            explicit_file: None,
        }
    }

    pub fn with_env(mut self, env: EnvSnapshot) -> Self {
        self.env = env;
        self
    }

    /// Use this file instead of `./studygen.toml`; it must exist.
    pub fn with_file(mut self, path: Option<PathBuf>) -> Self {
        self.explicit_file = path;
        self
    }

    pub fn load(&self) -> Result<StudygenConfig, ApiError> {
        let builder = merge::merge_policy::builder_with_defaults()?;
        let builder = sources::global_file::add_to_builder(builder, &self.env)?;
        let builder = sources::project_file::add_to_builder(
            builder,
            &self.working_dir,
            self.explicit_file.as_deref(),
        )?;
        let builder = sources::environment::add_to_builder(builder, &self.env);

        let mut config: StudygenConfig = builder.build()?.try_deserialize()?;
        sources::environment::apply_key_aliases(&mut config.ai, &self.env);

        config.validate().map_err(|errors| {
            let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            ApiError::ConfigError(format!(
                "Configuration validation failed: {}",
                messages.join("; ")
            ))
        })?;
        Ok(config)
    }

    /// Load a single file on top of the defaults, without environment layers.
    pub fn load_from_file(path: &Path) -> Result<StudygenConfig, ApiError> {
        let builder = merge::merge_policy::builder_with_defaults()?;
        let builder = sources::project_file::add_to_builder(builder, Path::new("."), Some(path))?;
        Ok(builder.build()?.try_deserialize()?)
    }
}
