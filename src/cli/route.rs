//! CLI route: single route table and run context. Dispatches to the generation service.

use crate::cli::command_name;
use crate::cli::output::CommandError;
use crate::cli::parse::{AssessmentCommands, Commands, CurriculumCommands, InputArgs};
use crate::config::{ConfigLoader, StudygenConfig};
use crate::error::ApiError;
use crate::error_contract::{ErrorDetail, ErrorPayload, TraceId};
use crate::failure::classify;
use crate::provider::FixtureProvider;
use crate::service::GenerationService;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Runtime context for CLI execution: loaded configuration and the service.
pub struct RunContext {
    config: StudygenConfig,
    service: GenerationService,
    trace_id: TraceId,
}

impl RunContext {
    /// Load configuration from `working_dir` (or `config_path`) and build the service.
    ///
    /// With a fixture the configured provider is bypassed, but admission limits
    /// and retry options still come from the configuration.
    pub fn new(
        working_dir: PathBuf,
        config_path: Option<PathBuf>,
        fixture: Option<&Path>,
        trace_id: TraceId,
    ) -> Result<Self, ApiError> {
        let config = ConfigLoader::new(working_dir).with_file(config_path).load()?;
        Self::from_config(config, fixture, trace_id)
    }

    pub fn from_config(
        config: StudygenConfig,
        fixture: Option<&Path>,
        trace_id: TraceId,
    ) -> Result<Self, ApiError> {
        let service = match fixture {
            Some(path) => {
                let provider = FixtureProvider::from_file(path).map_err(|e| {
                    ApiError::ProviderNotConfigured(format!("fixture {}: {}", path.display(), e))
                })?;
                debug!(fixture = %path.display(), "Using fixture provider");
                GenerationService::with_provider(Arc::new(provider), &config)
            }
            None => GenerationService::from_config(&config),
        };
        Ok(Self {
            config,
            service,
            trace_id,
        })
    }

    pub fn config(&self) -> &StudygenConfig {
        &self.config
    }

    pub fn trace_id(&self) -> &TraceId {
        &self.trace_id
    }

    /// Execute a command and return its JSON output.
    pub async fn execute(&self, command: &Commands) -> Result<String, CommandError> {
        let started = Instant::now();
        let name = command_name(command);
        let result = self.execute_inner(command).await;
        info!(
            command = %name,
            ok = result.is_ok(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Command finished"
        );
        result
    }

    async fn execute_inner(&self, command: &Commands) -> Result<String, CommandError> {
        match command {
            Commands::Generate(input) => {
                let request = read_request(input)?;
                render(&self.service.generate_content(&request).await?)
            }
            Commands::Curriculum { command } => self.handle_curriculum(command).await,
            Commands::Assessment { command } => self.handle_assessment(command).await,
            Commands::Chat(input) => {
                let request = read_request(input)?;
                render(&self.service.chat(&request).await?)
            }
            Commands::Classify { reason } => {
                let classification = classify(reason);
                render(&json!({
                    "kind": classification.kind,
                    "http_status": classification.http_status,
                    "retryable": classification.retryable,
                }))
            }
            Commands::ExplainError { detail } => render(&ErrorPayload::from_detail(
                &ErrorDetail::Legacy(detail.clone()),
                &self.trace_id,
            )),
        }
    }

    async fn handle_curriculum(&self, command: &CurriculumCommands) -> Result<String, CommandError> {
        match command {
            CurriculumCommands::Generate(input) => {
                let request = read_request(input)?;
                render(&self.service.generate_curriculum(&request).await?)
            }
            CurriculumCommands::Refine(input) => {
                let request = read_request(input)?;
                render(&self.service.refine_curriculum(&request).await?)
            }
            CurriculumCommands::Reasoning(input) => {
                let request = read_request(input)?;
                render(&self.service.curriculum_reasoning(&request).await?)
            }
            CurriculumCommands::Sections(input) => {
                let request = read_request(input)?;
                render(&self.service.curriculum_sections(&request).await?)
            }
        }
    }

    async fn handle_assessment(&self, command: &AssessmentCommands) -> Result<String, CommandError> {
        match command {
            AssessmentCommands::Questions(input) => {
                let request = read_request(input)?;
                render(&self.service.assessment_questions(&request).await?)
            }
            AssessmentCommands::Analyze(input) => {
                let request = read_request(input)?;
                render(&self.service.assessment_analyze(&request).await?)
            }
        }
    }
}

/// Decode a request from `--input` or stdin.
fn read_request<T: DeserializeOwned>(input: &InputArgs) -> Result<T, ApiError> {
    let text = match &input.input {
        Some(path) => std::fs::read_to_string(path)?,
        None => {
            let mut buffer = String::new();
            std::io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
    };
    serde_json::from_str(&text).map_err(|e| ApiError::InvalidRequest(e.to_string()))
}

fn render<T: Serialize>(value: &T) -> Result<String, CommandError> {
    Ok(serde_json::to_string_pretty(value).map_err(ApiError::from)?)
}
