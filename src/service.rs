//! Generation call sites.
//!
//! [`GenerationService`] owns the provider gateway and runs each operation
//! through the retry orchestrator with the call site's policy. Operations
//! with a fallback answer with a [`WithMeta`] envelope so callers can observe
//! degradation; the rest surface terminal failures as [`ServiceError`].

use crate::config::{AnalysisMode, StudygenConfig};
use crate::content::assessment::{self, AnalyzeRequest, AssessmentAnalysis, QuestionSet, QuestionsRequest};
use crate::content::chat::{self, ChatRequest, ChatResponse};
use crate::content::curriculum::{self, Curriculum, CurriculumRequest, NormalizeMode, RefineRequest};
use crate::content::lesson::{self, GenerateRequest, GeneratedContent};
use crate::content::reasoning::{self, ReasoningRequest, TopicReasoning};
use crate::content::sections::{self, SectionSequence, SectionsRequest};
use crate::content::{assert_quality, Prompt, ISSUE_CAP, SECTION_ISSUE_CAP};
use crate::error_contract::ServiceError;
use crate::failure::FailureKind;
use crate::gateway::ProviderGateway;
use crate::pipeline::{run_with_retry, AttemptError, PipelineFailure, RetryPolicy};
use crate::provider::{JsonObject, ProviderFactory, StructuredProvider};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// Degradation report attached to fallback-capable responses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationMeta {
    pub fallback_used: bool,
    pub failure_kind: Option<FailureKind>,
    pub attempt_count: u32,
}

impl GenerationMeta {
    fn generated(attempt_count: u32) -> Self {
        Self {
            fallback_used: false,
            failure_kind: None,
            attempt_count,
        }
    }

    fn fallback(failure: &PipelineFailure) -> Self {
        Self {
            fallback_used: true,
            failure_kind: Some(failure.kind),
            attempt_count: failure.attempt_count,
        }
    }
}

/// Response body with a `meta` block, serialized flat
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WithMeta<T> {
    #[serde(flatten)]
    pub body: T,
    pub meta: GenerationMeta,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceOptions {
    pub max_attempts: u32,
    pub analysis_mode: AnalysisMode,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            analysis_mode: AnalysisMode::Rule,
        }
    }
}

impl ServiceOptions {
    pub fn from_config(config: &StudygenConfig) -> Self {
        Self {
            max_attempts: config.pipeline.max_attempts,
            analysis_mode: config.assessment.analysis_mode,
        }
    }
}

pub struct GenerationService {
    gateway: Result<ProviderGateway, String>,
    options: ServiceOptions,
}

impl GenerationService {
    pub fn new(gateway: ProviderGateway, options: ServiceOptions) -> Self {
        Self {
            gateway: Ok(gateway),
            options,
        }
    }

    /// Build the configured provider behind a gateway.
    ///
    /// A provider that cannot be constructed does not fail here; every
    /// operation that needs it reports `config_error` instead.
    pub fn from_config(config: &StudygenConfig) -> Self {
        match ProviderFactory::create(&config.ai) {
            Ok(provider) => Self::with_provider(provider, config),
            Err(e) => {
                warn!(provider = config.ai.provider.as_str(), error = %e, "AI provider unavailable");
                Self {
                    gateway: Err(e.to_string()),
                    options: ServiceOptions::from_config(config),
                }
            }
        }
    }

    /// Use `provider` with the admission limits and options from `config`.
    pub fn with_provider(provider: Arc<dyn StructuredProvider>, config: &StudygenConfig) -> Self {
        Self::new(
            ProviderGateway::new(provider, config.ai.gateway_config()),
            ServiceOptions::from_config(config),
        )
    }

    pub fn options(&self) -> ServiceOptions {
        self.options
    }

    pub fn gateway(&self) -> Result<&ProviderGateway, ServiceError> {
        self.gateway
            .as_ref()
            .map_err(|reason| ServiceError::service_init_failed(reason))
    }

    fn quality_policy(&self) -> RetryPolicy {
        RetryPolicy::with_quality(self.options.max_attempts)
    }

    /// Lesson content or a quiz set; no fallback.
    pub async fn generate_content(
        &self,
        request: &GenerateRequest,
    ) -> Result<GeneratedContent, ServiceError> {
        let gateway = self.gateway()?;
        let policy = self.quality_policy();
        let (content, _) = run_with_retry(lesson::PIPELINE, &policy, |attempt| async move {
            let raw = call(gateway, lesson::prompt(request, attempt)).await?;
            let content = lesson::normalize(&raw, request);
            assert_quality(lesson::quality_issues(&content, request), ISSUE_CAP)?;
            Ok::<_, AttemptError>(content)
        })
        .await
        .map_err(|failure| ServiceError::from_pipeline_failure(&failure))?;
        Ok(content)
    }

    /// New curriculum; no fallback.
    pub async fn generate_curriculum(
        &self,
        request: &CurriculumRequest,
    ) -> Result<Curriculum, ServiceError> {
        let gateway = self.gateway()?;
        let policy = self.quality_policy();
        let (result, _) = run_with_retry(curriculum::PIPELINE, &policy, |attempt| async move {
            let raw = call(gateway, curriculum::prompt(request, attempt)).await?;
            let result = curriculum::normalize(&raw, request, NormalizeMode::Strict);
            assert_quality(curriculum::quality_issues(&result, request), ISSUE_CAP)?;
            Ok::<_, AttemptError>(result)
        })
        .await
        .map_err(|failure| ServiceError::from_pipeline_failure(&failure))?;
        Ok(result)
    }

    /// Rewrite a curriculum from the learner's message in one call.
    pub async fn refine_curriculum(&self, request: &RefineRequest) -> Result<Curriculum, ServiceError> {
        let gateway = self.gateway()?;
        let attempt = async {
            let raw = call(gateway, curriculum::refine_prompt(request)).await?;
            if !curriculum::has_raw_topics(&raw) {
                return Err(AttemptError::provider("curriculum_topics_missing"));
            }
            Ok::<_, AttemptError>(curriculum::normalize(
                &raw,
                &request.basis(),
                NormalizeMode::Lenient,
            ))
        };
        attempt
            .await
            .map_err(|err| direct_failure(curriculum::REFINE_PIPELINE, &err))
    }

    /// Teaching rationale for one topic in one call.
    pub async fn curriculum_reasoning(
        &self,
        request: &ReasoningRequest,
    ) -> Result<TopicReasoning, ServiceError> {
        let gateway = self.gateway()?;
        call(gateway, reasoning::prompt(request))
            .await
            .map(|raw| reasoning::normalize(&raw, request))
            .map_err(|err| direct_failure(reasoning::PIPELINE, &err))
    }

    /// Learning sections for a topic, falling back to the template sequence.
    pub async fn curriculum_sections(
        &self,
        request: &SectionsRequest,
    ) -> Result<WithMeta<SectionSequence>, ServiceError> {
        let gateway = self.gateway()?;
        let policy = self.quality_policy();
        let outcome = run_with_retry(sections::PIPELINE, &policy, |attempt| async move {
            let raw = call(gateway, sections::prompt(request, attempt)).await?;
            let result = sections::normalize(&raw, request);
            assert_quality(sections::quality_issues(&result, request), SECTION_ISSUE_CAP)?;
            Ok::<_, AttemptError>(result)
        })
        .await;
        with_fallback(&policy, outcome, || sections::fallback(request))
    }

    /// Placement questions, falling back to the fixed question set.
    pub async fn assessment_questions(
        &self,
        request: &QuestionsRequest,
    ) -> Result<WithMeta<QuestionSet>, ServiceError> {
        let gateway = self.gateway()?;
        let policy = self.quality_policy();
        let outcome = run_with_retry(assessment::QUESTIONS_PIPELINE, &policy, |attempt| async move {
            let raw = call(gateway, assessment::questions_prompt(request, attempt)).await?;
            let result = assessment::normalize(&raw, request);
            assert_quality(assessment::quality_issues(&result), ISSUE_CAP)?;
            Ok::<_, AttemptError>(result)
        })
        .await;
        with_fallback(&policy, outcome, || assessment::fallback(request))
    }

    /// Analyze placement answers by rule, or with one provider call in `llm` mode.
    pub async fn assessment_analyze(
        &self,
        request: &AnalyzeRequest,
    ) -> Result<AssessmentAnalysis, ServiceError> {
        if self.options.analysis_mode != AnalysisMode::Llm {
            return Ok(assessment::analyze(request));
        }
        let gateway = self.gateway()?;
        call(gateway, assessment::analyze_prompt(request))
            .await
            .map(|raw| assessment::normalize_analysis(&raw, request))
            .map_err(|err| direct_failure(assessment::ANALYZE_PIPELINE, &err))
    }

    /// One assistant reply to the latest user message.
    pub async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, ServiceError> {
        let last_user = chat::last_user_text(&request.messages);
        let prompt = chat::prompt(request, &last_user);
        let gateway = self.gateway()?;
        let raw = call(gateway, prompt)
            .await
            .map_err(|err| direct_failure(chat::PIPELINE, &err))?;
        let Some(assistant) = chat::assistant_text(&raw) else {
            warn!(pipeline = chat::PIPELINE, "Assistant reply was empty");
            return Err(ServiceError::empty_output(chat::EMPTY_ASSISTANT));
        };
        Ok(ChatResponse {
            chat_type: request.chat_type.clone(),
            context_id: request.context_id.clone(),
            assistant,
            streaming: false,
        })
    }
}

async fn call(gateway: &ProviderGateway, prompt: Prompt) -> Result<JsonObject, AttemptError> {
    gateway.generate_json(&prompt.system, &prompt.user).await
}

fn direct_failure(pipeline: &str, err: &AttemptError) -> ServiceError {
    let classification = err.classification();
    warn!(pipeline, kind = %classification.kind, reason = %err.reason(), "Direct generation failed");
    ServiceError::from_direct_failure(pipeline, err)
}

/// Substitute `fallback` when the terminal kind is one the site retries.
fn with_fallback<T>(
    policy: &RetryPolicy,
    outcome: Result<(T, u32), PipelineFailure>,
    fallback: impl FnOnce() -> T,
) -> Result<WithMeta<T>, ServiceError> {
    match outcome {
        Ok((body, attempt_count)) => {
            debug!(attempt_count, "Generation accepted");
            Ok(WithMeta {
                body,
                meta: GenerationMeta::generated(attempt_count),
            })
        }
        Err(failure) if policy.allows(failure.kind) => {
            warn!(
                pipeline = %failure.pipeline,
                kind = %failure.kind,
                attempt_count = failure.attempt_count,
                "Substituting fallback content"
            );
            Ok(WithMeta {
                body: fallback(),
                meta: GenerationMeta::fallback(&failure),
            })
        }
        Err(failure) => Err(ServiceError::from_pipeline_failure(&failure)),
    }
}
