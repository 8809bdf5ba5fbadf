//! End-to-end generation through the service, the gateway and a fixture provider

use serde_json::json;
use studygen::config::StudygenConfig;
use studygen::content::curriculum::CurriculumRequest;
use studygen::content::lesson::GenerateRequest;
use studygen::content::reasoning::{self, ReasoningRequest, TopicReasoning};
use studygen::content::sections::{self, SectionsRequest};
use studygen::error_contract::{ErrorDetail, StructuredErrorDetail};
use studygen::failure::FailureKind;

use crate::integration::test_utils::{fixture_service, fixture_service_with, passing_lesson};

fn structured(detail: &ErrorDetail) -> &StructuredErrorDetail {
    match detail {
        ErrorDetail::Structured(detail) => detail,
        ErrorDetail::Legacy(text) => panic!("unexpected legacy detail {text}"),
    }
}

fn sections_request() -> SectionsRequest {
    SectionsRequest {
        input: ReasoningRequest::new("파이썬 반복문", "업무 자동화", "beginner", "python"),
        reasoning: TopicReasoning::default(),
    }
}

#[tokio::test]
async fn lesson_accepted_on_first_attempt() {
    let (service, provider) = fixture_service(vec![passing_lesson()]);
    let content = service
        .generate_content(&GenerateRequest::new("python", "파이썬 반복문"))
        .await
        .unwrap();
    assert_eq!(content.title, "파이썬 반복문 기초");
    assert_eq!(content.quiz.len(), 2);
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn lesson_retried_after_quality_rejection() {
    let (service, provider) = fixture_service(vec![json!({"title": "반복문"}), passing_lesson()]);
    let content = service
        .generate_content(&GenerateRequest::new("python", "파이썬 반복문"))
        .await
        .unwrap();
    assert_eq!(content.code_examples.len(), 1);
    assert_eq!(provider.calls(), 2);
}

#[tokio::test]
async fn lesson_retried_after_rate_limit() {
    let (service, provider) = fixture_service(vec![
        json!({"error": "gemini_request_failed:HTTP 429: RESOURCE_EXHAUSTED"}),
        passing_lesson(),
    ]);
    assert!(service
        .generate_content(&GenerateRequest::new("python", "파이썬 반복문"))
        .await
        .is_ok());
    assert_eq!(provider.calls(), 2);
}

#[tokio::test]
async fn lesson_provider_error_is_not_retried() {
    let (service, provider) = fixture_service(vec![
        json!({"error": "openai_choices_missing"}),
        passing_lesson(),
    ]);
    let err = service
        .generate_content(&GenerateRequest::new("python", "파이썬 반복문"))
        .await
        .unwrap_err();
    assert_eq!(err.status, 502);
    let detail = structured(&err.detail);
    assert_eq!(detail.error_code, FailureKind::ProviderError);
    assert!(!detail.retryable);
    assert_eq!(
        detail.detail,
        "content_generate_failed:provider_error:ai_primary_failed:openai_choices_missing"
    );
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn configured_attempts_bound_the_retry_loop() {
    let mut config = StudygenConfig::default();
    config.pipeline.max_attempts = 3;
    let (service, provider) =
        fixture_service_with(vec![json!({"error": "read timed out"})], &config);
    let err = service
        .generate_content(&GenerateRequest::new("python", "파이썬 반복문"))
        .await
        .unwrap_err();
    assert_eq!(err.status, 504);
    assert_eq!(structured(&err.detail).error_code, FailureKind::Timeout);
    assert_eq!(provider.calls(), 3);
}

#[tokio::test]
async fn strict_curriculum_without_topics_fails_quality() {
    let (service, provider) = fixture_service(vec![json!({"title": "파이썬 자동화 로드맵"})]);
    let err = service
        .generate_curriculum(&CurriculumRequest::new("파이썬 자동화", "beginner"))
        .await
        .unwrap_err();
    assert_eq!(err.status, 422);
    let detail = structured(&err.detail);
    assert_eq!(detail.error_code, FailureKind::QualityFailed);
    assert!(detail.retryable);
    assert_eq!(
        detail.detail,
        "curriculum_generate_failed:quality_failed:quality_validation_failed:curriculum_topics_missing"
    );
    assert_eq!(provider.calls(), 2);
}

#[tokio::test]
async fn reasoning_normalizes_partial_output() {
    let request = ReasoningRequest::new("파이썬 반복문", "업무 자동화", "beginner", "python");
    let (service, provider) = fixture_service(vec![json!({
        "why_this_topic": "반복 작업을 줄이는 자동화의 출발점입니다.",
        "learning_objectives": ["for 문으로 리스트 순회", "  "]
    })]);
    let result = service.curriculum_reasoning(&request).await.unwrap();
    let template = reasoning::fallback(&request);

    assert_eq!(result.why_this_topic, "반복 작업을 줄이는 자동화의 출발점입니다.");
    assert_eq!(result.learning_objectives, vec!["for 문으로 리스트 순회"]);
    assert_eq!(result.prerequisite_concepts, template.prerequisite_concepts);
    assert_eq!(result.teaching_strategy, template.teaching_strategy);
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn reasoning_failure_is_classified_without_retry() {
    let request = ReasoningRequest::new("파이썬 반복문", "업무 자동화", "beginner", "python");
    let (service, provider) = fixture_service(vec![json!({"error": "request timed out"})]);
    let err = service.curriculum_reasoning(&request).await.unwrap_err();
    assert_eq!(err.status, 504);
    assert_eq!(
        structured(&err.detail).detail,
        "curriculum_reasoning_failed:timeout:ai_primary_failed:request timed out"
    );
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn sections_fall_back_after_repeated_timeouts() {
    let request = sections_request();
    let (service, provider) = fixture_service(vec![json!({"error": "request timed out"})]);
    let response = service.curriculum_sections(&request).await.unwrap();

    assert!(response.meta.fallback_used);
    assert_eq!(response.meta.failure_kind, Some(FailureKind::Timeout));
    assert_eq!(response.meta.attempt_count, 2);
    assert_eq!(response.body, sections::fallback(&request));
    assert_eq!(provider.calls(), 2);

    let wire = serde_json::to_value(&response).unwrap();
    assert_eq!(wire["meta"]["failure_kind"], "timeout");
    assert_eq!(wire["sections"].as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn sections_config_failure_surfaces_instead_of_fallback() {
    let request = sections_request();
    let (service, provider) = fixture_service(vec![json!({"error": "openai_api_key_missing"})]);
    let err = service.curriculum_sections(&request).await.unwrap_err();
    assert_eq!(err.status, 503);
    assert_eq!(structured(&err.detail).error_code, FailureKind::ConfigError);
    assert_eq!(provider.calls(), 1);
}
