//! CLI routing against fixture providers

use clap::Parser;
use serde_json::{json, Value};
use std::fs;
use studygen::cli::{map_error, Cli, RunContext, USAGE_ERROR};
use studygen::config::StudygenConfig;
use studygen::error_contract::TraceId;
use studygen::failure::FailureKind;
use tempfile::TempDir;

fn context_with_fixture(dir: &TempDir, fixture: Value) -> RunContext {
    let path = dir.path().join("fixture.json");
    fs::write(&path, fixture.to_string()).unwrap();
    RunContext::from_config(
        StudygenConfig::default(),
        Some(path.as_path()),
        TraceId::from_header(Some("cli-test")),
    )
    .unwrap()
}

fn write_input(dir: &TempDir, value: Value) -> String {
    let path = dir.path().join("input.json");
    fs::write(&path, value.to_string()).unwrap();
    path.display().to_string()
}

#[tokio::test]
async fn assessment_questions_report_fallback_meta() {
    let dir = TempDir::new().unwrap();
    let context = context_with_fixture(&dir, json!({"error": "invalid json: expecting value"}));
    let input = write_input(&dir, json!({"goal": "데이터 분석"}));

    let cli = Cli::try_parse_from(["studygen", "assessment", "questions", "--input", &input]).unwrap();
    let output = context.execute(&cli.command).await.unwrap();
    let value: Value = serde_json::from_str(&output).unwrap();

    assert_eq!(value["meta"]["fallback_used"], true);
    assert_eq!(value["meta"]["failure_kind"], "schema_mismatch");
    assert_eq!(value["meta"]["attempt_count"], 2);
    assert_eq!(value["questions"].as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn curriculum_refine_failure_maps_to_exit_code() {
    let dir = TempDir::new().unwrap();
    let context = context_with_fixture(&dir, json!({"title": "수정본"}));
    let input = write_input(
        &dir,
        json!({
            "currentCurriculum": {"title": "웹 개발", "topics": [], "total_estimated_hours": 0.0, "summary": ""},
            "chatHistory": [],
            "userMessage": "프로젝트 위주로 바꿔 주세요"
        }),
    );

    let cli = Cli::try_parse_from(["studygen", "curriculum", "refine", "-i", &input]).unwrap();
    let err = context.execute(&cli.command).await.unwrap_err();
    let (payload, code) = map_error(&err, context.trace_id());

    assert_eq!(payload.error_code, FailureKind::ProviderError);
    assert_eq!(payload.trace_id, "cli-test");
    assert_eq!(payload.detail, "curriculum_refine_failed:provider_error:curriculum_topics_missing");
    assert_eq!(code, 5);
}

#[tokio::test]
async fn malformed_input_is_a_usage_error() {
    let dir = TempDir::new().unwrap();
    let context = context_with_fixture(&dir, json!({}));
    let input = dir.path().join("broken.json");
    fs::write(&input, "{not json").unwrap();
    let input = input.display().to_string();

    let cli = Cli::try_parse_from(["studygen", "generate", "--input", &input]).unwrap();
    let err = context.execute(&cli.command).await.unwrap_err();
    let (payload, code) = map_error(&err, context.trace_id());
    assert_eq!(payload.error_code, FailureKind::SchemaMismatch);
    assert!(!payload.retryable);
    assert!(payload.detail.starts_with("invalid_request:"));
    assert_eq!(code, USAGE_ERROR);
}

#[tokio::test]
async fn chat_blank_reply_maps_to_empty_output() {
    let dir = TempDir::new().unwrap();
    let context = context_with_fixture(&dir, json!({"assistant": ""}));
    let input = write_input(
        &dir,
        json!({
            "messages": [{"role": "user", "parts": [{"type": "text", "text": "오늘 할 일 알려 주세요"}]}],
            "chatType": "manager"
        }),
    );

    let cli = Cli::try_parse_from(["studygen", "chat", "--input", &input]).unwrap();
    let err = context.execute(&cli.command).await.unwrap_err();
    let (payload, code) = map_error(&err, context.trace_id());
    assert_eq!(payload.error_code, FailureKind::EmptyOutput);
    assert!(!payload.retryable);
    assert_eq!(payload.detail, "chat_empty_assistant");
    assert_eq!(code, 5);
}

#[tokio::test]
async fn chat_rate_limit_maps_to_client_exit_code() {
    let dir = TempDir::new().unwrap();
    let context = context_with_fixture(&dir, json!({"error": "429 too many requests"}));
    let input = write_input(&dir, json!({"messages": [{"role": "user", "content": "안녕"}], "chatType": "tutor"}));

    let cli = Cli::try_parse_from(["studygen", "chat", "-i", &input]).unwrap();
    let err = context.execute(&cli.command).await.unwrap_err();
    let (payload, code) = map_error(&err, context.trace_id());
    assert_eq!(payload.error_code, FailureKind::RateLimited);
    assert!(payload.retryable);
    assert!(payload.detail.starts_with("chat_generate_failed:rate_limited:"));
    assert_eq!(code, 4);
}

#[tokio::test]
async fn chat_reply_is_printed() {
    let dir = TempDir::new().unwrap();
    let context = context_with_fixture(&dir, json!({"assistant": "반복문 예제를 하나 풀어 봐요."}));
    let input = write_input(
        &dir,
        json!({"messages": [{"role": "user", "content": "뭐부터 할까요?"}], "chatType": "tutor", "contextId": "c-1"}),
    );

    let cli = Cli::try_parse_from(["studygen", "chat", "-i", &input]).unwrap();
    let output = context.execute(&cli.command).await.unwrap();
    let value: Value = serde_json::from_str(&output).unwrap();
    assert_eq!(
        value,
        json!({"chatType": "tutor", "contextId": "c-1", "assistant": "반복문 예제를 하나 풀어 봐요.", "streaming": false})
    );
}
