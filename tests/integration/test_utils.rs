//! Shared test utilities for integration tests
//!
//! Provides in-process providers and isolated configuration so tests never
//! reach a real vendor or the developer's own config files.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use studygen::config::{ConfigLoader, EnvSnapshot, StudygenConfig};
use studygen::provider::{FixtureProvider, JsonObject, ProviderError, StructuredProvider};
use studygen::GenerationService;
use tempfile::TempDir;
use tokio::sync::Notify;

/// Service backed by a replaying fixture, with the default configuration
pub fn fixture_service(responses: Vec<Value>) -> (GenerationService, Arc<FixtureProvider>) {
    fixture_service_with(responses, &StudygenConfig::default())
}

pub fn fixture_service_with(
    responses: Vec<Value>,
    config: &StudygenConfig,
) -> (GenerationService, Arc<FixtureProvider>) {
    let provider = Arc::new(FixtureProvider::new(responses).unwrap());
    let service = GenerationService::with_provider(provider.clone(), config);
    (service, provider)
}

/// Loader that sees only `env` plus an `XDG_CONFIG_HOME` inside `dir`
pub fn isolated_loader(dir: &TempDir, env: &[(&str, &str)]) -> ConfigLoader {
    let mut pairs = vec![(
        "XDG_CONFIG_HOME".to_string(),
        dir.path().join("xdg").display().to_string(),
    )];
    pairs.extend(env.iter().map(|(k, v)| (k.to_string(), v.to_string())));
    ConfigLoader::new(dir.path()).with_env(EnvSnapshot::from_pairs(pairs))
}

/// Provider that holds every call until released
pub struct GatedProvider {
    pub release: Arc<Notify>,
    pub started: AtomicUsize,
}

impl GatedProvider {
    pub fn new() -> Self {
        Self {
            release: Arc::new(Notify::new()),
            started: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl StructuredProvider for GatedProvider {
    async fn generate_json(&self, _: &str, _: &str) -> Result<JsonObject, ProviderError> {
        self.started.fetch_add(1, Ordering::SeqCst);
        self.release.notified().await;
        Ok(object(json!({"released": true})))
    }

    fn provider_name(&self) -> &str {
        "gated"
    }

    fn model_name(&self) -> &str {
        "gated"
    }
}

pub fn object(value: Value) -> JsonObject {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}

/// A lesson that clears every quality check for the topic "파이썬 반복문"
pub fn passing_lesson() -> Value {
    let explanation = "range 함수로 만든 숫자 범위를 반복하면서 누적 합계를 계산하는 흐름을 단계별로 보여 주는 예제입니다.";
    json!({
        "title": "파이썬 반복문 기초",
        "content": "파이썬 반복문은 같은 작업을 여러 번 수행할 때 사용합니다. for 문은 리스트나 range 같은 반복 가능한 객체의 원소를 하나씩 꺼내 처리하고, while 문은 조건이 참인 동안 블록을 계속 실행합니다. 반복문을 사용할 때는 종료 조건을 명확히 정하고, 반복 변수의 변화를 추적하며, 불필요한 중첩을 줄이는 것이 중요합니다. 이 레슨에서는 for 문과 while 문의 차이, break와 continue의 사용법, 그리고 누적 합계 계산 같은 대표 패턴을 예제와 함께 살펴보고 마지막에 퀴즈로 이해도를 점검합니다.",
        "code_examples": [{
            "title": "누적 합계",
            "code": "total = 0\nfor n in range(1, 11):\n    total += n\nprint(total)",
            "explanation": explanation,
            "language": "python"
        }],
        "quiz": [
            {
                "question": "파이썬 반복문에서 for 문이 주로 순회하는 대상은 무엇인가요?",
                "options": ["반복 가능한 객체", "정수 리터럴", "주석 블록", "모듈 이름"],
                "correct_answer": 0,
                "explanation": "for 문은 리스트나 range처럼 반복 가능한 객체의 원소를 차례로 꺼냅니다."
            },
            {
                "question": "while 반복문이 멈추지 않는 가장 흔한 원인은 무엇인가요?",
                "options": ["조건이 계속 참으로 남음", "들여쓰기 사용", "print 호출", "변수 이름 길이"],
                "correct_answer": 0,
                "explanation": "조건식에 쓰인 변수를 갱신하지 않으면 조건이 계속 참이라 반복이 끝나지 않습니다."
            }
        ]
    })
}
