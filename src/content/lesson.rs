//! Lesson and quiz-set generation (`content_generate`).
//!
//! Two modes share one shape: a lesson (prose, code examples, a short quiz)
//! or a quiz-only set with an exact question count and no code.

use super::options::{collect_options, meaningful_options, OPTION_COUNT};
use super::quality::QualityIssues;
use super::text::{
    char_len, count_non_empty_lines, extract_topic_keywords, is_placeholder_like,
    looks_non_korean, mentions_any_keyword, non_empty_str,
};
use super::{is_retry_attempt, teaching_method_label, Prompt};
use crate::provider::JsonObject;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const PIPELINE: &str = "content_generate";

const MIN_QUIZ_COUNT: i64 = 3;
const MAX_QUIZ_COUNT: i64 = 20;
const LESSON_QUIZ_LIMIT: usize = 5;
const LESSON_QUIZ_REQUIRED: usize = 2;
const LESSON_QUIZ_CHECKED: usize = 3;
const CODE_EXAMPLE_LIMIT: usize = 3;
const QUIZ_OPTION_FILLERS: [&str; 4] = ["개념 이해", "무작정 구현", "정답 암기", "설정 생략"];

/// Request for a lesson or a quiz-only set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub language: String,
    pub topic: String,
    #[serde(default = "default_difficulty")]
    pub difficulty: String,
    #[serde(default = "default_audience")]
    pub target_audience: String,
    #[serde(default = "default_teaching_method")]
    pub teaching_method: String,
    #[serde(default = "default_content_mode")]
    pub content_mode: String,
    #[serde(default = "default_question_count")]
    pub question_count: i64,
}

fn default_difficulty() -> String {
    "beginner".to_string()
}

fn default_audience() -> String {
    "learner".to_string()
}

fn default_teaching_method() -> String {
    "direct_instruction".to_string()
}

fn default_content_mode() -> String {
    "lesson".to_string()
}

fn default_question_count() -> i64 {
    8
}

impl GenerateRequest {
    pub fn new(language: impl Into<String>, topic: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            topic: topic.into(),
            difficulty: default_difficulty(),
            target_audience: default_audience(),
            teaching_method: default_teaching_method(),
            content_mode: default_content_mode(),
            question_count: default_question_count(),
        }
    }

    pub fn quiz_only(mut self, question_count: i64) -> Self {
        self.content_mode = "quiz_only".to_string();
        self.question_count = question_count;
        self
    }

    pub fn is_quiz_only(&self) -> bool {
        self.content_mode.trim().eq_ignore_ascii_case("quiz_only")
    }

    /// Requested quiz size clamped to 3..=20.
    pub fn target_quiz_count(&self) -> usize {
        self.question_count.clamp(MIN_QUIZ_COUNT, MAX_QUIZ_COUNT) as usize
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodeExample {
    pub title: String,
    pub code: String,
    pub explanation: String,
    pub language: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuizItem {
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: i64,
    pub explanation: String,
}

/// Canonical lesson content
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratedContent {
    pub title: String,
    pub content: String,
    pub code_examples: Vec<CodeExample>,
    pub quiz: Vec<QuizItem>,
}

impl GeneratedContent {
    /// Read raw provider output without substituting any defaults.
    pub fn from_raw(raw: &JsonObject) -> Result<Self, serde_json::Error> {
        serde_json::from_value(Value::Object(raw.clone()))
    }
}

/// Template quiz; questions past the fourth get a numbered suffix.
pub fn template_quiz(topic: &str, count: usize) -> Vec<QuizItem> {
    let templates: [(String, [&str; 4], &str); 4] = [
        (
            format!("{topic}를 학습할 때 가장 먼저 점검할 것은 무엇인가요?"),
            ["핵심 개념 정의", "결과만 외우기", "도구 설정 생략", "정답 패턴 암기"],
            "핵심 개념을 먼저 이해해야 이후 응용 문제에서 오개념을 줄일 수 있습니다.",
        ),
        (
            format!("{topic} 관련 문제를 풀 때 오답 분석에서 가장 효과적인 방법은?"),
            ["선택지별 오개념 구분", "정답 번호만 기록", "틀린 문제 건너뛰기", "해설 생략"],
            "선택지별 오개념을 구분하면 같은 유형의 실수를 반복하지 않게 됩니다.",
        ),
        (
            format!("{topic}의 개념 이해를 확인하는 문항 구성으로 가장 적절한 것은?"),
            [
                "원리 + 간단한 적용 상황",
                "정의 암기만 확인",
                "정답만 고르게 구성",
                "모든 선택지를 동일하게 작성",
            ],
            "개념 문항은 원리와 적용 상황을 함께 확인해야 실전 이해도를 파악할 수 있습니다.",
        ),
        (
            format!("{topic} 문제를 복습할 때 우선순위로 맞는 것은?"),
            ["오답 원인 유형별 재분류", "맞은 문제만 재풀이", "점수만 확인 후 종료", "어려운 문제만 제외"],
            "오답 원인을 유형별로 분류하면 취약 개념을 중심으로 복습 계획을 세우기 쉽습니다.",
        ),
    ];

    (0..count.max(1))
        .map(|idx| {
            let (question, options, explanation) = &templates[idx % templates.len()];
            let suffix = if idx >= templates.len() {
                format!(" (문항 {})", idx + 1)
            } else {
                String::new()
            };
            QuizItem {
                question: format!("{question}{suffix}"),
                options: options.iter().map(|o| o.to_string()).collect(),
                correct_answer: 0,
                explanation: explanation.to_string(),
            }
        })
        .collect()
}

/// Template content used for per-field defaults.
pub fn template_content(request: &GenerateRequest) -> GeneratedContent {
    let topic = &request.topic;
    let label = teaching_method_label(&request.teaching_method);

    if request.is_quiz_only() {
        let count = request.target_quiz_count();
        return GeneratedContent {
            title: format!("{topic} 문제 훈련 세트"),
            content: format!(
                "{topic} 핵심 개념 점검 문제 {count}문항입니다.\n난이도: {}, 대상: {}, 해설 스타일: {label}",
                request.difficulty, request.target_audience
            ),
            code_examples: Vec::new(),
            quiz: template_quiz(topic, count),
        };
    }

    GeneratedContent {
        title: format!("{topic} ({})", request.language),
        content: format!(
            "이 응답은 기본 폴백 콘텐츠입니다.\n난이도: {}, 대상: {}, 설명 방식: {label}",
            request.difficulty, request.target_audience
        ),
        code_examples: vec![CodeExample {
            title: format!("{topic} 기본 예제"),
            code: "print('hello world')".to_string(),
            explanation: "기본 실행 흐름을 확인하는 예제입니다.".to_string(),
            language: request.language.clone(),
        }],
        quiz: template_quiz(topic, LESSON_QUIZ_REQUIRED),
    }
}

fn normalize_code_example(item: &Value, language: &str, index: usize) -> CodeExample {
    CodeExample {
        title: non_empty_str(item.get("title"), &format!("예제 {index}")),
        code: non_empty_str(item.get("code"), "print('hello world')"),
        explanation: non_empty_str(item.get("explanation"), "핵심 흐름을 확인하는 예제입니다."),
        language: non_empty_str(item.get("language"), language),
    }
}

fn normalize_quiz_item(item: &Value, topic: &str) -> QuizItem {
    let mut options = collect_options(item.get("options"), OPTION_COUNT);
    for filler in QUIZ_OPTION_FILLERS {
        if options.len() >= OPTION_COUNT {
            break;
        }
        if !options.iter().any(|o| o == filler) {
            options.push(filler.to_string());
        }
    }

    let correct_answer = item
        .get("correct_answer")
        .and_then(Value::as_i64)
        .filter(|idx| (0..OPTION_COUNT as i64).contains(idx))
        .unwrap_or(0);

    QuizItem {
        question: non_empty_str(
            item.get("question"),
            &format!("{topic} 학습에서 먼저 확인할 것은 무엇인가요?"),
        ),
        options,
        correct_answer,
        explanation: non_empty_str(
            item.get("explanation"),
            "기초 개념을 먼저 확인하면 학습 효율이 높아집니다.",
        ),
    }
}

/// Coerce raw provider output into [`GeneratedContent`].
pub fn normalize(raw: &JsonObject, request: &GenerateRequest) -> GeneratedContent {
    let template = template_content(request);
    let quiz_only = request.is_quiz_only();
    let target = if quiz_only {
        request.target_quiz_count()
    } else {
        LESSON_QUIZ_LIMIT
    };

    let code_examples = if quiz_only {
        Vec::new()
    } else {
        let examples: Vec<CodeExample> = raw
            .get("code_examples")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .take(CODE_EXAMPLE_LIMIT)
                    .enumerate()
                    .map(|(idx, item)| normalize_code_example(item, &request.language, idx + 1))
                    .collect()
            })
            .unwrap_or_default();
        if examples.is_empty() {
            template.code_examples.clone()
        } else {
            examples
        }
    };

    let mut quiz: Vec<QuizItem> = raw
        .get("quiz")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .take(target)
                .map(|item| normalize_quiz_item(item, &request.topic))
                .collect()
        })
        .unwrap_or_default();

    if quiz.is_empty() {
        quiz = template.quiz.iter().take(target).cloned().collect();
    } else if quiz_only && quiz.len() < target {
        let start = quiz.len();
        quiz.extend(template.quiz[start..target].iter().cloned());
    } else if !quiz_only && quiz.len() < LESSON_QUIZ_REQUIRED {
        let missing = LESSON_QUIZ_REQUIRED - quiz.len();
        quiz.extend(template.quiz.iter().take(missing).cloned());
    }

    GeneratedContent {
        title: non_empty_str(raw.get("title"), &template.title),
        content: non_empty_str(raw.get("content"), &template.content),
        code_examples,
        quiz,
    }
}

/// Named quality issues of lesson content; empty means accept.
pub fn quality_issues(result: &GeneratedContent, request: &GenerateRequest) -> QualityIssues {
    let mut issues = QualityIssues::new();
    let quiz_only = request.is_quiz_only();
    let target = request.target_quiz_count();
    let title = result.title.trim();
    let content = result.content.trim();

    issues.check(char_len(title) < 4, "title_too_short");
    issues.check(looks_non_korean(title), "title_non_korean");
    issues.check(
        char_len(content) < if quiz_only { 24 } else { 220 },
        "content_too_short",
    );
    issues.check(is_placeholder_like(content), "content_placeholder");

    if quiz_only {
        issues.check(!result.code_examples.is_empty(), "code_examples_not_allowed");
    } else if result.code_examples.is_empty() {
        issues.push("code_examples_missing");
    } else {
        let mut has_valid_code = false;
        for (idx, example) in result.code_examples.iter().take(CODE_EXAMPLE_LIMIT).enumerate() {
            let code = example.code.trim();
            if count_non_empty_lines(code) >= 4 && !code.to_lowercase().contains("hello world") {
                has_valid_code = true;
            }
            issues.check(
                char_len(example.explanation.trim()) < 40,
                format!("code_example{}_explanation_too_short", idx + 1),
            );
        }
        issues.check(!has_valid_code, "code_example_quality_low");
    }

    let required = if quiz_only { target } else { LESSON_QUIZ_REQUIRED };
    if result.quiz.len() < required {
        issues.push("quiz_count_insufficient");
    } else {
        let checked = result
            .quiz
            .len()
            .min(if quiz_only { target } else { LESSON_QUIZ_CHECKED });
        let (min_question, min_explanation) = if quiz_only { (16, 24) } else { (18, 30) };
        for (idx, item) in result.quiz.iter().take(checked).enumerate() {
            let n = idx + 1;
            issues.check(
                char_len(item.question.trim()) < min_question,
                format!("quiz{n}_question_too_short"),
            );
            issues.check(
                char_len(item.explanation.trim()) < min_explanation,
                format!("quiz{n}_explanation_too_short"),
            );
            issues.check(
                meaningful_options(&item.options).len() != OPTION_COUNT,
                format!("quiz{n}_options_invalid"),
            );
        }
    }

    let keywords = extract_topic_keywords(&request.topic);
    let mut combined = format!("{title} {content}");
    for item in &result.quiz {
        combined.push(' ');
        combined.push_str(&item.question);
        combined.push(' ');
        combined.push_str(&item.explanation);
    }
    issues.check(!mentions_any_keyword(&keywords, &combined), "topic_keyword_missing");

    issues
}

/// Prompts for one attempt; retries add a stricter rule.
pub fn prompt(request: &GenerateRequest, attempt: u32) -> Prompt {
    let label = teaching_method_label(&request.teaching_method);
    let retry = is_retry_attempt(attempt);

    if request.is_quiz_only() {
        let mut system = String::from(
            "당신은 프로그래밍 문제 출제 전문가입니다.\n\
             코드블록 없이 JSON 객체 하나만 반환하세요.\n\n\
             스키마:\n\
             {\"title\": \"string\", \"content\": \"string\", \"code_examples\": [], \
             \"quiz\": [{\"question\": \"string\", \"options\": [\"string\", \"string\", \"string\", \"string\"], \
             \"correct_answer\": 0, \"explanation\": \"string\"}]}\n\n\
             규칙:\n\
             - code_examples는 항상 빈 배열\n\
             - quiz 문항 수는 요청한 수와 정확히 일치\n\
             - 문항마다 의미 있는 보기 4개, 번호만 있는 보기 금지\n\
             - correct_answer는 0~3 정수\n\
             - explanation은 오답이 왜 틀렸는지까지 1~2문장으로 설명",
        );
        if retry {
            system.push_str("\n- 직전 응답이 품질 기준에 못 미쳤으니 모든 보기를 더 구체적으로 작성");
        }
        let user = format!(
            "아래 조건으로 문제 세트를 만드세요.\n\
             - 주제: {}\n- 언어: {}\n- 난이도: {}\n- 대상: {}\n- 해설 스타일: {label}\n- 문항 수: {}\n\
             - 개념 확인 문항과 응용 판단 문항을 각각 1개 이상 포함",
            request.topic,
            request.language,
            request.difficulty,
            request.target_audience,
            request.target_quiz_count()
        );
        return Prompt::new(system, user);
    }

    let mut system = String::from(
        "당신은 개인화 학습 콘텐츠 생성기입니다.\n\
         코드블록 없이 JSON 객체 하나만 반환하세요.\n\n\
         스키마:\n\
         {\"title\": \"string\", \"content\": \"string\", \
         \"code_examples\": [{\"title\": \"string\", \"code\": \"string\", \"explanation\": \"string\", \"language\": \"string\"}], \
         \"quiz\": [{\"question\": \"string\", \"options\": [\"string\"], \"correct_answer\": 0, \"explanation\": \"string\"}]}\n\n\
         규칙:\n\
         - code_examples 1~3개, quiz 2~5개\n\
         - correct_answer는 options 범위 안의 정수\n\
         - 학습자 수준에 맞춘 실습 중심 설명",
    );
    if retry {
        system.push_str("\n- 직전 응답이 품질 기준에 못 미쳤으니 추상적 설명 대신 실행 가능한 예제와 근거 있는 문항으로 작성");
    }
    let user = format!(
        "아래 조건으로 콘텐츠를 만드세요.\n\
         - 주제: {}\n- 언어: {}\n- 난이도: {}\n- 대상: {}\n- 설명 방식: {label}",
        request.topic, request.language, request.difficulty, request.target_audience
    );
    Prompt::new(system, user)
}
