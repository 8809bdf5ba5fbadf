//! Learning-section sequences (`curriculum_sections`).
//!
//! A sequence walks concept → example → checks → summary. The call site
//! retries quality failures and substitutes [`fallback`] once attempts run
//! out.

use super::options::{collect_options, extract_enumerated_options, meaningful_options, OPTION_COUNT};
use super::quality::QualityIssues;
use super::reasoning::{Personalization, ReasoningRequest, TopicReasoning};
use super::text::{
    char_len, count_non_empty_lines, extract_topic_keywords, is_placeholder_like, lenient_int,
    mentions_any_keyword, non_empty_str, truncate_text,
};
use super::{is_retry_attempt, teaching_method_label, Prompt};
use crate::provider::JsonObject;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const PIPELINE: &str = "curriculum_sections";

const RAW_SECTION_LIMIT: usize = 20;
const REQUIRED_CHECKS: usize = 2;

pub const CONCEPT: &str = "concept";
pub const EXAMPLE: &str = "example";
pub const CHECK: &str = "check";
pub const SUMMARY: &str = "summary";

/// Topic context plus the reasoning produced for it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionsRequest {
    pub input: ReasoningRequest,
    #[serde(default)]
    pub reasoning: TopicReasoning,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LearningSection {
    #[serde(rename = "type")]
    pub section_type: String,
    pub title: String,
    pub body: String,
    pub code: String,
    pub explanation: String,
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: i64,
    pub next_preview: String,
}

impl LearningSection {
    pub fn is(&self, section_type: &str) -> bool {
        self.section_type.trim() == section_type
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SectionSequence {
    pub title: String,
    pub sections: Vec<LearningSection>,
}

impl SectionSequence {
    fn of_type<'a>(&'a self, section_type: &'a str) -> impl Iterator<Item = &'a LearningSection> {
        self.sections.iter().filter(move |s| s.is(section_type))
    }
}

fn section(
    section_type: &str,
    title: String,
    body: String,
    code: String,
    explanation: String,
) -> LearningSection {
    LearningSection {
        section_type: section_type.to_string(),
        title,
        body,
        code,
        explanation,
        ..LearningSection::default()
    }
}

fn check_section(title: &str, question: String, options: [&str; 4], explanation: &str) -> LearningSection {
    LearningSection {
        question,
        options: options.iter().map(|o| o.to_string()).collect(),
        ..section(CHECK, title.to_string(), String::new(), String::new(), explanation.to_string())
    }
}

const FALLBACK_EXAMPLE_CODE: &str = "def process_items(items):
    cleaned = []
    for raw in items:
        value = raw.strip()
        if not value:
            continue
        cleaned.append(value)
    return cleaned

sample = [' alpha ', '', 'beta', '  gamma']
print(process_items(sample))";

/// Deterministic five-section sequence built from templates and the reasoning.
pub fn fallback(request: &SectionsRequest) -> SectionSequence {
    let topic = &request.input.topic;
    let reasoning = &request.reasoning;
    let strategy = if reasoning.teaching_strategy.trim().is_empty() {
        "핵심 개념 후 즉시 적용".to_string()
    } else {
        reasoning.teaching_strategy.trim().to_string()
    };
    let why = if reasoning.why_this_topic.trim().is_empty() {
        format!("{topic}가 중요한 이유를 설명합니다.")
    } else {
        reasoning.why_this_topic.trim().to_string()
    };
    let connection = if reasoning.connection_to_goal.trim().is_empty() {
        "다음 토픽으로 연결할 준비가 되었습니다.".to_string()
    } else {
        reasoning.connection_to_goal.trim().to_string()
    };

    let sections = vec![
        section(
            CONCEPT,
            format!("{topic} 핵심 개념"),
            format!(
                "{why}\n\n이번 섹션에서는 {topic}의 핵심 정의와 자주 발생하는 실수를 먼저 정리합니다. \
                 그 다음 예제를 통해 입력-처리-출력 흐름을 단계적으로 확인합니다."
            ),
            String::new(),
            strategy,
        ),
        section(
            EXAMPLE,
            format!("{topic} 기본 예제"),
            format!("{topic} 개념을 작은 함수 단위로 구현하고 결과를 확인합니다."),
            FALLBACK_EXAMPLE_CODE.to_string(),
            format!(
                "입력값 정제, 예외 입력 처리, 결과 반환 순서를 분리해서 보면 \
                 {topic}의 핵심 처리 흐름을 더 안정적으로 이해할 수 있습니다."
            ),
        ),
        check_section(
            "개념 확인 문제 1",
            format!("{topic} 학습에서 가장 먼저 확인할 것은?"),
            ["핵심 개념 이해", "결과 암기", "무작정 구현", "관련 없는 설정"],
            "핵심 개념의 정의와 사용 목적을 연결해야 실전에서 구현 순서를 안정적으로 잡을 수 있습니다. \
             정답을 고른 뒤 왜 나머지 선택지가 아닌지도 함께 확인하세요.",
        ),
        check_section(
            "응용 확인 문제 2",
            format!("{topic}를 실전에 적용할 때 우선순위로 맞는 것은?"),
            ["요구사항 분석 후 단계 구현", "정답 암기", "예외 무시", "로그 제거"],
            "실무 문제에서는 요구사항을 먼저 분해하고 검증 포인트를 정한 뒤 구현해야 오류 전파를 줄일 수 있습니다. \
             정답 선택의 근거를 처리 순서 관점에서 설명해 보세요.",
        ),
        LearningSection {
            next_preview: "다음 토픽으로 이어집니다.".to_string(),
            ..section(
                SUMMARY,
                "학습 요약".to_string(),
                connection,
                String::new(),
                "핵심 개념을 다시 한 번 복습하세요.".to_string(),
            )
        },
    ];

    SectionSequence {
        title: format!("{topic} 학습 세션"),
        sections,
    }
}

/// Options of a check section: the raw list first, then options written
/// inline in the question, body or explanation.
fn normalize_check_options(raw: Option<&Value>, question: &str, body: &str, explanation: &str) -> Vec<String> {
    let mut options = collect_options(raw, OPTION_COUNT);
    if options.len() < OPTION_COUNT {
        for candidate in extract_enumerated_options(&[question, body, explanation], OPTION_COUNT) {
            if !options.contains(&candidate) {
                options.push(candidate);
            }
            if options.len() >= OPTION_COUNT {
                break;
            }
        }
    }
    options
}

/// One raw section in canonical form.
///
/// Fields a section type does not use keep the provider text or stay empty,
/// matching [`fallback`], so a normalized sequence normalizes to itself.
fn normalize_section(item: &Value, idx: usize, topic: &str) -> LearningSection {
    let section_type = non_empty_str(item.get("type"), CONCEPT);
    let is_check = section_type == CHECK;
    let title = non_empty_str(item.get("title"), &format!("{topic} 섹션 {}", idx + 1));
    let default_body = if is_check {
        String::new()
    } else {
        format!("{topic} 핵심 내용을 정리합니다.")
    };
    let body = non_empty_str(item.get("body"), &default_body);
    let default_code = if section_type == EXAMPLE {
        "print('hello world')"
    } else {
        ""
    };
    let code = non_empty_str(item.get("code"), default_code);
    let explanation = non_empty_str(item.get("explanation"), "핵심 포인트를 확인하세요.");
    let default_question = if is_check {
        format!("{topic} 이해 확인 문제")
    } else {
        String::new()
    };
    let question = non_empty_str(item.get("question"), &default_question);

    let options = if is_check {
        normalize_check_options(item.get("options"), &question, &body, &explanation)
    } else {
        Vec::new()
    };

    let mut correct_answer = lenient_int(item.get("correct_answer")).unwrap_or(0).clamp(0, 3);
    if correct_answer as usize >= options.len() {
        correct_answer = 0;
    }

    let next_preview = if section_type == SUMMARY {
        non_empty_str(item.get("next_preview"), "다음 토픽으로 이어집니다.")
    } else {
        String::new()
    };

    LearningSection {
        section_type,
        title,
        body,
        code,
        explanation,
        question,
        options,
        correct_answer,
        next_preview,
    }
}

/// Coerce raw provider output into a [`SectionSequence`].
///
/// No usable section list yields the fallback; fewer than two checks are
/// topped up with the fallback's checks.
pub fn normalize(raw: &JsonObject, request: &SectionsRequest) -> SectionSequence {
    let template = fallback(request);
    let raw_sections = match raw.get("sections").and_then(Value::as_array) {
        Some(items) if !items.is_empty() => items,
        _ => return template,
    };

    let topic = &request.input.topic;
    let mut sections: Vec<LearningSection> = raw_sections
        .iter()
        .take(RAW_SECTION_LIMIT)
        .enumerate()
        .map(|(idx, item)| normalize_section(item, idx, topic))
        .collect();

    let check_count = sections.iter().filter(|s| s.is(CHECK)).count();
    if check_count < REQUIRED_CHECKS {
        sections.extend(
            template
                .sections
                .iter()
                .filter(|s| s.is(CHECK))
                .take(REQUIRED_CHECKS - check_count)
                .cloned(),
        );
    }

    SectionSequence {
        title: non_empty_str(raw.get("title"), &template.title),
        sections,
    }
}

/// Named quality issues of a section sequence; empty means accept.
pub fn quality_issues(result: &SectionSequence, request: &SectionsRequest) -> QualityIssues {
    let mut issues = QualityIssues::new();
    if result.sections.is_empty() {
        issues.push("sections_missing");
        return issues;
    }

    let concept = result.of_type(CONCEPT).next();
    let example = result.of_type(EXAMPLE).next();
    let has_summary = result.of_type(SUMMARY).next().is_some();
    let checks: Vec<&LearningSection> = result.of_type(CHECK).collect();

    issues.check(concept.is_none(), "concept_missing");
    issues.check(example.is_none(), "example_missing");
    issues.check(!has_summary, "summary_missing");
    issues.check(checks.len() < REQUIRED_CHECKS, "check_count_lt_2");

    if let Some(concept) = concept {
        let body = concept.body.trim();
        issues.check(char_len(body) < 160, "concept_body_too_short");
        issues.check(is_placeholder_like(body), "concept_body_placeholder");
    }

    if let Some(example) = example {
        let code = example.code.trim();
        issues.check(count_non_empty_lines(code) < 6, "example_code_too_short");
        issues.check(code.to_lowercase().contains("hello world"), "example_code_generic");
        issues.check(
            char_len(example.explanation.trim()) < 70,
            "example_explanation_too_short",
        );
    }

    for (idx, check) in checks.iter().take(REQUIRED_CHECKS).enumerate() {
        let n = idx + 1;
        issues.check(
            char_len(check.question.trim()) < 24,
            format!("check{n}_question_too_short"),
        );
        issues.check(
            char_len(check.explanation.trim()) < 50,
            format!("check{n}_explanation_too_short"),
        );
        issues.check(
            meaningful_options(&check.options).len() < OPTION_COUNT,
            format!("check{n}_options_invalid"),
        );
    }

    let keywords = extract_topic_keywords(&request.input.topic);
    let combined = result
        .sections
        .iter()
        .map(|s| format!("{} {} {} {}", s.title, s.body, s.question, s.explanation))
        .collect::<Vec<_>>()
        .join(" ");
    issues.check(!mentions_any_keyword(&keywords, &combined), "topic_keyword_missing");

    issues
}

const SECTIONS_SYSTEM_PROMPT: &str = "당신은 프로그래밍 학습 콘텐츠 작성자입니다.
반드시 JSON 객체 하나만 반환하세요. 코드블록은 금지합니다.
스키마:
{
  \"title\":\"string\",
  \"sections\":[
    {
      \"type\":\"concept|example|check|summary\",
      \"title\":\"string\",
      \"body\":\"string\",
      \"code\":\"string\",
      \"explanation\":\"string\",
      \"question\":\"string\",
      \"options\":[\"string\",\"string\",\"string\",\"string\"],
      \"correct_answer\":0,
      \"next_preview\":\"string\"
    }
  ]
}
규칙:
- sections에 concept 1개, example 1개, check 2개 이상, summary 1개 이상 포함
- concept.body는 160자 이상
- example.code는 6줄 이상, hello world 같은 일반 예제 금지
- check 섹션은 4지선다이며 explanation 50자 이상
- next_preview는 summary 섹션에만 쓰고 나머지는 빈 문자열
- 토픽과 개인화 신호에 직접 연결된 설명 작성";

pub fn prompt(request: &SectionsRequest, attempt: u32) -> Prompt {
    let input = &request.input;
    let retry = is_retry_attempt(attempt);
    let mut system = SECTIONS_SYSTEM_PROMPT.to_string();
    if retry {
        system.push_str("\n- 이전 시도가 실패했으니 불필요한 수식 없이 핵심만 간결하게 작성");
    }

    let description_limit = if retry { 160 } else { 240 };
    let reasoning =
        serde_json::to_string(&request.reasoning.compact()).unwrap_or_else(|_| "{}".to_string());
    let user = format!(
        "목표: {}\n토픽: {}\n토픽 설명: {}\n수준: {}, 언어: {}\n설명 방식: {}\n\
         학습 스타일(활동 리듬): {}\n\
         해석 규칙: 설명 방식은 해설 톤과 질문 방식, 학습 스타일은 섹션 전개 리듬을 뜻합니다.\n\
         추론 결과(요약): {reasoning}\n개인화 신호(요약): {}\n\
         개념, 예제, 확인, 요약 순서로 섹션을 구성하세요.\n\
         개인화 신호의 difficult_concepts 또는 concept_focus를 섹션마다 하나 이상 반영하세요.",
        input.curriculum_goal,
        input.topic,
        truncate_text(&input.topic_description, description_limit),
        input.learner_level,
        input.language,
        teaching_method_label(&input.teaching_method),
        input.learning_style,
        Personalization::from_request(input).to_prompt_json(),
    );
    Prompt::new(system, user)
}
