//! Curriculum generation (`curriculum_generate`) and refinement (`curriculum_refine`).
//!
//! Generation normalizes strictly and leaves gaps for the quality gate to
//! report. Refinement is a single call that normalizes leniently: it pads the
//! topic list to the target size and swaps non-Korean text for templates.

use super::quality::QualityIssues;
use super::text::{
    char_len, extract_topic_keywords, lenient_int, looks_non_korean, mentions_any_keyword,
    non_empty_str,
};
use super::{is_retry_attempt, join_or_none, Prompt};
use crate::provider::JsonObject;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

pub const PIPELINE: &str = "curriculum_generate";
pub const REFINE_PIPELINE: &str = "curriculum_refine";

const RAW_TOPIC_LIMIT: usize = 30;
const CHECKED_TOPIC_LIMIT: usize = 24;
const MAX_TOPIC_TARGET: usize = 24;
const MIN_TOPIC_FLOOR: usize = 10;
const DEFAULT_MINUTES: i64 = 50;
const MIN_MINUTES: i64 = 35;
const MAX_MINUTES: i64 = 90;
const REFINE_HISTORY_LIMIT: usize = 6;

const PRACTICE_KEYWORDS: &[&str] = &[
    "실습",
    "프로젝트",
    "구현",
    "과제",
    "포트폴리오",
    "미니 프로젝트",
    "mini project",
    "응용",
];

static GENERIC_NUMBERED_TITLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d+\s*\.?\s*(?:핵심 토픽|보강 토픽|실전 과제)\s*\d*$").expect("static regex")
});

/// Request for a new curriculum
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurriculumRequest {
    pub goal: String,
    pub level: String,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub weaknesses: Vec<String>,
    #[serde(default)]
    pub background: Option<String>,
    #[serde(default)]
    pub interests: Vec<String>,
    #[serde(default = "default_teaching_method")]
    pub teaching_method: String,
    #[serde(default = "default_goal_type")]
    pub goal_type: String,
    #[serde(default = "default_weekly_hours")]
    pub weekly_study_hours: i64,
    #[serde(default = "default_learning_style")]
    pub learning_style: String,
}

fn default_teaching_method() -> String {
    "direct_instruction".to_string()
}

fn default_goal_type() -> String {
    "hobby".to_string()
}

fn default_weekly_hours() -> i64 {
    5
}

fn default_learning_style() -> String {
    "concept_first".to_string()
}

impl CurriculumRequest {
    pub fn new(goal: impl Into<String>, level: impl Into<String>) -> Self {
        Self {
            goal: goal.into(),
            level: level.into(),
            strengths: Vec::new(),
            weaknesses: Vec::new(),
            background: None,
            interests: Vec::new(),
            teaching_method: default_teaching_method(),
            goal_type: default_goal_type(),
            weekly_study_hours: default_weekly_hours(),
            learning_style: default_learning_style(),
        }
    }

    /// `(target, minimum)` topic counts for this learner.
    ///
    /// Level sets the base (12/14/16), every two weekly hours above four add
    /// one, career/exam/project goals add 2/3/1. Target caps at 24 and the
    /// minimum is three below it but never under 10.
    pub fn topic_count_policy(&self) -> (usize, usize) {
        let base: i64 = match normalize_level(&self.level) {
            "advanced" => 16,
            "intermediate" => 14,
            _ => 12,
        };

        let weekly = if self.weekly_study_hours == 0 {
            default_weekly_hours()
        } else {
            self.weekly_study_hours
        }
        .clamp(1, 30);
        let hour_bonus = (weekly - 4).max(0) / 2;

        let goal_bonus = match self.goal_type.trim().to_lowercase().as_str() {
            "career" | "job" | "취업" | "이직" => 2,
            "certification" | "exam" | "자격증" | "시험" => 3,
            "project" | "portfolio" | "프로젝트" => 1,
            _ => 0,
        };

        let target = ((base + hour_bonus + goal_bonus) as usize).min(MAX_TOPIC_TARGET);
        let minimum = target.saturating_sub(3).max(MIN_TOPIC_FLOOR);
        (target, minimum)
    }
}

/// Canonical level: beginner, intermediate or advanced.
pub fn normalize_level(level: &str) -> &'static str {
    match level.trim().to_lowercase().as_str() {
        "advanced" | "고급" => "advanced",
        "intermediate" | "중급" => "intermediate",
        _ => "beginner",
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CurriculumTopic {
    pub title: String,
    pub description: String,
    pub estimated_minutes: i64,
}

/// Canonical curriculum
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Curriculum {
    pub title: String,
    pub topics: Vec<CurriculumTopic>,
    pub total_estimated_hours: f64,
    pub summary: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormalizeMode {
    /// Keep provider text as-is and never pad
    Strict,
    /// Replace non-Korean text and pad to the target topic count
    Lenient,
}

/// Sum of topic minutes in hours, one decimal, at least 1.0.
pub fn total_hours(topics: &[CurriculumTopic]) -> f64 {
    let minutes: i64 = topics.iter().map(|t| t.estimated_minutes).sum();
    let hours = (minutes as f64 / 60.0 * 10.0).round() / 10.0;
    hours.max(1.0)
}

fn practice_slots(count: usize) -> [usize; 3] {
    [
        (count / 3).max(2),
        (count * 2 / 3).max(3),
        count.saturating_sub(1),
    ]
}

/// Whether raw output carries a non-empty topic list at all.
pub fn has_raw_topics(raw: &JsonObject) -> bool {
    raw.get("topics")
        .and_then(Value::as_array)
        .is_some_and(|topics| !topics.is_empty())
}

/// Coerce raw provider output into a [`Curriculum`].
///
/// A missing topic list yields no topics in strict mode; the quality gate
/// reports it as `curriculum_topics_missing`.
pub fn normalize(raw: &JsonObject, request: &CurriculumRequest, mode: NormalizeMode) -> Curriculum {
    let lenient = mode == NormalizeMode::Lenient;
    let mut topics: Vec<CurriculumTopic> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    let raw_topics = raw.get("topics").and_then(Value::as_array);
    for (idx, item) in raw_topics.into_iter().flatten().take(RAW_TOPIC_LIMIT).enumerate() {
        let n = idx + 1;
        let default_title = if lenient {
            format!("핵심 토픽 {n}")
        } else {
            format!("토픽 {n}")
        };
        let mut title = non_empty_str(item.get("title"), &default_title);
        if lenient && looks_non_korean(&title) {
            title = format!("핵심 토픽 {n}");
        }

        let key: String = title.to_lowercase().split_whitespace().collect();
        if !seen.insert(key) {
            continue;
        }

        let default_description = if lenient {
            format!("{title}의 핵심 개념을 학습하고 실습으로 이해를 검증합니다.")
        } else {
            format!("{title} 학습 내용을 구체적으로 설명합니다.")
        };
        let mut description = non_empty_str(item.get("description"), &default_description);
        if lenient && looks_non_korean(&description) {
            description = format!(
                "{title}의 핵심을 학습하고 {} 목표에 맞는 실습으로 이해를 확인합니다.",
                request.goal
            );
        }

        let estimated_minutes = lenient_int(item.get("estimated_minutes"))
            .unwrap_or(DEFAULT_MINUTES)
            .clamp(MIN_MINUTES, MAX_MINUTES);

        topics.push(CurriculumTopic {
            title,
            description,
            estimated_minutes,
        });
    }

    if lenient {
        pad_topics(&mut topics, request);
    }

    let mut title = non_empty_str(raw.get("title"), &format!("{} 맞춤 커리큘럼", request.goal));
    if lenient && looks_non_korean(&title) {
        title = "맞춤 학습 커리큘럼".to_string();
    }

    let mut summary = non_empty_str(
        raw.get("summary"),
        "학습 목표 달성을 위한 단계별 학습 경로입니다.",
    );
    if lenient && looks_non_korean(&summary) {
        summary = "학습 목표 달성을 위해 기초부터 실전까지 단계적으로 학습하도록 구성했습니다."
            .to_string();
    }

    Curriculum {
        title,
        total_estimated_hours: total_hours(&topics),
        topics,
        summary,
    }
}

fn pad_topics(topics: &mut Vec<CurriculumTopic>, request: &CurriculumRequest) {
    let (target, minimum) = request.topic_count_policy();
    let goal = &request.goal;

    let slots = practice_slots(minimum);
    for idx in topics.len()..minimum {
        let practice = slots.contains(&idx);
        topics.push(CurriculumTopic {
            title: format!("{}. {}", idx + 1, if practice { "실전 과제" } else { "핵심 토픽" }),
            description: format!(
                "{goal} 목표에 필요한 내용을 학습하고 {}",
                if practice {
                    "작은 결과물을 만들어 검증합니다."
                } else {
                    "예제 실습으로 이해를 점검합니다."
                }
            ),
            estimated_minutes: if practice { 70 } else { 50 },
        });
    }

    for idx in topics.len()..target {
        topics.push(CurriculumTopic {
            title: format!("{}. 보강 토픽", idx + 1),
            description: format!("{goal} 목표 달성을 위해 필요한 보강 학습을 진행합니다."),
            estimated_minutes: 45,
        });
    }
}

pub fn is_generic_topic_title(title: &str) -> bool {
    let normalized = title
        .trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    normalized.is_empty()
        || GENERIC_NUMBERED_TITLE.is_match(&normalized)
        || matches!(normalized.as_str(), "핵심 토픽" | "보강 토픽" | "실전 과제" | "topic")
}

pub fn is_practice_topic(topic: &CurriculumTopic) -> bool {
    let text = format!("{} {}", topic.title, topic.description).to_lowercase();
    PRACTICE_KEYWORDS.iter().any(|keyword| text.contains(keyword))
}

/// Named quality issues of a curriculum; empty means accept.
pub fn quality_issues(result: &Curriculum, request: &CurriculumRequest) -> QualityIssues {
    let mut issues = QualityIssues::new();
    if result.topics.is_empty() {
        issues.push("curriculum_topics_missing");
        return issues;
    }

    let (_, minimum) = request.topic_count_policy();
    issues.check(
        result.topics.len() < minimum,
        format!("topic_count_lt_minimum:{}<{}", result.topics.len(), minimum),
    );

    let title = result.title.trim();
    let summary = result.summary.trim();
    issues.check(looks_non_korean(title), "title_non_korean");
    issues.check(looks_non_korean(summary), "summary_non_korean");
    issues.check(char_len(summary) < 50, "summary_too_short");

    let mut practice_count = 0;
    let mut generic_count = 0;
    for (idx, topic) in result.topics.iter().take(CHECKED_TOPIC_LIMIT).enumerate() {
        let n = idx + 1;
        let topic_title = topic.title.trim();
        let description = topic.description.trim();
        issues.check(char_len(topic_title) < 6, format!("topic{n}_title_too_short"));
        issues.check(looks_non_korean(topic_title), format!("topic{n}_title_non_korean"));
        if is_generic_topic_title(topic_title) {
            generic_count += 1;
        }
        issues.check(
            char_len(description) < 45,
            format!("topic{n}_description_too_short"),
        );
        issues.check(
            looks_non_korean(description),
            format!("topic{n}_description_non_korean"),
        );
        if is_practice_topic(topic) {
            practice_count += 1;
        }
    }

    issues.check(generic_count > 0, format!("generic_topic_titles:{generic_count}"));
    issues.check(practice_count < 3, "practice_topic_count_lt_3");

    let keywords = extract_topic_keywords(&request.goal);
    let combined = result
        .topics
        .iter()
        .map(|t| format!("{} {}", t.title, t.description))
        .collect::<Vec<_>>()
        .join(" ");
    issues.check(!mentions_any_keyword(&keywords, &combined), "goal_relevance_low");

    issues
}

const CURRICULUM_SCHEMA: &str = "{\"title\": \"string\", \
\"topics\": [{\"title\": \"string\", \"description\": \"string\", \"estimated_minutes\": 60}], \
\"total_estimated_hours\": 12.5, \"summary\": \"string\"}";

pub fn prompt(request: &CurriculumRequest, attempt: u32) -> Prompt {
    let (target, minimum) = request.topic_count_policy();
    let mut system = format!(
        "당신은 프로그래밍 커리큘럼 설계 전문가입니다.\n\
         코드블록 없이 JSON 객체 하나만 반환하세요.\n\
         스키마:\n{CURRICULUM_SCHEMA}\n\
         규칙:\n\
         - 목표를 향해 순서대로 이어지는 topics 구성\n\
         - title, description, summary는 모두 한국어\n\
         - 실습 또는 프로젝트 토픽 3개 이상\n\
         - estimated_minutes는 35~90 사이 정수\n\
         - 넓은 주제 대신 작고 구체적인 학습 단위\n\
         - '핵심 토픽', '보강 토픽' 같은 일반적인 제목 금지\n\
         - description은 45자 이상이며 실행 결과나 산출물 기준 포함"
    );
    if is_retry_attempt(attempt) {
        system.push_str(
            "\n- 직전 응답이 품질 기준에 못 미쳤으니 구체적인 기술 스택, 개념, 산출물 중심으로 작성",
        );
    }

    let user = format!(
        "학습 목표: {}\n현재 수준: {}\n강점: {}\n약점: {}\n배경: {}\n관심사: {}\n\
         목표 유형: {}\n주당 학습 시간: {}\n학습 스타일: {}\n\
         토픽은 최소 {minimum}개, 목표 {target}개로 구성하세요.\n\
         응답 전체를 한국어로 작성하세요.",
        request.goal,
        request.level,
        join_or_none(&request.strengths),
        join_or_none(&request.weaknesses),
        request.background.as_deref().unwrap_or("정보 없음"),
        join_or_none(&request.interests),
        request.goal_type,
        request.weekly_study_hours,
        request.learning_style,
    );
    Prompt::new(system, user)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// Request to rewrite an existing curriculum from a user message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefineRequest {
    pub current_curriculum: Curriculum,
    #[serde(default)]
    pub chat_history: Vec<ChatMessage>,
    pub user_message: String,
}

impl RefineRequest {
    /// Request used for padding and defaults while refining.
    pub fn basis(&self) -> CurriculumRequest {
        CurriculumRequest::new(self.current_curriculum.title.clone(), "beginner")
    }
}

pub fn refine_prompt(request: &RefineRequest) -> Prompt {
    let system = format!(
        "당신은 커리큘럼 리라이팅 전문가입니다.\n\
         코드블록 없이 JSON 객체 하나만 반환하세요.\n\
         스키마:\n{CURRICULUM_SCHEMA}"
    );

    let topics = request
        .current_curriculum
        .topics
        .iter()
        .enumerate()
        .map(|(idx, t)| {
            format!(
                "{}. {} ({}분) - {}",
                idx + 1,
                t.title,
                t.estimated_minutes,
                t.description
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let history = &request.chat_history;
    let recent = &history[history.len().saturating_sub(REFINE_HISTORY_LIMIT)..];
    let chat_log = recent
        .iter()
        .map(|m| format!("{}: {}", m.role, m.content))
        .collect::<Vec<_>>()
        .join("\n");

    let user = format!(
        "현재 커리큘럼 제목: {}\n현재 토픽:\n{topics}\n대화 이력:\n{}\n사용자 요청: {}\n\
         요청을 반영해 같은 스키마로 수정한 커리큘럼을 반환하세요.",
        request.current_curriculum.title,
        if chat_log.is_empty() { "없음" } else { chat_log.as_str() },
        request.user_message,
    );
    Prompt::new(system, user)
}
