//! Per-topic teaching rationale (`curriculum_reasoning`).
//!
//! A single direct call: the provider's answer is normalized field by field
//! against template defaults and never quality-gated.

use super::text::{lenient_int, non_empty_str, string_list, truncate_text, value_text};
use super::{join_or_none, teaching_method_label, Prompt};
use crate::provider::JsonObject;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const PIPELINE: &str = "curriculum_reasoning";

const FEEDBACK_WINDOW: usize = 4;
const FEEDBACK_KEPT: usize = 3;
const CONCEPTS_PER_ROW: usize = 4;
const CONCEPT_CHARS: usize = 40;
const DIFFICULT_CONCEPT_LIMIT: usize = 6;
const CONCEPT_ROW_WINDOW: usize = 6;
const CONCEPT_FOCUS_LIMIT: usize = 4;
const LOW_UNDERSTANDING_RATING: i64 = 3;

/// Topic context shared by the reasoning and sections operations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReasoningRequest {
    pub topic: String,
    #[serde(default)]
    pub topic_description: String,
    pub curriculum_goal: String,
    pub learner_level: String,
    pub language: String,
    #[serde(default = "default_teaching_method")]
    pub teaching_method: String,
    #[serde(default)]
    pub prev_topics: Vec<String>,
    #[serde(default)]
    pub next_topics: Vec<String>,
    /// Raw feedback rows; malformed rows are skipped when compacted.
    #[serde(default)]
    pub learner_feedback: Vec<Value>,
    #[serde(default)]
    pub learner_concept_focus: Vec<Value>,
    #[serde(default = "default_learning_style")]
    pub learning_style: String,
}

fn default_teaching_method() -> String {
    "direct_instruction".to_string()
}

fn default_learning_style() -> String {
    "concept_first".to_string()
}

impl ReasoningRequest {
    pub fn new(
        topic: impl Into<String>,
        curriculum_goal: impl Into<String>,
        learner_level: impl Into<String>,
        language: impl Into<String>,
    ) -> Self {
        Self {
            topic: topic.into(),
            topic_description: String::new(),
            curriculum_goal: curriculum_goal.into(),
            learner_level: learner_level.into(),
            language: language.into(),
            teaching_method: default_teaching_method(),
            prev_topics: Vec::new(),
            next_topics: Vec::new(),
            learner_feedback: Vec::new(),
            learner_concept_focus: Vec::new(),
            learning_style: default_learning_style(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TopicReasoning {
    pub learning_objectives: Vec<String>,
    pub prerequisite_concepts: Vec<String>,
    pub why_this_topic: String,
    pub teaching_strategy: String,
    pub difficulty_calibration: String,
    pub connection_to_goal: String,
}

impl TopicReasoning {
    /// Bounded copy embedded in the sections prompt.
    pub fn compact(&self) -> TopicReasoning {
        let cap_list = |items: &[String], take: usize, chars: usize| -> Vec<String> {
            items
                .iter()
                .map(|item| item.trim())
                .filter(|item| !item.is_empty())
                .take(take)
                .map(|item| truncate_text(item, chars))
                .collect()
        };
        TopicReasoning {
            learning_objectives: cap_list(&self.learning_objectives, 4, 120),
            prerequisite_concepts: cap_list(&self.prerequisite_concepts, 6, 80),
            why_this_topic: truncate_text(self.why_this_topic.trim(), 220),
            teaching_strategy: truncate_text(self.teaching_strategy.trim(), 220),
            difficulty_calibration: truncate_text(self.difficulty_calibration.trim(), 180),
            connection_to_goal: truncate_text(self.connection_to_goal.trim(), 220),
        }
    }
}

pub fn fallback(request: &ReasoningRequest) -> TopicReasoning {
    let topic = &request.topic;
    let goal = &request.curriculum_goal;
    TopicReasoning {
        learning_objectives: vec![
            format!("{topic}의 핵심 개념을 설명할 수 있다"),
            format!("{topic}를 코드로 적용할 수 있다"),
        ],
        prerequisite_concepts: vec!["기본 문법".to_string(), "함수/데이터 구조 기초".to_string()],
        why_this_topic: format!("{goal} 목표 달성을 위해 {topic}가 핵심 기반이 됩니다."),
        teaching_strategy: "짧은 개념 설명 후 즉시 예제와 확인 문제를 통해 이해를 고정합니다."
            .to_string(),
        difficulty_calibration: format!(
            "{} 수준에 맞춰 난이도를 단계적으로 높입니다.",
            request.learner_level
        ),
        connection_to_goal: format!(
            "이 토픽을 마치면 {goal}으로 가는 다음 실습 단계에 바로 연결됩니다."
        ),
    }
}

/// Take each field from `raw` when usable, else from [`fallback`].
pub fn normalize(raw: &JsonObject, request: &ReasoningRequest) -> TopicReasoning {
    let defaults = fallback(request);
    let list_or = |key: &str, default: Vec<String>| {
        let items = string_list(raw.get(key));
        if items.is_empty() {
            default
        } else {
            items
        }
    };
    TopicReasoning {
        learning_objectives: list_or("learning_objectives", defaults.learning_objectives),
        prerequisite_concepts: list_or("prerequisite_concepts", defaults.prerequisite_concepts),
        why_this_topic: non_empty_str(raw.get("why_this_topic"), &defaults.why_this_topic),
        teaching_strategy: non_empty_str(raw.get("teaching_strategy"), &defaults.teaching_strategy),
        difficulty_calibration: non_empty_str(
            raw.get("difficulty_calibration"),
            &defaults.difficulty_calibration,
        ),
        connection_to_goal: non_empty_str(
            raw.get("connection_to_goal"),
            &defaults.connection_to_goal,
        ),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedbackSignal {
    pub understanding_rating: i64,
    pub difficult_concepts: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConceptSignal {
    pub concept_tag: String,
    pub mastery_score: i64,
    pub forgetting_risk: i64,
    pub confidence_score: i64,
}

/// Bounded learner signals embedded in reasoning and sections prompts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Personalization {
    pub recent_feedback: Vec<FeedbackSignal>,
    pub difficult_concepts: Vec<String>,
    pub concept_focus: Vec<ConceptSignal>,
    pub low_understanding_count: usize,
}

impl Personalization {
    /// Compact the learner's recent feedback and riskiest concepts.
    ///
    /// Only the last four feedback rows are read; ratings outside 1..=5 drop
    /// the row from `recent_feedback` but keep its difficult concepts.
    pub fn from_request(request: &ReasoningRequest) -> Self {
        let rows = &request.learner_feedback;
        let mut recent_feedback: Vec<FeedbackSignal> = Vec::new();
        let mut difficult_concepts: Vec<String> = Vec::new();

        for row in rows[rows.len().saturating_sub(FEEDBACK_WINDOW)..]
            .iter()
            .filter_map(Value::as_object)
        {
            let rating = lenient_int(row.get("understanding_rating")).unwrap_or(0);
            let concepts: Vec<String> = row
                .get("difficult_concepts")
                .and_then(Value::as_array)
                .into_iter()
                .flatten()
                .map(|item| value_text(item).trim().to_string())
                .filter(|item| !item.is_empty())
                .map(|item| truncate_text(&item, CONCEPT_CHARS))
                .take(CONCEPTS_PER_ROW)
                .collect();

            if (1..=5).contains(&rating) {
                recent_feedback.push(FeedbackSignal {
                    understanding_rating: rating,
                    difficult_concepts: concepts.clone(),
                });
            }
            for concept in concepts {
                if !difficult_concepts.contains(&concept) {
                    difficult_concepts.push(concept);
                }
            }
        }

        let score = |row: &JsonObject, key: &str| lenient_int(row.get(key)).unwrap_or(0).clamp(0, 100);
        let concept_focus: Vec<ConceptSignal> = request
            .learner_concept_focus
            .iter()
            .take(CONCEPT_ROW_WINDOW)
            .filter_map(Value::as_object)
            .filter_map(|row| {
                let tag = row.get("concept_tag").map(value_text).unwrap_or_default();
                let tag = tag.trim();
                if tag.is_empty() {
                    return None;
                }
                Some(ConceptSignal {
                    concept_tag: truncate_text(tag, CONCEPT_CHARS),
                    mastery_score: score(row, "mastery_score"),
                    forgetting_risk: score(row, "forgetting_risk"),
                    confidence_score: score(row, "confidence_score"),
                })
            })
            .take(CONCEPT_FOCUS_LIMIT)
            .collect();

        let low_understanding_count = recent_feedback
            .iter()
            .filter(|signal| signal.understanding_rating <= LOW_UNDERSTANDING_RATING)
            .count();
        let skip = recent_feedback.len().saturating_sub(FEEDBACK_KEPT);
        recent_feedback.drain(..skip);
        difficult_concepts.truncate(DIFFICULT_CONCEPT_LIMIT);

        Self {
            recent_feedback,
            difficult_concepts,
            concept_focus,
            low_understanding_count,
        }
    }

    pub fn to_prompt_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

const REASONING_SYSTEM_PROMPT: &str = "당신은 프로그래밍 학습 설계 전문가입니다.
반드시 JSON 객체 하나만 반환하세요. 코드블록은 금지합니다.
스키마:
{
  \"learning_objectives\": [\"string\"],
  \"prerequisite_concepts\": [\"string\"],
  \"why_this_topic\": \"string\",
  \"teaching_strategy\": \"string\",
  \"difficulty_calibration\": \"string\",
  \"connection_to_goal\": \"string\"
}
규칙:
- 학습자의 약점과 어려웠던 개념을 직접 반영
- 일반론 대신 이 토픽에서 자주 하는 실수를 반드시 포함
- 응답은 한국어로 작성";

pub fn prompt(request: &ReasoningRequest) -> Prompt {
    let personalization = Personalization::from_request(request);
    let user = format!(
        "커리큘럼 목표: {}\n현재 토픽: {}\n토픽 설명: {}\n수준: {}, 언어: {}\n\
         설명 방식: {}\n학습 스타일(활동 리듬): {}\n\
         해석 규칙: 설명 방식은 해설 톤과 피드백 방식, 학습 스타일은 학습 흐름의 리듬을 뜻합니다.\n\
         이전 토픽: {}\n다음 토픽: {}\n개인화 신호: {}\n\
         학습 설계 관점에서 분석 결과를 생성하세요.\n\
         difficult_concepts와 concept_focus의 위험 개념을 우선 반영하세요.",
        request.curriculum_goal,
        request.topic,
        request.topic_description,
        request.learner_level,
        request.language,
        teaching_method_label(&request.teaching_method),
        request.learning_style,
        join_or_none(&request.prev_topics),
        join_or_none(&request.next_topics),
        personalization.to_prompt_json(),
    );
    Prompt::new(REASONING_SYSTEM_PROMPT, user)
}
