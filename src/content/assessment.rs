//! Placement assessment: question sets (`assessment_questions`) and answer
//! analysis (`assessment_analyze`).

use super::options::{meaningful_options, OPTION_COUNT};
use super::quality::QualityIssues;
use super::text::{char_len, lenient_int, non_empty_str, string_list, value_text};
use super::{is_retry_attempt, join_or_none, Prompt};
use crate::provider::JsonObject;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};

pub const QUESTIONS_PIPELINE: &str = "assessment_questions";
pub const ANALYZE_PIPELINE: &str = "assessment_analyze";

const RAW_QUESTION_LIMIT: usize = 8;
const MIN_QUESTIONS: usize = 5;
const MAX_QUESTIONS: usize = 10;
const MIN_QUESTION_CHARS: usize = 10;
const STRENGTH_LIMIT: usize = 3;
const WEAKNESS_LIMIT: usize = 4;
const DEFAULT_TOPIC_AREA: &str = "핵심 개념";
const DEFAULT_WEAKNESS: &str = "실전 문제 적용력";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionsRequest {
    pub goal: String,
    #[serde(default)]
    pub background: Option<String>,
    #[serde(default)]
    pub interests: Vec<String>,
}

impl QuestionsRequest {
    pub fn new(goal: impl Into<String>) -> Self {
        Self {
            goal: goal.into(),
            background: None,
            interests: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssessmentQuestion {
    pub id: i64,
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: i64,
    #[serde(default = "default_difficulty")]
    pub difficulty: String,
    #[serde(default = "default_topic_area")]
    pub topic_area: String,
}

fn default_difficulty() -> String {
    "easy".to_string()
}

fn default_topic_area() -> String {
    DEFAULT_TOPIC_AREA.to_string()
}

impl AssessmentQuestion {
    fn new(
        id: i64,
        question: String,
        options: [&str; 4],
        difficulty: &str,
        topic_area: &str,
    ) -> Self {
        Self {
            id,
            question,
            options: options.iter().map(|o| o.to_string()).collect(),
            correct_answer: 0,
            difficulty: difficulty.to_string(),
            topic_area: topic_area.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuestionSet {
    pub questions: Vec<AssessmentQuestion>,
}

/// Difficulty bucket: substring match on hard/상, then medium/mid/중, else easy.
pub fn normalize_difficulty(value: &str) -> &'static str {
    let raw = value.trim().to_lowercase();
    if raw.contains("hard") || raw.contains('상') {
        "hard"
    } else if raw.contains("medium") || raw.contains("mid") || raw.contains('중') {
        "medium"
    } else {
        "easy"
    }
}

fn difficulty_weight(difficulty: &str) -> u32 {
    match normalize_difficulty(difficulty) {
        "hard" => 3,
        "medium" => 2,
        _ => 1,
    }
}

pub fn fallback(request: &QuestionsRequest) -> QuestionSet {
    let goal = &request.goal;
    QuestionSet {
        questions: vec![
            AssessmentQuestion::new(
                1,
                format!("\"{goal}\" 학습을 시작할 때 가장 중요한 첫 단계는?"),
                ["핵심 개념 정의 이해", "코드 복붙", "정답 암기", "무작정 구현"],
                "easy",
                "기초 개념",
            ),
            AssessmentQuestion::new(
                2,
                "문제 해결 과정에서 디버깅 로그를 남기는 주된 이유는?".to_string(),
                ["원인 추적", "속도 향상", "코드 길이 증가", "테마 변경"],
                "easy",
                "디버깅",
            ),
            AssessmentQuestion::new(
                3,
                "시간 복잡도를 고려해 구현을 개선할 때 먼저 확인할 것은?".to_string(),
                ["병목 구간", "변수명 길이", "주석 개수", "파일 확장자"],
                "medium",
                "성능 분석",
            ),
            AssessmentQuestion::new(
                4,
                "API 설계에서 입력 검증이 중요한 가장 큰 이유는?".to_string(),
                ["안정성과 보안", "응답 길이 증가", "개발자 수 증가", "배포 횟수 감소"],
                "medium",
                "API 설계",
            ),
            AssessmentQuestion::new(
                5,
                "실전 서비스에서 장애 대응 우선순위로 가장 적절한 것은?".to_string(),
                ["영향도 큰 이슈부터 격리/완화", "전체 리팩터링", "UI 색상 수정", "문서만 업데이트"],
                "hard",
                "운영 대응",
            ),
        ],
    }
}

fn normalize_question_options(value: Option<&Value>) -> Vec<String> {
    let mut options: Vec<String> = value
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .map(|item| value_text(item).trim().to_string())
        .filter(|item| !item.is_empty())
        .take(OPTION_COUNT)
        .collect();
    while options.len() < OPTION_COUNT {
        options.push(format!("선택지 {}", options.len() + 1));
    }
    options
}

fn normalize_question(item: &Value, idx: usize) -> AssessmentQuestion {
    AssessmentQuestion {
        id: lenient_int(item.get("id")).unwrap_or(idx as i64 + 1),
        question: non_empty_str(item.get("question"), &format!("문항 {}", idx + 1)),
        options: normalize_question_options(item.get("options")),
        correct_answer: lenient_int(item.get("correct_answer")).unwrap_or(0).clamp(0, 3),
        difficulty: normalize_difficulty(&item.get("difficulty").map(value_text).unwrap_or_default())
            .to_string(),
        topic_area: non_empty_str(item.get("topic_area"), DEFAULT_TOPIC_AREA),
    }
}

/// Bump colliding ids upward so every id is unique, keeping order.
///
/// A bump past `i64::MAX` wraps around to 1.
fn dedupe_ids(questions: &mut [AssessmentQuestion]) {
    let mut used: HashSet<i64> = HashSet::new();
    for question in questions.iter_mut() {
        if used.contains(&question.id) {
            question.id = next_free_id(&used, question.id);
        }
        used.insert(question.id);
    }
}

fn next_free_id(used: &HashSet<i64>, taken: i64) -> i64 {
    let mut candidate = taken;
    loop {
        candidate = candidate.checked_add(1).unwrap_or(1);
        if !used.contains(&candidate) {
            return candidate;
        }
    }
}

/// Coerce raw provider output into a [`QuestionSet`] of 5 to 10 questions.
///
/// No usable question list yields the fallback set.
pub fn normalize(raw: &JsonObject, request: &QuestionsRequest) -> QuestionSet {
    let raw_items = match raw.get("questions").and_then(Value::as_array) {
        Some(items) if !items.is_empty() => items,
        _ => return fallback(request),
    };

    let mut questions: Vec<AssessmentQuestion> = raw_items
        .iter()
        .take(RAW_QUESTION_LIMIT)
        .enumerate()
        .map(|(idx, item)| normalize_question(item, idx))
        .collect();
    dedupe_ids(&mut questions);

    while questions.len() < MIN_QUESTIONS {
        let idx = questions.len() + 1;
        questions.push(AssessmentQuestion::new(
            idx as i64,
            format!("\"{}\" 학습 핵심을 고르세요. ({idx})", request.goal),
            ["개념 이해", "정답 암기", "무작정 구현", "관련 없는 선택"],
            "medium",
            "학습 전략",
        ));
    }
    dedupe_ids(&mut questions);
    questions.truncate(MAX_QUESTIONS);

    QuestionSet { questions }
}

/// Named quality issues of a question set; empty means accept.
pub fn quality_issues(result: &QuestionSet) -> QualityIssues {
    let mut issues = QualityIssues::new();
    issues.check(
        result.questions.len() < MIN_QUESTIONS,
        "question_count_insufficient",
    );
    for (idx, question) in result.questions.iter().enumerate() {
        let n = idx + 1;
        issues.check(
            char_len(question.question.trim()) < MIN_QUESTION_CHARS,
            format!("question{n}_question_too_short"),
        );
        issues.check(
            meaningful_options(&question.options).len() < OPTION_COUNT,
            format!("question{n}_options_invalid"),
        );
    }
    issues
}

const QUESTIONS_SYSTEM_PROMPT: &str = "당신은 프로그래밍 교육 진단 전문가입니다.
반드시 JSON 객체 하나만 반환하세요. 코드블록은 금지합니다.
스키마:
{
  \"questions\": [
    {
      \"id\": 1,
      \"question\": \"질문\",
      \"options\": [\"선택지1\",\"선택지2\",\"선택지3\",\"선택지4\"],
      \"correct_answer\": 0,
      \"difficulty\": \"easy\",
      \"topic_area\": \"기초 문법\"
    }
  ]
}
규칙:
- 5~8문항
- difficulty는 easy|medium|hard 중 하나
- id는 숫자이며 중복 금지";

pub fn questions_prompt(request: &QuestionsRequest, attempt: u32) -> Prompt {
    let mut system = QUESTIONS_SYSTEM_PROMPT.to_string();
    if is_retry_attempt(attempt) {
        system.push_str("\n- 모든 문항에 서로 다른 의미 있는 선택지 4개를 작성");
    }
    let user = format!(
        "학습 목표: {}\n배경: {}\n관심사: {}\n목표 달성에 필요한 진단 문제를 생성하세요.",
        request.goal,
        request.background.as_deref().unwrap_or("정보 없음"),
        join_or_none(&request.interests),
    );
    Prompt::new(system, user)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssessmentAnswer {
    pub question_id: i64,
    pub selected: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzeRequest {
    pub goal: String,
    pub questions: Vec<AssessmentQuestion>,
    pub answers: Vec<AssessmentAnswer>,
}

impl AnalyzeRequest {
    /// Selected option per question id; later answers win.
    fn answer_map(&self) -> HashMap<i64, i64> {
        self.answers
            .iter()
            .map(|answer| (answer.question_id, answer.selected))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkillLevel {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
}

impl SkillLevel {
    pub fn from_score(effective_score: f64) -> Self {
        if effective_score >= 0.75 {
            SkillLevel::Advanced
        } else if effective_score >= 0.45 {
            SkillLevel::Intermediate
        } else {
            SkillLevel::Beginner
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "beginner" => Some(SkillLevel::Beginner),
            "intermediate" => Some(SkillLevel::Intermediate),
            "advanced" => Some(SkillLevel::Advanced),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SkillLevel::Beginner => "초급",
            SkillLevel::Intermediate => "중급",
            SkillLevel::Advanced => "고급",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssessmentAnalysis {
    pub level: SkillLevel,
    pub summary: String,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
}

struct TopicScore {
    topic: String,
    weighted_correct: f64,
    weighted_total: f64,
}

impl TopicScore {
    fn accuracy(&self) -> f64 {
        if self.weighted_total > 0.0 {
            self.weighted_correct / self.weighted_total
        } else {
            0.0
        }
    }
}

/// Deterministic analysis from difficulty-weighted accuracy.
///
/// The effective score is 85% weighted accuracy plus 15% answer rate.
/// Unanswered questions (no answer or a negative selection) count as wrong.
pub fn analyze(request: &AnalyzeRequest) -> AssessmentAnalysis {
    let answers = request.answer_map();
    let mut weighted_total = 0u32;
    let mut weighted_correct = 0u32;
    let mut answered = 0usize;
    let mut correct = 0usize;
    let mut topics: Vec<TopicScore> = Vec::new();

    for question in &request.questions {
        let weight = difficulty_weight(&question.difficulty);
        let selected = answers.get(&question.id).copied().unwrap_or(-1);
        let is_answered = selected >= 0;
        let is_correct = is_answered && selected == question.correct_answer;

        weighted_total += weight;
        if is_correct {
            weighted_correct += weight;
            correct += 1;
        }
        if is_answered {
            answered += 1;
        }

        let topic = match question.topic_area.trim() {
            "" => DEFAULT_TOPIC_AREA,
            topic => topic,
        };
        let index = match topics.iter().position(|t| t.topic == topic) {
            Some(index) => index,
            None => {
                topics.push(TopicScore {
                    topic: topic.to_string(),
                    weighted_correct: 0.0,
                    weighted_total: 0.0,
                });
                topics.len() - 1
            }
        };
        topics[index].weighted_total += f64::from(weight);
        if is_correct {
            topics[index].weighted_correct += f64::from(weight);
        }
    }

    let weighted_accuracy = if weighted_total > 0 {
        f64::from(weighted_correct) / f64::from(weighted_total)
    } else {
        0.0
    };
    let answer_rate = if request.questions.is_empty() {
        0.0
    } else {
        answered as f64 / request.questions.len() as f64
    };
    let level = SkillLevel::from_score(weighted_accuracy * 0.85 + answer_rate * 0.15);

    topics.sort_by(|a, b| {
        b.accuracy()
            .total_cmp(&a.accuracy())
            .then(b.weighted_total.total_cmp(&a.weighted_total))
    });
    let strengths: Vec<String> = topics
        .iter()
        .filter(|t| t.accuracy() >= 0.75)
        .take(STRENGTH_LIMIT)
        .map(|t| t.topic.clone())
        .collect();

    topics.sort_by(|a, b| {
        a.accuracy()
            .total_cmp(&b.accuracy())
            .then(b.weighted_total.total_cmp(&a.weighted_total))
    });
    let mut weaknesses: Vec<String> = topics
        .iter()
        .filter(|t| t.accuracy() < 0.65)
        .take(WEAKNESS_LIMIT)
        .map(|t| t.topic.clone())
        .collect();
    if weaknesses.is_empty() {
        weaknesses.push(DEFAULT_WEAKNESS.to_string());
    }

    let summary = format!(
        "총 {}문항 중 {correct}문항 정답(가중 정확도 {}%)으로 {} 수준으로 판단됩니다.",
        request.questions.len(),
        (weighted_accuracy * 100.0).round() as i64,
        level.label(),
    );

    AssessmentAnalysis {
        level,
        summary,
        strengths,
        weaknesses,
    }
}

const ANALYZE_SYSTEM_PROMPT: &str = "당신은 프로그래밍 진단 분석 전문가입니다.
반드시 JSON 객체 하나만 반환하세요. 코드블록은 금지합니다.
스키마:
{
  \"level\":\"beginner|intermediate|advanced\",
  \"summary\":\"string\",
  \"strengths\":[\"string\"],
  \"weaknesses\":[\"string\"]
}";

pub fn analyze_prompt(request: &AnalyzeRequest) -> Prompt {
    let answers = request.answer_map();
    let lines = request
        .questions
        .iter()
        .map(|q| {
            let selected = answers.get(&q.id).copied().unwrap_or(-1);
            let verdict = if selected == q.correct_answer { "정답" } else { "오답" };
            format!("- [{verdict}] ({}) {}: {}", q.difficulty, q.topic_area, q.question)
        })
        .collect::<Vec<_>>()
        .join("\n");
    let user = format!(
        "학습 목표: {}\n진단 결과:\n{lines}\n결과를 분석해 수준과 강점, 약점을 산출하세요.",
        request.goal
    );
    Prompt::new(ANALYZE_SYSTEM_PROMPT, user)
}

/// Coerce a provider analysis, borrowing the rule-based summary when missing.
pub fn normalize_analysis(raw: &JsonObject, request: &AnalyzeRequest) -> AssessmentAnalysis {
    let level = raw
        .get("level")
        .and_then(Value::as_str)
        .and_then(SkillLevel::parse)
        .unwrap_or_default();
    let summary = match raw.get("summary").and_then(Value::as_str).map(str::trim) {
        Some(text) if !text.is_empty() => text.to_string(),
        _ => analyze(request).summary,
    };
    let mut strengths = string_list(raw.get("strengths"));
    strengths.truncate(WEAKNESS_LIMIT);
    let mut weaknesses = string_list(raw.get("weaknesses"));
    weaknesses.truncate(WEAKNESS_LIMIT);
    if weaknesses.is_empty() {
        weaknesses.push(DEFAULT_WEAKNESS.to_string());
    }
    AssessmentAnalysis {
        level,
        summary,
        strengths,
        weaknesses,
    }
}
