//! Assistant chat (`chat_generate`).
//!
//! A single direct call: the latest user message plus a compacted view of the
//! page context and recent turns go to the provider, which answers with
//! `{"assistant": "..."}`. There is no quality gate and no fallback; a blank
//! answer is an `empty_output` failure.

use super::text::{char_len, truncate_text, value_text};
use super::Prompt;
use crate::failure::collapse_whitespace;
use crate::provider::JsonObject;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const PIPELINE: &str = "chat_generate";

/// Detail and message of a blank assistant answer.
pub const EMPTY_ASSISTANT: &str = "chat_empty_assistant";

const HISTORY_LIMIT: usize = 6;
const HISTORY_TEXT_CHARS: usize = 280;
const CONTEXT_TEXT_CHARS: usize = 220;
const CONTEXT_LIST_ITEMS: usize = 8;
const CONTEXT_LIST_ITEM_CHARS: usize = 120;
const CONTEXT_MAP_ENTRIES: usize = 10;
const CONTEXT_MAP_TEXT_CHARS: usize = 180;

/// Per-key text limits for context values; other keys get 220 chars.
const CONTEXT_KEY_LIMITS: &[(&str, usize)] = &[
    ("contentBody", 1800),
    ("codeExamples", 900),
    ("curriculumGoal", 280),
    ("contentTitle", 220),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatMode {
    Manager,
    Tutor,
}

impl ChatMode {
    /// `tutor` selects the tutor; anything else is the manager.
    pub fn parse(value: &str) -> Self {
        if value == "tutor" {
            ChatMode::Tutor
        } else {
            ChatMode::Manager
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ChatMode::Manager => "manager",
            ChatMode::Tutor => "tutor",
        }
    }

    fn rules(self) -> &'static str {
        match self {
            ChatMode::Manager => {
                "당신은 학습 매니저입니다.\n\
                 - 오늘 할 일, 진도 점검, 학습 루틴 유지에 집중하세요.\n\
                 - 깊은 기술 설명/코드 디버깅 요청은 튜터에게 연결하세요.\n\
                 - 답변은 1~3문장으로 짧고 실행 가능해야 합니다.\n"
            }
            ChatMode::Tutor => {
                "당신은 과정 튜터입니다.\n\
                 - 개념 설명, 코드 예시, 오개념 교정에 집중하세요.\n\
                 - 학습 계획/동기부여 중심 요청은 매니저에게 연결하세요.\n\
                 - 수준에 맞춘 단계형 설명(요약 -> 근거 -> 다음 액션)을 제공하세요.\n"
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Persona {
    Coach,
    Mate,
}

impl Persona {
    /// `coach` or `mate`, case-insensitive; anything else is the coach.
    pub fn parse(value: Option<&Value>) -> Self {
        let text = value.map(value_text).unwrap_or_default();
        match text.trim().to_lowercase().as_str() {
            "mate" => Persona::Mate,
            _ => Persona::Coach,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Persona::Coach => "coach",
            Persona::Mate => "mate",
        }
    }

    fn rules(self) -> &'static str {
        match self {
            Persona::Coach => {
                "말투는 명확하고 목표지향적입니다. 칭찬은 구체적으로, 행동 제안은 분명하게 제시합니다."
            }
            Persona::Mate => "말투는 친근하고 부드럽습니다. 부담을 낮추고 작은 성공 경험을 강조합니다.",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    /// Conversation turns: `{role, content}` or `{role, parts: [{type: "text", text}]}`
    #[serde(default)]
    pub messages: Vec<JsonObject>,
    #[serde(default = "default_chat_type")]
    pub chat_type: String,
    #[serde(default)]
    pub context_id: Option<String>,
    #[serde(default)]
    pub context: JsonObject,
}

fn default_chat_type() -> String {
    ChatMode::Manager.as_str().to_string()
}

impl ChatRequest {
    pub fn new(message: impl Into<String>) -> Self {
        let mut turn = JsonObject::new();
        turn.insert("role".to_string(), Value::from("user"));
        turn.insert("content".to_string(), Value::from(message.into()));
        Self {
            messages: vec![turn],
            chat_type: default_chat_type(),
            context_id: None,
            context: JsonObject::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub chat_type: String,
    pub context_id: Option<String>,
    pub assistant: String,
    pub streaming: bool,
}

/// First non-blank text of a turn: a `text` part wins over `content`.
fn message_text(message: &JsonObject) -> Option<String> {
    let from_parts = message
        .get("parts")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_object)
        .filter(|part| part.get("type").and_then(Value::as_str) == Some("text"))
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .map(str::trim)
        .find(|text| !text.is_empty());
    let text = from_parts.or_else(|| {
        message
            .get("content")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|text| !text.is_empty())
    })?;
    Some(text.to_string())
}

fn role(message: &JsonObject) -> Option<&str> {
    message.get("role").and_then(Value::as_str)
}

/// Text of the latest user turn that has any, or empty.
pub fn last_user_text(messages: &[JsonObject]) -> String {
    messages
        .iter()
        .rev()
        .filter(|message| role(message) == Some("user"))
        .find_map(message_text)
        .unwrap_or_default()
}

/// Whitespace collapsed, then cut to `limit` chars with `...`.
fn compact_text(text: &str, limit: usize) -> String {
    truncate_text(&collapse_whitespace(text), limit)
}

/// Bound every context value: strings by key, lists to 8 short items,
/// maps to 10 entries with short strings. Other values pass through.
pub fn compact_context(context: &JsonObject) -> JsonObject {
    context
        .iter()
        .map(|(key, value)| {
            let compacted = match value {
                Value::String(text) => {
                    let limit = CONTEXT_KEY_LIMITS
                        .iter()
                        .find(|(name, _)| *name == key.as_str())
                        .map_or(CONTEXT_TEXT_CHARS, |(_, limit)| *limit);
                    Value::String(compact_text(text, limit))
                }
                Value::Array(items) => Value::Array(
                    items
                        .iter()
                        .take(CONTEXT_LIST_ITEMS)
                        .map(|item| {
                            let text: String =
                                value_text(item).chars().take(CONTEXT_LIST_ITEM_CHARS).collect();
                            Value::String(text)
                        })
                        .collect(),
                ),
                Value::Object(entries) => Value::Object(
                    entries
                        .iter()
                        .take(CONTEXT_MAP_ENTRIES)
                        .map(|(k, v)| {
                            let v = match v {
                                Value::String(text) => {
                                    Value::String(compact_text(text, CONTEXT_MAP_TEXT_CHARS))
                                }
                                other => other.clone(),
                            };
                            (k.clone(), v)
                        })
                        .collect(),
                ),
                other => other.clone(),
            };
            (key.clone(), compacted)
        })
        .collect()
}

/// `role: text` lines for user and assistant turns among the last six.
pub fn recent_history(messages: &[JsonObject]) -> String {
    messages[messages.len().saturating_sub(HISTORY_LIMIT)..]
        .iter()
        .filter_map(|message| {
            let role = role(message).filter(|r| matches!(*r, "user" | "assistant"))?;
            let text = message_text(message)?;
            Some(format!("{role}: {}", compact_text(&text, HISTORY_TEXT_CHARS)))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn prompt(request: &ChatRequest, last_user: &str) -> Prompt {
    let mode = ChatMode::parse(&request.chat_type);
    let context = compact_context(&request.context);
    let persona = Persona::parse(context.get("assistantPersona"));

    let system = format!(
        "당신은 AI+ 학습 어시스턴트입니다.\n\
         현재 모드: {}\n\
         현재 페르소나: {}\n\
         {}\n\
         페르소나 규칙: {}\n\
         페르소나는 표현/톤만 바꿉니다. 학습 난이도/평가 기준/진행 단계는 임의 변경하지 않습니다.\n\
         한국어 존댓말을 사용하세요.\n\
         형식: {{\"assistant\":\"답변 문자열\"}}\n\
         반드시 JSON 객체 하나만 반환하세요.",
        mode.as_str(),
        persona.as_str(),
        mode.rules(),
        persona.rules(),
    );

    let context_json = serde_json::to_string(&context).unwrap_or_else(|_| "{}".to_string());
    let history = recent_history(&request.messages);
    let user = format!(
        "chatType={}\ncontextId={}\ncontext={context_json}\nrecent_messages={}\nuser_message={}",
        mode.as_str(),
        request.context_id.as_deref().unwrap_or("none"),
        if history.is_empty() { "없음" } else { history.as_str() },
        if last_user.is_empty() { "사용자 메시지 없음" } else { last_user },
    );
    Prompt::new(system, user)
}

/// Trimmed `assistant` text of a provider answer, if any.
pub fn assistant_text(raw: &JsonObject) -> Option<String> {
    raw.get("assistant")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|text| char_len(text) > 0)
        .map(str::to_string)
}
