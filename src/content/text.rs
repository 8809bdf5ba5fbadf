//! Text coercion and inspection helpers shared by the normalizers.
//!
//! Provider output is untyped JSON, so every accessor here is lenient: a value
//! of the wrong type is treated as missing. Lengths are counted in chars.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static KEYWORD_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-Za-z가-힣0-9_#+.\-]+").expect("static regex"));

const KEYWORD_STOPWORDS: &[&str] = &["핵심", "토픽", "주제", "학습", "실전", "과제", "보강", "섹션"];
const KEYWORD_LIMIT: usize = 5;

const PLACEHOLDER_PHRASES: &[&str] = &[
    "핵심 내용을 정리합니다",
    "핵심 포인트를 확인하세요",
    "간단한 예제를 실행해 동작을 확인합니다",
    "다음 단계로 넘어갑니다",
    "hello world",
];

/// Trimmed string value, or `fallback` when missing, blank or not a string.
pub fn non_empty_str(value: Option<&Value>, fallback: &str) -> String {
    match value.and_then(Value::as_str).map(str::trim) {
        Some(text) if !text.is_empty() => text.to_string(),
        _ => fallback.to_string(),
    }
}

/// Render any JSON value as display text; `null` becomes empty.
pub fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Lenient integer coercion: integers, floats (truncated), numeric strings and bools.
pub fn lenient_int(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        Value::Bool(b) => Some(i64::from(*b)),
        _ => None,
    }
}

/// Non-blank strings of a JSON list, trimmed. Non-list values yield nothing.
pub fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .map(|item| value_text(item).trim().to_string())
                .filter(|item| !item.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Cut to `limit` chars, ending with `...` when shortened.
pub fn truncate_text(text: &str, limit: usize) -> String {
    if char_len(text) <= limit {
        return text.to_string();
    }
    let kept: String = text.chars().take(limit.saturating_sub(3)).collect();
    format!("{}...", kept.trim_end())
}

pub fn count_non_empty_lines(code: &str) -> usize {
    code.lines().filter(|line| !line.trim().is_empty()).count()
}

pub fn contains_hangul(text: &str) -> bool {
    text.chars().any(|ch| ('가'..='힣').contains(&ch))
}

/// Blank, or Latin letters with no Hangul at all.
pub fn looks_non_korean(text: &str) -> bool {
    let stripped = text.trim();
    if stripped.is_empty() {
        return true;
    }
    stripped.chars().any(|ch| ch.is_ascii_alphabetic()) && !contains_hangul(stripped)
}

/// Blank text or text containing a known boilerplate phrase.
pub fn is_placeholder_like(text: &str) -> bool {
    let lowered = text.trim().to_lowercase();
    lowered.is_empty() || PLACEHOLDER_PHRASES.iter().any(|phrase| lowered.contains(phrase))
}

/// Up to five distinctive lowercase tokens of a topic or goal.
pub fn extract_topic_keywords(topic: &str) -> Vec<String> {
    let lowered = topic.to_lowercase();
    let mut tokens: Vec<String> = Vec::new();
    for raw in KEYWORD_TOKEN.find_iter(&lowered) {
        let token = raw
            .as_str()
            .trim_matches(|c| matches!(c, '.' | '_' | '-' | ' '));
        if char_len(token) < 2
            || token.chars().all(|c| c.is_ascii_digit())
            || KEYWORD_STOPWORDS.contains(&token)
        {
            continue;
        }
        if !tokens.iter().any(|existing| existing == token) {
            tokens.push(token.to_string());
        }
    }
    tokens.truncate(KEYWORD_LIMIT);
    tokens
}

/// True when there are no keywords, or `haystack` (lowercased) contains one.
pub fn mentions_any_keyword(keywords: &[String], haystack: &str) -> bool {
    if keywords.is_empty() {
        return true;
    }
    let lowered = haystack.to_lowercase();
    keywords.iter().any(|keyword| lowered.contains(keyword.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_non_empty_str() {
        assert_eq!(non_empty_str(Some(&json!("  hi ")), "x"), "hi");
        assert_eq!(non_empty_str(Some(&json!("   ")), "x"), "x");
        assert_eq!(non_empty_str(Some(&json!(3)), "x"), "x");
        assert_eq!(non_empty_str(None, "x"), "x");
    }

    #[test]
    fn test_lenient_int() {
        assert_eq!(lenient_int(Some(&json!(7))), Some(7));
        assert_eq!(lenient_int(Some(&json!(55.9))), Some(55));
        assert_eq!(lenient_int(Some(&json!(" 12 "))), Some(12));
        assert_eq!(lenient_int(Some(&json!("12.5"))), None);
        assert_eq!(lenient_int(Some(&json!(null))), None);
    }

    #[test]
    fn test_extract_topic_keywords() {
        assert_eq!(
            extract_topic_keywords("Python 리스트 컴프리헨션 핵심"),
            vec!["python", "리스트", "컴프리헨션"]
        );
        assert_eq!(extract_topic_keywords("C++ 2024 a"), vec!["c++"]);
        assert!(extract_topic_keywords("학습 토픽 1").is_empty());
        assert_eq!(extract_topic_keywords("a b c d e f g h ij kl mn op qr st").len(), 5);
    }

    #[test]
    fn test_keyword_tokens_strip_edges() {
        assert_eq!(extract_topic_keywords("_rust_ .async."), vec!["rust", "async"]);
    }

    #[test]
    fn test_looks_non_korean() {
        assert!(looks_non_korean("Introduction to Rust"));
        assert!(!looks_non_korean("Rust 소유권 이해"));
        assert!(!looks_non_korean("123"));
        assert!(looks_non_korean("  "));
    }

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("abcdef", 10), "abcdef");
        assert_eq!(truncate_text("abc def ghi", 8), "abc d...");
        assert_eq!(truncate_text("가나다라마바", 5), "가나...");
    }

    #[test]
    fn test_placeholder_like() {
        assert!(is_placeholder_like(""));
        assert!(is_placeholder_like("여기서 Hello World 를 출력"));
        assert!(!is_placeholder_like("소유권은 값의 수명을 결정합니다"));
    }

    #[test]
    fn test_count_non_empty_lines() {
        assert_eq!(count_non_empty_lines("a\n\n  \nb\nc"), 3);
    }

    #[test]
    fn test_string_list() {
        assert_eq!(string_list(Some(&json!([" a ", "", 3]))), vec!["a", "3"]);
        assert!(string_list(Some(&json!("a"))).is_empty());
    }
}
