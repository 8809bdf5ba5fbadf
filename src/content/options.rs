//! Multiple-choice option normalization.
//!
//! Providers decorate options with enumerators ("1)", "A.", "보기 2:") or
//! return bare labels instead of text. These helpers strip decorations,
//! reject placeholder labels and recover options written inline in prose.

use super::text::value_text;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static LABELED_OPTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:선택지|보기|옵션|option)\s*[0-9A-Da-d]+(?:\s*[:.)\-]\s*|\s+)(.+)$")
        .expect("static regex")
});

static NUMBERED_OPTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:\(?[1-9]\)?[.)\-]|[A-Da-d][.)\-])\s*(.+)$").expect("static regex")
});

static ENUMERATED_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:\(?[1-9]\)?[.)]|[A-Da-d][.)])\s*(.+?)\s*$").expect("static regex")
});

static PLACEHOLDER_LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:\d+|[a-d]|\d+\s*번|(?:선택지|보기|옵션|option)\s*[0-9a-d]+)$")
        .expect("static regex")
});

/// Options per multiple-choice item.
pub const OPTION_COUNT: usize = 4;

/// Strip a leading label or enumerator from an option.
pub fn normalize_option_text(value: &str) -> String {
    let text = value.trim();
    if text.is_empty() {
        return String::new();
    }
    if let Some(caps) = LABELED_OPTION.captures(text) {
        return caps[1].trim().to_string();
    }
    if let Some(caps) = NUMBERED_OPTION.captures(text) {
        return caps[1].trim().to_string();
    }
    text.to_string()
}

/// Blank text, a bare number or letter, "N번", or a bare label like "보기 3".
pub fn is_placeholder_option(text: &str) -> bool {
    let lowered = text.trim().to_lowercase();
    lowered.is_empty() || PLACEHOLDER_LABEL.is_match(&lowered)
}

/// Options written as enumerated lines inside free text, in source order.
pub fn extract_enumerated_options(sources: &[&str], max_options: usize) -> Vec<String> {
    let mut extracted: Vec<String> = Vec::new();
    for source in sources.iter().filter(|s| !s.trim().is_empty()) {
        for line in source.lines() {
            let Some(caps) = ENUMERATED_LINE.captures(line.trim()) else {
                continue;
            };
            let candidate = normalize_option_text(&caps[1]);
            if is_placeholder_option(&candidate) || extracted.contains(&candidate) {
                continue;
            }
            extracted.push(candidate);
            if extracted.len() >= max_options {
                return extracted;
            }
        }
    }
    extracted
}

/// Distinct, normalized, non-placeholder options from a raw JSON list.
pub fn collect_options(raw: Option<&Value>, max_options: usize) -> Vec<String> {
    let mut options: Vec<String> = Vec::new();
    let Some(items) = raw.and_then(Value::as_array) else {
        return options;
    };
    for item in items {
        let candidate = normalize_option_text(&value_text(item));
        if is_placeholder_option(&candidate) || options.contains(&candidate) {
            continue;
        }
        options.push(candidate);
        if options.len() >= max_options {
            break;
        }
    }
    options
}

/// Options that still carry meaning after normalization.
pub fn meaningful_options(options: &[String]) -> Vec<String> {
    options
        .iter()
        .filter(|option| !option.trim().is_empty())
        .map(|option| normalize_option_text(option))
        .filter(|option| !is_placeholder_option(option))
        .collect()
}
