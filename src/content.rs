//! Quality-Gated Content
//!
//! One submodule per content type. Each turns raw provider JSON into a
//! canonical typed object (`normalize`, never fails), inspects it with a
//! battery of named predicates (`quality_issues`), and builds the prompts for
//! an attempt. Call sites that must always answer also get a deterministic
//! `fallback` built from templates.

pub mod assessment;
pub mod chat;
pub mod curriculum;
pub mod lesson;
pub mod options;
pub mod quality;
pub mod reasoning;
pub mod sections;
pub mod text;

pub use quality::{assert_quality, QualityIssues, ISSUE_CAP, SECTION_ISSUE_CAP};

/// System and user instructions for one provider call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

impl Prompt {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
        }
    }
}

/// Attempts after the first ask the model to tighten its output.
pub fn is_retry_attempt(attempt: u32) -> bool {
    attempt > 1
}

/// Canonical teaching method: `direct_instruction` or `problem_based`.
pub fn normalize_teaching_method(value: &str) -> &'static str {
    match value.trim().to_lowercase().as_str() {
        "problem_based" | "socratic" | "project_based" => "problem_based",
        _ => "direct_instruction",
    }
}

/// Learner-facing label of a teaching method.
pub fn teaching_method_label(value: &str) -> &'static str {
    match normalize_teaching_method(value) {
        "problem_based" => "문제 해결형",
        _ => "개념 설명형",
    }
}

/// Comma-joined list, or "없음" when empty.
pub(crate) fn join_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "없음".to_string()
    } else {
        items.join(", ")
    }
}
