//! Quality gate plumbing: issue lists and their conversion into attempt failures.

use crate::pipeline::AttemptError;

/// Issues reported in a failure for most content types.
pub const ISSUE_CAP: usize = 8;

/// Section sequences report fewer issues.
pub const SECTION_ISSUE_CAP: usize = 6;

/// Ordered list of named quality issues; empty means accept
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QualityIssues(Vec<String>);

impl QualityIssues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, issue: impl Into<String>) {
        self.0.push(issue.into());
    }

    /// Record `issue` when `failed` holds.
    pub fn check(&mut self, failed: bool, issue: impl Into<String>) {
        if failed {
            self.push(issue);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, issue: &str) -> bool {
        self.0.iter().any(|existing| existing == issue)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<String> {
        self.0
    }
}

impl From<Vec<String>> for QualityIssues {
    fn from(issues: Vec<String>) -> Self {
        Self(issues)
    }
}

/// Accept, or fail with the first `cap` issues behind the quality sentinel.
pub fn assert_quality(issues: QualityIssues, cap: usize) -> Result<(), AttemptError> {
    if issues.is_empty() {
        return Ok(());
    }
    let mut issues = issues.into_vec();
    issues.truncate(cap);
    Err(AttemptError::Quality(issues))
}
