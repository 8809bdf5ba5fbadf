//! Property-based tests for the retry orchestrator's attempt accounting

use proptest::prelude::*;
use std::collections::HashSet;
use studygen::failure::FailureKind;
use studygen::pipeline::{run_with_retry, AttemptError, RetryPolicy};

const REASONS: &[&str] = &[
    "HTTP 429 Too Many Requests",
    "request timed out",
    "json decode error: expecting value",
    "quality_validation_failed:title_too_short",
    "gemini_api_key_missing",
    "connection reset by peer",
];

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .unwrap()
}

fn policy_strategy() -> impl Strategy<Value = RetryPolicy> {
    (
        0u32..5,
        prop::collection::hash_set(prop::sample::select(FailureKind::ALL.to_vec()), 0..5),
    )
        .prop_map(|(max_attempts, kinds)| RetryPolicy::new(max_attempts, kinds))
}

proptest! {
    /// Attempts never exceed the policy bound, and a failure stops the loop
    /// exactly when it is not both default-retryable and allow-listed.
    #[test]
    fn attempts_bounded_and_stop_rule_respected(
        policy in policy_strategy(),
        script in prop::collection::vec(prop::sample::select(REASONS.to_vec()), 1..8),
    ) {
        let runtime = runtime();
        let outcome = runtime.block_on(run_with_retry::<(), _, _>("content_generate", &policy, |attempt| {
            let reason = script[(attempt as usize - 1) % script.len()];
            async move { Err(AttemptError::provider(reason)) }
        }));
        let failure = outcome.unwrap_err();
        let bound = policy.max_attempts.max(1);
        prop_assert!(failure.attempt_count >= 1);
        prop_assert!(failure.attempt_count <= bound);

        for attempt in 1..failure.attempt_count {
            let reason = script[(attempt as usize - 1) % script.len()];
            let c = AttemptError::provider(reason).classification();
            prop_assert!(c.retryable && policy.allows(c.kind));
        }
        if failure.attempt_count < bound {
            prop_assert!(!(failure.retryable && policy.allows(failure.kind)));
        }
    }

    /// Success on attempt `k` reports `k` attempts when every earlier failure was retried
    #[test]
    fn success_reports_attempt_index(max_attempts in 1u32..6, succeed_on in 1u32..6) {
        prop_assume!(succeed_on <= max_attempts);
        let policy = RetryPolicy::new(max_attempts, [FailureKind::Timeout].into_iter().collect::<HashSet<_>>());
        let runtime = runtime();
        let (value, attempts) = runtime
            .block_on(run_with_retry("curriculum_sections", &policy, |attempt| async move {
                if attempt < succeed_on {
                    Err(AttemptError::provider("request timed out"))
                } else {
                    Ok(attempt * 10)
                }
            }))
            .unwrap();
        prop_assert_eq!(attempts, succeed_on);
        prop_assert_eq!(value, succeed_on * 10);
    }
}
