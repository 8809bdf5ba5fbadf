//! Property-based tests for failure classification and legacy detail parsing

use proptest::prelude::*;
use studygen::error_contract::{build_structured_error_detail, parse_legacy_detail, MESSAGE_LIMIT};
use studygen::failure::{classify, FailureKind, QUALITY_SENTINEL};
use studygen::pipeline::format_pipeline_error_detail;

const RATE_OR_TIMEOUT_FRAGMENTS: &[&str] = &["429", "quota", "rate_limit", "timeout", "ai_backpressure_busy"];

fn any_kind() -> impl Strategy<Value = FailureKind> {
    prop::sample::select(FailureKind::ALL.to_vec())
}

/// Classification is total and consistent with the kind table
#[test]
fn test_classification_consistent_with_kind_table() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&any::<String>(), |reason| {
            let c = classify(&reason);
            assert!(FailureKind::ALL.contains(&c.kind));
            assert_ne!(c.kind, FailureKind::Unknown);
            assert_eq!(c.http_status, c.kind.http_status());
            assert_eq!(c.retryable, c.kind.is_default_retryable());
            Ok(())
        })
        .unwrap();
}

/// A rate-limit token outranks every other token in the same reason
#[test]
fn test_rate_limit_has_highest_priority() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(
            &(any::<String>(), any::<String>()),
            |(prefix, suffix)| {
                let reason = format!("{prefix} timed out {QUALITY_SENTINEL} json HTTP 429 {suffix}");
                assert_eq!(classify(&reason).kind, FailureKind::RateLimited);
                Ok(())
            },
        )
        .unwrap();
}

proptest! {
    /// Quality issue lists are always classified as quality failures
    #[test]
    fn quality_sentinel_classified_as_quality_failed(
        issues in prop::collection::vec("[a-z_]{1,20}", 1..8)
    ) {
        let joined = issues.join("|");
        prop_assume!(!RATE_OR_TIMEOUT_FRAGMENTS.iter().any(|f| joined.contains(f)));

        let c = classify(&format!("{QUALITY_SENTINEL}:{joined}"));
        prop_assert_eq!(c.kind, FailureKind::QualityFailed);
        prop_assert_eq!(c.http_status, 422);
        prop_assert!(c.retryable);
    }

    /// Pipeline detail strings parse back to the kind they were built from
    #[test]
    fn pipeline_detail_round_trips_kind(
        pipeline in "[a-z][a-z_]{0,15}",
        kind in any_kind(),
        reason in "\\PC{0,80}",
    ) {
        prop_assume!(pipeline != "ai_service_init");
        let detail = format_pipeline_error_detail(&pipeline, kind, &reason);
        let parsed = parse_legacy_detail(&detail);

        let expected = if kind == FailureKind::Unknown {
            FailureKind::ProviderError
        } else {
            kind
        };
        prop_assert_eq!(parsed.code, expected);
        let prefix = format!("{pipeline}_failed:{kind}:");
        prop_assert!(parsed.detail.starts_with(&prefix));
    }

    /// Client messages never exceed the cap, whatever the input
    #[test]
    fn structured_message_is_bounded(
        kind in any_kind(),
        message in "\\PC{0,600}",
    ) {
        let detail = build_structured_error_detail(kind.as_str(), Some(&message), None, None);
        prop_assert_eq!(detail.error_code, kind);
        prop_assert!(detail.message.chars().count() <= MESSAGE_LIMIT);
        prop_assert!(!detail.message.is_empty());
        prop_assert_eq!(detail.retryable, kind.is_default_retryable());
    }
}
