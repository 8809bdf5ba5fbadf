//! Integration tests for admission control under concurrent load

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use studygen::failure::{FailureKind, BACKPRESSURE_SENTINEL};
use studygen::gateway::{GatewayConfig, ProviderGateway};
use studygen::pipeline::{run_with_retry, RetryPolicy};

use crate::integration::test_utils::GatedProvider;

fn single_slot_gateway(provider: Arc<GatedProvider>) -> Arc<ProviderGateway> {
    Arc::new(ProviderGateway::new(
        provider,
        GatewayConfig {
            max_concurrency: 1,
            acquire_timeout: Duration::from_millis(25),
        },
    ))
}

async fn wait_until_saturated(gateway: &ProviderGateway) {
    while gateway.available_slots() > 0 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn second_caller_is_rejected_as_rate_limited() {
    let provider = Arc::new(GatedProvider::new());
    let gateway = single_slot_gateway(provider.clone());

    let first = {
        let gateway = Arc::clone(&gateway);
        tokio::spawn(async move { gateway.generate_json("system", "user").await })
    };
    wait_until_saturated(&gateway).await;

    let err = gateway.generate_json("system", "user").await.unwrap_err();
    assert_eq!(err.to_string(), BACKPRESSURE_SENTINEL);
    let classification = err.classification();
    assert_eq!(classification.kind, FailureKind::RateLimited);
    assert_eq!(classification.http_status, 429);
    assert!(classification.retryable);

    provider.release.notify_one();
    let released = first.await.unwrap().unwrap();
    assert_eq!(released["released"], true);
    assert_eq!(provider.started.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn slot_is_released_when_caller_is_cancelled() {
    let provider = Arc::new(GatedProvider::new());
    let gateway = single_slot_gateway(provider.clone());

    let holder = {
        let gateway = Arc::clone(&gateway);
        tokio::spawn(async move { gateway.generate_json("system", "user").await })
    };
    wait_until_saturated(&gateway).await;

    holder.abort();
    assert!(holder.await.unwrap_err().is_cancelled());
    assert_eq!(gateway.available_slots(), 1);
}

#[tokio::test]
async fn saturated_pipeline_exhausts_with_rate_limited_failure() {
    let provider = Arc::new(GatedProvider::new());
    let gateway = single_slot_gateway(provider.clone());

    let holder = {
        let gateway = Arc::clone(&gateway);
        tokio::spawn(async move { gateway.generate_json("system", "user").await })
    };
    wait_until_saturated(&gateway).await;

    let failure = run_with_retry("content_generate", &RetryPolicy::default(), |_| {
        let gateway = Arc::clone(&gateway);
        async move { gateway.generate_json("system", "user").await }
    })
    .await
    .unwrap_err();

    assert_eq!(failure.kind, FailureKind::RateLimited);
    assert_eq!(failure.http_status, 429);
    assert_eq!(failure.attempt_count, 2);
    assert_eq!(
        failure.legacy_detail(),
        "content_generate_failed:rate_limited:ai_backpressure_busy"
    );

    provider.release.notify_one();
    assert!(holder.await.unwrap().is_ok());
}

#[tokio::test]
async fn waiting_caller_is_admitted_when_slot_frees_in_time() {
    let provider = Arc::new(GatedProvider::new());
    let gateway = Arc::new(ProviderGateway::new(
        provider.clone(),
        GatewayConfig {
            max_concurrency: 1,
            acquire_timeout: Duration::from_secs(5),
        },
    ));

    let holder = {
        let gateway = Arc::clone(&gateway);
        tokio::spawn(async move { gateway.generate_json("system", "user").await })
    };
    wait_until_saturated(&gateway).await;

    let waiter = {
        let gateway = Arc::clone(&gateway);
        tokio::spawn(async move { gateway.generate_json("system", "user").await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(provider.started.load(Ordering::SeqCst), 1);
    assert!(!waiter.is_finished());

    provider.release.notify_one();
    assert!(holder.await.unwrap().is_ok());

    while provider.started.load(Ordering::SeqCst) < 2 {
        tokio::task::yield_now().await;
    }
    provider.release.notify_one();
    let admitted = waiter.await.unwrap().unwrap();
    assert_eq!(admitted["released"], true);
    assert_eq!(gateway.available_slots(), 1);
}
