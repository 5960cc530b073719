//! Rolling-state semantics observed through the store seam.

use integration_tests::fixtures;
use integration_tests::mocks::MemoryStateStore;
use integration_tests::setup::TestContext;
use state_store::UserStateStore;

#[tokio::test]
async fn first_seen_timestamps_survive_later_observations() {
    let state = MemoryStateStore::new();

    assert!(state.observe_device("u", "d1", 1_000).await);
    assert!(!state.observe_device("u", "d1", 2_000).await);
    assert!(!state.observe_device("u", "d1", 3_000).await);
    assert_eq!(state.device_first_seen("u", "d1").await, Some(1_000));

    assert!(state.observe_ip("u", "10.0.0.1", 1_500).await);
    assert!(!state.observe_ip("u", "10.0.0.1", 9_000).await);
    assert_eq!(state.ip_first_seen("u", "10.0.0.1").await, Some(1_500));
}

#[tokio::test]
async fn first_seen_is_preserved_across_pipeline_runs() {
    let ctx = TestContext::new();
    let device = ("device-42", "203.0.113.9");

    let tx1 = fixtures::with_device(fixtures::tx("frank", 10.0), device.0, device.1);
    ctx.process(&tx1).await.unwrap();
    let first = ctx
        .state
        .device_first_seen_sync("frank", device.0)
        .expect("device recorded");

    let tx2 = fixtures::with_device(fixtures::tx("frank", 20.0), device.0, device.1);
    ctx.process(&tx2).await.unwrap();

    assert_eq!(ctx.state.device_first_seen_sync("frank", device.0), Some(first));
}

#[tokio::test]
async fn recent_count_honors_the_window() {
    let state = MemoryStateStore::new();
    let now = 1_000_000;

    state.record_tx_time("u", "a", now - 70).await;
    state.record_tx_time("u", "b", now - 30).await;
    state.record_tx_time("u", "c", now - 5).await;

    assert_eq!(state.recent_count("u", now, 60).await, 2);
    assert_eq!(state.recent_count("u", now, 120).await, 3);
}

#[tokio::test]
async fn tx_times_are_keyed_by_transaction_id() {
    let state = MemoryStateStore::new();
    let now = 1_000_000;

    // The same transaction observed twice (redelivery) counts once.
    state.record_tx_time("u", "tx-1", now).await;
    state.record_tx_time("u", "tx-1", now).await;
    assert_eq!(state.recent_count("u", now, 60).await, 1);

    // Distinct transactions in the same second count separately.
    state.record_tx_time("u", "tx-2", now).await;
    assert_eq!(state.recent_count("u", now, 60).await, 2);
}

#[tokio::test]
async fn amount_history_is_bounded() {
    let ctx = TestContext::new();
    for i in 0..12 {
        ctx.process(&fixtures::tx("grace", 10.0 + i as f64)).await.unwrap();
    }
    assert_eq!(ctx.state.amounts_for("grace").len(), 10);
}

#[tokio::test]
async fn spend_spike_builds_on_the_recorded_median() {
    let ctx = TestContext::new();

    for amount in [10.0, 20.0, 30.0] {
        ctx.process(&fixtures::tx("heidi", amount)).await.unwrap();
    }

    assert_eq!(ctx.state.median_amount("heidi").await, 20.0);

    // 5x the median of {10, 20, 30} is 100; 150 clears it.
    let decision = ctx.evaluate(&fixtures::tx("heidi", 150.0)).await;
    let labels: Vec<String> = decision.reasons.iter().map(|r| r.label()).collect();
    assert!(labels.contains(&"spend_spike".to_string()), "{labels:?}");
}

#[tokio::test]
async fn invalid_amounts_stay_out_of_the_spend_baseline() {
    let ctx = TestContext::new();

    ctx.process(&fixtures::tx("ivan", 25.0)).await.unwrap();
    ctx.process(&fixtures::without_amount(fixtures::tx("ivan", 0.0)))
        .await
        .unwrap();

    assert_eq!(ctx.state.amounts_for("ivan"), vec![25.0]);
}
