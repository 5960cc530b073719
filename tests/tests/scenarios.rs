//! End-to-end scoring scenarios through the full processor.
//!
//! Each scenario wires the real processor against in-memory seams with a
//! scripted model probability, then checks the emitted decision, its
//! score band, and the reason tags.

use fraud_core::{Outcome, ReasonTag};
use integration_tests::fixtures::{self, NEW_YORK, TOKYO};
use integration_tests::setup::TestContext;

fn labels(decision: &fraud_core::Decision) -> Vec<String> {
    decision.reasons.iter().map(|r| r.label()).collect()
}

#[tokio::test]
async fn ordinary_daytime_purchase_is_allowed() {
    let ctx = TestContext::new();
    ctx.predictor.push_next(0.1);

    let decision = ctx.evaluate(&fixtures::tx("u1", 120.0)).await;

    assert_eq!(decision.decision, Outcome::Allow);
    assert!(decision.score <= 15.0, "score {}", decision.score);
    assert!(decision.reasons.is_empty());
}

#[tokio::test]
async fn night_purchase_with_suspicious_model_goes_to_review() {
    let ctx = TestContext::new();
    ctx.predictor.push_next(0.5);

    let tx = fixtures::with_hour(fixtures::tx("u1", 800.0), 2);
    let decision = ctx.evaluate(&tx).await;

    assert_eq!(decision.decision, Outcome::Review);
    assert_eq!(decision.score, 35.0);
    assert!(labels(&decision).contains(&"night_time".to_string()));
}

#[tokio::test]
async fn large_amount_blocks() {
    let ctx = TestContext::new();
    ctx.predictor.push_next(0.8);

    let decision = ctx.evaluate(&fixtures::tx("u2", 5000.0)).await;

    assert_eq!(decision.decision, Outcome::Block);
    assert!(decision.score >= 60.0, "score {}", decision.score);
    assert!(labels(&decision).contains(&"high_amount".to_string()));
    assert!(labels(&decision).contains(&"ml_high_risk".to_string()));
}

#[tokio::test]
async fn third_rapid_transaction_trips_the_burst_rule() {
    let ctx = TestContext::with_default_probability(0.8);

    let first = ctx.evaluate(&fixtures::tx("u3", 50.0)).await;
    let second = ctx.evaluate(&fixtures::tx("u3", 50.0)).await;
    let third = ctx.evaluate(&fixtures::tx("u3", 50.0)).await;

    assert!(!labels(&first).contains(&"burst_60s".to_string()));
    assert!(!labels(&second).contains(&"burst_60s".to_string()));

    assert_eq!(third.decision, Outcome::Block);
    assert!(third.score >= 40.0, "score {}", third.score);
    assert!(third.reasons.contains(&ReasonTag::Burst { window_sec: 60 }));
}

#[tokio::test]
async fn first_sighting_of_device_and_ip_raises_risk() {
    let ctx = TestContext::new();
    ctx.predictor.push_next(0.5);

    let tx = fixtures::with_device(fixtures::tx("u4", 90.0), "device-009", "198.51.100.7");
    let decision = ctx.evaluate(&tx).await;

    assert!(matches!(decision.decision, Outcome::Review | Outcome::Block));
    assert!(
        (35.0..=55.0).contains(&decision.score),
        "score {}",
        decision.score
    );
    assert!(labels(&decision).contains(&"new_device".to_string()));
    assert!(labels(&decision).contains(&"new_ip".to_string()));
}

#[tokio::test]
async fn teleporting_between_continents_blocks() {
    let ctx = TestContext::new();

    ctx.predictor.push_next(0.0);
    let at_home = fixtures::with_location(fixtures::tx("u5", 40.0), NEW_YORK.0, NEW_YORK.1);
    let first = ctx.evaluate(&at_home).await;
    assert_eq!(first.decision, Outcome::Allow);

    ctx.predictor.push_next(0.7);
    let abroad = fixtures::with_location(fixtures::tx("u5", 40.0), TOKYO.0, TOKYO.1);
    let second = ctx.evaluate(&abroad).await;

    assert_eq!(second.decision, Outcome::Block);
    assert!(second.score >= 50.0, "score {}", second.score);
    assert!(labels(&second).contains(&"geo_impossible".to_string()));
}
