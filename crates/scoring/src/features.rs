//! Model feature extraction.
//!
//! The slot order below is a compatibility contract with the deployed
//! model artifact and must not change without a model version bump. The
//! binary cross-checks `FEATURE_COUNT` against the model's advertised
//! feature list at startup and refuses to score on disagreement.

use fraud_core::Transaction;

use crate::rules::RuleOutcome;
use crate::signals::StateSignals;

/// Arity of the feature vector.
pub const FEATURE_COUNT: usize = 18;

/// Canonical slot names, in slot order.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "amount",
    "hour_of_day",
    "currency_code",
    "has_device",
    "has_location",
    "tx_count_window",
    "median_amount",
    "spend_deviation_ratio",
    "required_speed_kmph",
    "rule_invalid_amount",
    "rule_high_amount",
    "rule_bad_currency",
    "rule_night_time",
    "rule_burst",
    "rule_spend_spike",
    "rule_new_device",
    "rule_new_ip",
    "rule_geo_impossible",
];

/// Stable currency dictionary; unknown or missing encodes as 0.
pub fn currency_code(currency: Option<&str>) -> f64 {
    match currency.map(|c| c.to_ascii_uppercase()).as_deref() {
        Some("USD") => 1.0,
        Some("EUR") => 2.0,
        Some("GBP") => 3.0,
        Some("CAD") => 4.0,
        Some("AUD") => 5.0,
        _ => 0.0,
    }
}

fn bit(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}

/// Builds the fixed-arity feature vector for one evaluation.
///
/// Missing optional inputs contribute 0, never NaN.
pub fn extract(tx: &Transaction, signals: &StateSignals, rules: &RuleOutcome) -> [f64; FEATURE_COUNT] {
    let amount = tx.valid_amount().unwrap_or(0.0);
    let spend_deviation_ratio = if signals.median_amount > 0.0 && amount > 0.0 {
        amount / signals.median_amount - 1.0
    } else {
        0.0
    };

    [
        amount,
        tx.hour_of_day() as f64,
        currency_code(tx.currency.as_deref()),
        bit(tx.device_id().is_some() || tx.device_ip().is_some()),
        bit(tx.coordinates().is_some()),
        // The count the burst rule compared: prior entries plus this one.
        (signals.prior_tx_in_window + 1) as f64,
        signals.median_amount,
        spend_deviation_ratio,
        rules.required_speed_kmph,
        bit(rules.bits.invalid_amount),
        bit(rules.bits.high_amount),
        bit(rules.bits.bad_currency),
        bit(rules.bits.night_time),
        bit(rules.bits.burst),
        bit(rules.bits.spend_spike),
        bit(rules.bits.new_device),
        bit(rules.bits.new_ip),
        bit(rules.bits.geo_impossible),
    ]
}
