//! The stateful rule engine.
//!
//! A pure function from `(transaction, state signals, config)` to a partial
//! score plus tagged reasons. Evaluation order is fixed and mirrors the
//! reason ordering contract; contributions sum and saturate at 100.

use fraud_core::{geo, ReasonTag, Transaction};

use crate::config::RulesConfig;
use crate::signals::StateSignals;

/// Currencies accepted without penalty.
pub const ACCEPTED_CURRENCIES: [&str; 5] = ["USD", "EUR", "GBP", "CAD", "AUD"];

/// 0/1 mirrors of which rules fired, in rule-table order. These feed the
/// model feature vector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RuleBits {
    pub invalid_amount: bool,
    pub high_amount: bool,
    pub bad_currency: bool,
    pub night_time: bool,
    pub burst: bool,
    pub spend_spike: bool,
    pub new_device: bool,
    pub new_ip: bool,
    pub geo_impossible: bool,
}

/// Result of one rule-engine evaluation.
#[derive(Debug, Clone)]
pub struct RuleOutcome {
    /// Summed contributions, saturated at 100.
    pub score: f64,
    /// Reason tags in evaluation order; no duplicates.
    pub reasons: Vec<ReasonTag>,
    pub bits: RuleBits,
    /// Implied travel speed used by the geo rule; 0.0 when no last
    /// location was available. Exposed as a model feature.
    pub required_speed_kmph: f64,
}

/// Whole days elapsed between two epoch-second instants. Truncating
/// division: 7.9 days reads as 7.
fn days_between(now: i64, earlier: i64) -> i64 {
    (now - earlier) / 86_400
}

fn currency_accepted(currency: Option<&str>) -> bool {
    match currency {
        Some(c) => {
            c.len() == 3
                && c.bytes().all(|b| b.is_ascii_alphabetic())
                && ACCEPTED_CURRENCIES.iter().any(|a| a.eq_ignore_ascii_case(c))
        }
        None => false,
    }
}

/// Evaluates the rule table against one transaction.
///
/// Reads state signals only; never writes. The burst comparison counts the
/// transaction under evaluation itself (`prior + 1`), which matches the
/// original record-then-count behavior while keeping all state writes
/// after the signal reads.
pub fn evaluate(tx: &Transaction, signals: &StateSignals, cfg: &RulesConfig) -> RuleOutcome {
    let mut score = 0.0;
    let mut reasons = Vec::new();
    let mut bits = RuleBits::default();

    let amount = tx.valid_amount();

    if amount.is_none() {
        score += cfg.amount.invalid_score;
        bits.invalid_amount = true;
        reasons.push(ReasonTag::InvalidAmount);
    }

    if let Some(a) = amount {
        if a >= cfg.amount.high_threshold {
            score += cfg.amount.high_score;
            bits.high_amount = true;
            reasons.push(ReasonTag::HighAmount);
        }
    }

    if !currency_accepted(tx.currency.as_deref()) {
        score += cfg.currency.score;
        bits.bad_currency = true;
        reasons.push(ReasonTag::BadCurrency);
    }

    let hour = tx.hour_of_day();
    if hour >= cfg.night.start_hour && hour <= cfg.night.end_hour {
        score += cfg.night.score;
        bits.night_time = true;
        reasons.push(ReasonTag::NightTime);
    }

    if signals.prior_tx_in_window + 1 >= cfg.burst.count {
        score += cfg.burst.score;
        bits.burst = true;
        reasons.push(ReasonTag::Burst {
            window_sec: cfg.burst.window_sec,
        });
    }

    if let Some(a) = amount {
        if signals.median_amount > 0.0 && a >= signals.median_amount * cfg.spend.multiplier {
            score += cfg.spend.score;
            bits.spend_spike = true;
            reasons.push(ReasonTag::SpendSpike);
        }
    }

    if tx.device_id().is_some() {
        let fresh = match signals.device_first_seen {
            None => true,
            Some(first) => days_between(signals.now, first) <= cfg.device.new_within_days,
        };
        if fresh {
            score += cfg.device.score;
            bits.new_device = true;
            reasons.push(ReasonTag::NewDevice);
        }
    }

    if tx.device_ip().is_some() {
        let fresh = match signals.ip_first_seen {
            None => true,
            Some(first) => days_between(signals.now, first) <= cfg.ip.new_within_days,
        };
        if fresh {
            score += cfg.ip.score;
            bits.new_ip = true;
            reasons.push(ReasonTag::NewIp);
        }
    }

    let mut required_speed_kmph = 0.0;
    if let (Some((lat, lon)), Some(last)) = (tx.coordinates(), signals.last_location) {
        let km = geo::haversine_km(last.lat, last.lon, lat, lon);
        // dt floors at one second so co-located same-second transactions
        // never divide by zero.
        let dt_hours = (signals.now - last.ts).max(1) as f64 / 3600.0;
        required_speed_kmph = km / dt_hours;
        if required_speed_kmph > cfg.geo.max_speed_kmph {
            score += cfg.geo.score;
            bits.geo_impossible = true;
            reasons.push(ReasonTag::GeoImpossible);
        }
    }

    RuleOutcome {
        score: score.min(100.0),
        reasons,
        bits,
        required_speed_kmph,
    }
}
