//! State signals handed to the rule engine.
//!
//! The stream processor reads all of these from the warm store *before*
//! applying this transaction's own state writes, so a transaction can
//! never trigger its own rules through state it just created.

use fraud_core::geo::LastLocation;

/// Per-user signals read from the warm state store for one evaluation.
#[derive(Debug, Clone, Default)]
pub struct StateSignals {
    /// Evaluation wall clock, epoch seconds. All window math keys off this.
    pub now: i64,
    /// Transactions already recorded inside the burst window, excluding the
    /// one under evaluation.
    pub prior_tx_in_window: u64,
    /// Median of the user's recorded amounts; 0.0 with no history.
    pub median_amount: f64,
    /// First-seen epoch seconds of the transaction's device, if ever seen.
    pub device_first_seen: Option<i64>,
    /// First-seen epoch seconds of the transaction's ip, if ever seen.
    pub ip_first_seen: Option<i64>,
    /// The user's last known location before this transaction.
    pub last_location: Option<LastLocation>,
}

impl StateSignals {
    /// Empty signals at a given instant; what a degraded state store yields.
    pub fn empty(now: i64) -> Self {
        Self {
            now,
            ..Self::default()
        }
    }
}
