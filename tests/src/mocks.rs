//! In-memory implementations of the pipeline's trait seams.
//!
//! Each mock implements the same trait as its production counterpart, so
//! the tests drive the real `TransactionProcessor` through every
//! production code path except the network transports. The state mock
//! mirrors the Redis semantics it stands in for: windowed trim, history
//! truncation, and first-seen-preserving observation.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;

use decision_store::{DecisionRow, DecisionStore, Inserted};
use fraud_core::geo::LastLocation;
use fraud_core::{Decision, Error, Result};
use kafka::DecisionPublisher;
use model_client::FraudPredictor;
use state_store::{median_of, UserStateStore};

/// Rolling window kept in the tx-time series, matching the Redis store.
const TX_WINDOW_SECS: i64 = 24 * 3600;

/// In-memory user state with Redis-equivalent semantics.
#[derive(Default)]
pub struct MemoryStateStore {
    /// user -> transaction id -> epoch seconds
    tx_times: Mutex<HashMap<String, HashMap<String, i64>>>,
    /// user -> most-recent-first amounts
    amounts: Mutex<HashMap<String, Vec<f64>>>,
    /// user -> device id -> first-seen epoch seconds
    devices: Mutex<HashMap<String, HashMap<String, i64>>>,
    /// user -> ip -> first-seen epoch seconds
    ips: Mutex<HashMap<String, HashMap<String, i64>>>,
    /// user -> last location
    locations: Mutex<HashMap<String, LastLocation>>,
}

impl MemoryStateStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// First-seen snapshot for assertions.
    pub fn device_first_seen_sync(&self, user_id: &str, device_id: &str) -> Option<i64> {
        self.devices
            .lock()
            .get(user_id)
            .and_then(|m| m.get(device_id).copied())
    }

    pub fn amounts_for(&self, user_id: &str) -> Vec<f64> {
        self.amounts.lock().get(user_id).cloned().unwrap_or_default()
    }

    fn observe(
        map: &Mutex<HashMap<String, HashMap<String, i64>>>,
        user_id: &str,
        member: &str,
        ts: i64,
    ) -> bool {
        let mut map = map.lock();
        let entries = map.entry(user_id.to_string()).or_default();
        if entries.contains_key(member) {
            // First-seen timestamps are never overwritten.
            false
        } else {
            entries.insert(member.to_string(), ts);
            true
        }
    }

    fn first_seen(
        map: &Mutex<HashMap<String, HashMap<String, i64>>>,
        user_id: &str,
        member: &str,
    ) -> Option<i64> {
        map.lock().get(user_id).and_then(|m| m.get(member).copied())
    }
}

#[async_trait]
impl UserStateStore for MemoryStateStore {
    async fn record_tx_time(&self, user_id: &str, transaction_id: &str, ts: i64) {
        let mut map = self.tx_times.lock();
        let entries = map.entry(user_id.to_string()).or_default();
        entries.insert(transaction_id.to_string(), ts);
        entries.retain(|_, &mut t| t > ts - TX_WINDOW_SECS);
    }

    async fn recent_count(&self, user_id: &str, now: i64, window_sec: i64) -> u64 {
        self.tx_times
            .lock()
            .get(user_id)
            .map(|entries| {
                entries
                    .values()
                    .filter(|&&t| t >= now - window_sec && t <= now)
                    .count() as u64
            })
            .unwrap_or(0)
    }

    async fn record_amount(&self, user_id: &str, amount: f64, max_size: usize) {
        let mut map = self.amounts.lock();
        let history = map.entry(user_id.to_string()).or_default();
        history.insert(0, amount);
        history.truncate(max_size);
    }

    async fn median_amount(&self, user_id: &str) -> f64 {
        self.amounts
            .lock()
            .get(user_id)
            .map(|history| median_of(history))
            .unwrap_or(0.0)
    }

    async fn device_first_seen(&self, user_id: &str, device_id: &str) -> Option<i64> {
        Self::first_seen(&self.devices, user_id, device_id)
    }

    async fn observe_device(&self, user_id: &str, device_id: &str, ts: i64) -> bool {
        Self::observe(&self.devices, user_id, device_id, ts)
    }

    async fn ip_first_seen(&self, user_id: &str, ip: &str) -> Option<i64> {
        Self::first_seen(&self.ips, user_id, ip)
    }

    async fn observe_ip(&self, user_id: &str, ip: &str, ts: i64) -> bool {
        Self::observe(&self.ips, user_id, ip, ts)
    }

    async fn last_location(&self, user_id: &str) -> Option<LastLocation> {
        self.locations.lock().get(user_id).copied()
    }

    async fn set_last_location(&self, user_id: &str, lat: f64, lon: f64, ts: i64) {
        self.locations
            .lock()
            .insert(user_id.to_string(), LastLocation { lat, lon, ts });
    }
}

/// In-memory decision store with primary-key-conflict semantics.
#[derive(Default)]
pub struct MemoryDecisionStore {
    rows: Mutex<BTreeMap<String, DecisionRow>>,
    /// Number of upcoming inserts to fail, for sink-failure tests.
    fail_inserts: Mutex<u32>,
}

impl MemoryDecisionStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn rows(&self) -> Vec<DecisionRow> {
        self.rows.lock().values().cloned().collect()
    }

    pub fn row_count(&self) -> usize {
        self.rows.lock().len()
    }

    pub fn fail_next_inserts(&self, n: u32) {
        *self.fail_inserts.lock() = n;
    }

    fn to_row(decision: &Decision) -> DecisionRow {
        DecisionRow {
            transaction_id: decision.transaction_id.clone(),
            user_id: decision.user_id.clone(),
            decision: decision.decision.as_str().to_string(),
            score: decision.score,
            reasons_csv: Some(decision.reasons_csv()),
            latency_ms: decision.latency_ms as i64,
            evaluated_at: decision.evaluated_at,
        }
    }
}

#[async_trait]
impl DecisionStore for MemoryDecisionStore {
    async fn find(&self, transaction_id: &str) -> Result<Option<DecisionRow>> {
        Ok(self.rows.lock().get(transaction_id).cloned())
    }

    async fn insert(&self, decision: &Decision) -> Result<Inserted> {
        {
            let mut remaining = self.fail_inserts.lock();
            if *remaining > 0 {
                *remaining -= 1;
                return Err(Error::decision_store("simulated insert failure"));
            }
        }

        let mut rows = self.rows.lock();
        if rows.contains_key(&decision.transaction_id) {
            return Ok(Inserted::AlreadyExists);
        }
        rows.insert(decision.transaction_id.clone(), Self::to_row(decision));
        Ok(Inserted::Created)
    }
}

/// Publisher that captures decisions and dead letters in memory.
#[derive(Default)]
pub struct CapturingPublisher {
    decisions: Mutex<Vec<Decision>>,
    dead_letters: Mutex<Vec<(String, String)>>,
    /// Number of upcoming publishes to fail, for redelivery tests.
    fail_publishes: Mutex<u32>,
}

impl CapturingPublisher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn decisions(&self) -> Vec<Decision> {
        self.decisions.lock().clone()
    }

    pub fn decision_count(&self) -> usize {
        self.decisions.lock().len()
    }

    /// Captured dead letters as (reason, payload) pairs.
    pub fn dead_letters(&self) -> Vec<(String, String)> {
        self.dead_letters.lock().clone()
    }

    pub fn fail_next_publishes(&self, n: u32) {
        *self.fail_publishes.lock() = n;
    }
}

#[async_trait]
impl DecisionPublisher for CapturingPublisher {
    async fn publish_decision(&self, decision: &Decision) -> Result<()> {
        {
            let mut remaining = self.fail_publishes.lock();
            if *remaining > 0 {
                *remaining -= 1;
                return Err(Error::kafka("simulated publish failure"));
            }
        }
        self.decisions.lock().push(decision.clone());
        Ok(())
    }

    async fn publish_dead_letter(&self, payload: &[u8], reason: &str) -> Result<()> {
        self.dead_letters.lock().push((
            reason.to_string(),
            String::from_utf8_lossy(payload).to_string(),
        ));
        Ok(())
    }
}

/// Predictor returning scripted probabilities.
///
/// `push_next` queues probabilities consumed in call order; once the queue
/// drains, `default` applies. Every received feature vector is captured
/// for contract assertions.
pub struct ScriptedPredictor {
    queue: Mutex<VecDeque<f64>>,
    default: f64,
    calls: Mutex<Vec<Vec<f64>>>,
}

impl ScriptedPredictor {
    pub fn returning(default: f64) -> Arc<Self> {
        Arc::new(Self {
            queue: Mutex::new(VecDeque::new()),
            default,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn push_next(&self, probability: f64) {
        self.queue.lock().push_back(probability);
    }

    pub fn calls(&self) -> Vec<Vec<f64>> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl FraudPredictor for ScriptedPredictor {
    async fn predict(&self, features: &[f64]) -> f64 {
        self.calls.lock().push(features.to_vec());
        self.queue.lock().pop_front().unwrap_or(self.default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_state_preserves_first_seen() {
        let state = MemoryStateStore::new();
        assert!(state.observe_device("u", "d1", 100).await);
        assert!(!state.observe_device("u", "d1", 999).await);
        assert_eq!(state.device_first_seen("u", "d1").await, Some(100));
    }

    #[tokio::test]
    async fn memory_store_reports_conflicts() {
        let store = MemoryDecisionStore::new();
        let decision = Decision {
            transaction_id: "t1".into(),
            user_id: "u".into(),
            decision: fraud_core::Outcome::Allow,
            score: 0.0,
            reasons: vec![],
            latency_ms: 1,
            evaluated_at: chrono::Utc::now(),
        };
        assert_eq!(store.insert(&decision).await.unwrap(), Inserted::Created);
        assert_eq!(
            store.insert(&decision).await.unwrap(),
            Inserted::AlreadyExists
        );
        assert_eq!(store.row_count(), 1);
    }
}
