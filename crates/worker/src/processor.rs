//! The transaction processor: one full evaluation per inbound record.

use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use telemetry::metrics;
use tracing::{debug, info, warn};

use decision_store::DecisionStore;
use fraud_core::{Decision, Outcome, Result, Transaction};
use model_client::FraudPredictor;
use scoring::{features, rules, RulesConfig, ScorePolicy, StateSignals};
use state_store::UserStateStore;

use crate::sink::DecisionSink;

/// What happened to one inbound record.
#[derive(Debug)]
pub enum ProcessOutcome {
    /// A fresh transaction was scored and its decision emitted.
    Evaluated(Decision),
    /// The idempotency gate found an existing decision; nothing emitted.
    Duplicate,
    /// The payload failed schema admission and went to the dead-letter
    /// topic.
    DeadLettered,
}

/// Evaluates transactions end to end. Shared across partition workers;
/// all state it holds is immutable after startup.
pub struct TransactionProcessor {
    state: Arc<dyn UserStateStore>,
    store: Arc<dyn DecisionStore>,
    predictor: Arc<dyn FraudPredictor>,
    sink: DecisionSink,
    rules: RulesConfig,
    policy: ScorePolicy,
}

impl TransactionProcessor {
    pub fn new(
        state: Arc<dyn UserStateStore>,
        store: Arc<dyn DecisionStore>,
        predictor: Arc<dyn FraudPredictor>,
        sink: DecisionSink,
        rules: RulesConfig,
        policy: ScorePolicy,
    ) -> Self {
        Self {
            state,
            store,
            predictor,
            sink,
            rules,
            policy,
        }
    }

    /// Runs the full evaluation sequence for one raw inbound payload.
    ///
    /// An `Err` means the record must not be acknowledged; redelivery
    /// re-runs from the top and the idempotency gate absorbs any work the
    /// failed attempt already completed.
    pub async fn process(&self, payload: &[u8]) -> Result<ProcessOutcome> {
        let started = Instant::now();
        metrics().transactions_consumed.inc();

        let tx: Transaction = match serde_json::from_slice(payload) {
            Ok(tx) => tx,
            Err(e) => {
                debug!(error = %e, "Undecodable inbound payload");
                return self.dead_letter(payload).await;
            }
        };
        if !tx.has_identity() {
            return self.dead_letter(payload).await;
        }

        // Idempotency gate: at most one decision record per transaction.
        match self.store.find(&tx.transaction_id).await {
            Ok(Some(_)) => {
                metrics().duplicates_skipped.inc();
                debug!(tx_id = %tx.transaction_id, "Duplicate transaction skipped");
                return Ok(ProcessOutcome::Duplicate);
            }
            Ok(None) => {}
            Err(e) => {
                // Proceed as if unseen; the insert's primary-key conflict
                // still dedups, at worst we re-score once.
                warn!(tx_id = %tx.transaction_id, error = %e, "Idempotency gate degraded");
            }
        }

        let now = Utc::now().timestamp();

        // Read every signal before this transaction writes anything, so it
        // cannot trigger its own rules.
        let signals = self.read_signals(&tx, now).await;
        let rule_outcome = rules::evaluate(&tx, &signals, &self.rules);
        self.apply_state_updates(&tx, now).await;

        let features = features::extract(&tx, &signals, &rule_outcome);
        let probability = self.predictor.predict(&features).await;

        let (score, reasons) = self.policy.combine(&rule_outcome, probability);
        let outcome = self.policy.classify(score);

        metrics().rule_hits.inc_by(rule_outcome.reasons.len() as u64);
        match outcome {
            Outcome::Allow => metrics().decisions_allow.inc(),
            Outcome::Review => metrics().decisions_review.inc(),
            Outcome::Block => metrics().decisions_block.inc(),
        }

        let latency_ms = started.elapsed().as_millis() as u64;
        metrics().evaluate_latency_ms.observe(latency_ms);

        let decision = Decision {
            transaction_id: tx.transaction_id.clone(),
            user_id: tx.user_id.clone(),
            decision: outcome,
            score,
            reasons,
            latency_ms,
            evaluated_at: Utc::now(),
        };

        self.sink.emit(&decision).await?;

        info!(
            tx_id = %decision.transaction_id,
            user_id = %decision.user_id,
            decision = decision.decision.as_str(),
            score = decision.score,
            latency_ms = decision.latency_ms,
            "Decision emitted"
        );

        Ok(ProcessOutcome::Evaluated(decision))
    }

    async fn dead_letter(&self, payload: &[u8]) -> Result<ProcessOutcome> {
        metrics().transactions_dead_lettered.inc();
        self.sink.dead_letter(payload, "schema_invalid").await?;
        Ok(ProcessOutcome::DeadLettered)
    }

    async fn read_signals(&self, tx: &Transaction, now: i64) -> StateSignals {
        let user = &tx.user_id;

        let prior_tx_in_window = self
            .state
            .recent_count(user, now, self.rules.burst.window_sec as i64)
            .await;
        let median_amount = self.state.median_amount(user).await;

        let device_first_seen = match tx.device_id() {
            Some(device_id) => self.state.device_first_seen(user, device_id).await,
            None => None,
        };
        let ip_first_seen = match tx.device_ip() {
            Some(ip) => self.state.ip_first_seen(user, ip).await,
            None => None,
        };

        let last_location = if tx.coordinates().is_some() {
            self.state.last_location(user).await
        } else {
            None
        };

        StateSignals {
            now,
            prior_tx_in_window,
            median_amount,
            device_first_seen,
            ip_first_seen,
            last_location,
        }
    }

    async fn apply_state_updates(&self, tx: &Transaction, now: i64) {
        let user = &tx.user_id;

        self.state
            .record_tx_time(user, &tx.transaction_id, now)
            .await;

        // Invalid amounts are scored but kept out of the spend baseline.
        if let Some(amount) = tx.valid_amount() {
            self.state
                .record_amount(user, amount, self.rules.spend.history_size)
                .await;
        }

        if let Some(device_id) = tx.device_id() {
            self.state.observe_device(user, device_id, now).await;
        }
        if let Some(ip) = tx.device_ip() {
            self.state.observe_ip(user, ip, now).await;
        }

        if let Some((lat, lon)) = tx.coordinates() {
            self.state.set_last_location(user, lat, lon, now).await;
        }
    }
}
