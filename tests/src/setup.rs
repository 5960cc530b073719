//! Common test setup.

use std::sync::Arc;

use fraud_core::Result;
use scoring::{RulesConfig, ScorePolicy};
use worker::{DecisionSink, ProcessOutcome, SinkConfig, TransactionProcessor};

use crate::mocks::{
    CapturingPublisher, MemoryDecisionStore, MemoryStateStore, ScriptedPredictor,
};

/// Test context driving the real processor through in-memory seams.
///
/// All four production trait seams are substituted, so every production
/// code path runs except the network transports themselves.
pub struct TestContext {
    pub state: Arc<MemoryStateStore>,
    pub store: Arc<MemoryDecisionStore>,
    pub publisher: Arc<CapturingPublisher>,
    pub predictor: Arc<ScriptedPredictor>,
    pub processor: TransactionProcessor,
}

impl TestContext {
    /// Context with default rules/policy and a silent model.
    pub fn new() -> Self {
        Self::with_default_probability(0.0)
    }

    /// Context whose model answers `probability` unless a per-call value
    /// was scripted.
    pub fn with_default_probability(probability: f64) -> Self {
        let state = MemoryStateStore::new();
        let store = MemoryDecisionStore::new();
        let publisher = CapturingPublisher::new();
        let predictor = ScriptedPredictor::returning(probability);

        let sink = DecisionSink::new(
            publisher.clone(),
            store.clone(),
            SinkConfig {
                max_retries: 1,
                retry_backoff_ms: 1,
            },
        );

        let processor = TransactionProcessor::new(
            state.clone(),
            store.clone(),
            predictor.clone(),
            sink,
            RulesConfig::default(),
            ScorePolicy::default(),
        );

        Self {
            state,
            store,
            publisher,
            predictor,
            processor,
        }
    }

    /// Feeds one JSON transaction through the processor.
    pub async fn process(&self, tx: &serde_json::Value) -> Result<ProcessOutcome> {
        let payload = serde_json::to_vec(tx).expect("fixture serializes");
        self.processor.process(&payload).await
    }

    /// Processes and unwraps an evaluated decision.
    pub async fn evaluate(&self, tx: &serde_json::Value) -> fraud_core::Decision {
        match self.process(tx).await.expect("processing succeeds") {
            ProcessOutcome::Evaluated(decision) => decision,
            other => panic!("expected an evaluated decision, got {other:?}"),
        }
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}
