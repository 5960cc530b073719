//! Decision sink: outbound publish plus durable insert.
//!
//! Both effects are at-least-once; together with the transaction-id
//! primary key they yield effectively-once externally observable state.
//! Retries are bounded; on exhaustion the error escalates to the
//! partition worker, which leaves the input unacknowledged.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use telemetry::metrics;
use tracing::warn;

use decision_store::{DecisionStore, Inserted};
use fraud_core::{Decision, Result};
use kafka::DecisionPublisher;

/// Bounded retry policy for sink effects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    200
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

/// Publishes and persists decisions.
pub struct DecisionSink {
    publisher: Arc<dyn DecisionPublisher>,
    store: Arc<dyn DecisionStore>,
    config: SinkConfig,
}

impl DecisionSink {
    pub fn new(
        publisher: Arc<dyn DecisionPublisher>,
        store: Arc<dyn DecisionStore>,
        config: SinkConfig,
    ) -> Self {
        Self {
            publisher,
            store,
            config,
        }
    }

    /// Emits a decision: publish first, then the audit insert. Either
    /// failing after retries surfaces the error to the caller.
    pub async fn emit(&self, decision: &Decision) -> Result<()> {
        self.publish_with_retry(decision).await?;
        self.persist_with_retry(decision).await
    }

    /// Dead-letters an inbound payload. Retried like any publish; a
    /// failure here means the record must not be acknowledged either.
    pub async fn dead_letter(&self, payload: &[u8], reason: &str) -> Result<()> {
        let mut last_error = None;
        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                tokio::time::sleep(self.backoff(attempt)).await;
            }
            match self.publisher.publish_dead_letter(payload, reason).await {
                Ok(()) => return Ok(()),
                Err(e) => last_error = Some(e),
            }
        }
        Err(last_error
            .unwrap_or_else(|| fraud_core::Error::internal("dead-letter publish failed")))
    }

    fn backoff(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.config.retry_backoff_ms) * attempt
    }

    async fn publish_with_retry(&self, decision: &Decision) -> Result<()> {
        let started = std::time::Instant::now();
        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                metrics().publish_retries.inc();
                let backoff = self.backoff(attempt);
                warn!(
                    tx_id = %decision.transaction_id,
                    attempt = attempt,
                    backoff_ms = %backoff.as_millis(),
                    "Retrying decision publish"
                );
                tokio::time::sleep(backoff).await;
            }

            match self.publisher.publish_decision(decision).await {
                Ok(()) => {
                    metrics()
                        .publish_latency_ms
                        .observe(started.elapsed().as_millis() as u64);
                    return Ok(());
                }
                Err(e) => last_error = Some(e),
            }
        }

        metrics().publish_failures.inc();
        Err(last_error
            .unwrap_or_else(|| fraud_core::Error::internal("decision publish failed")))
    }

    async fn persist_with_retry(&self, decision: &Decision) -> Result<()> {
        let started = std::time::Instant::now();
        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                let backoff = self.backoff(attempt);
                warn!(
                    tx_id = %decision.transaction_id,
                    attempt = attempt,
                    backoff_ms = %backoff.as_millis(),
                    "Retrying decision insert"
                );
                tokio::time::sleep(backoff).await;
            }

            match self.store.insert(decision).await {
                Ok(Inserted::Created) => {
                    metrics()
                        .persist_latency_ms
                        .observe(started.elapsed().as_millis() as u64);
                    return Ok(());
                }
                Ok(Inserted::AlreadyExists) => {
                    // Concurrent reprocessing landed first; the primary key
                    // is the mutual-exclusion primitive and this is success.
                    metrics().persist_conflicts.inc();
                    return Ok(());
                }
                Err(e) => last_error = Some(e),
            }
        }

        metrics().persist_failures.inc();
        Err(last_error
            .unwrap_or_else(|| fraud_core::Error::internal("decision insert failed")))
    }
}
