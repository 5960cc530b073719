//! Worker scheduler: partition workers plus periodic background tasks.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tracing::{error, info};

use kafka::PartitionConsumer;
use model_client::ModelClient;
use telemetry::{health, metrics};

use crate::processor::TransactionProcessor;

/// Worker scheduler configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Pause after a partition-level error before refetching.
    #[serde(default = "default_error_backoff_ms")]
    pub error_backoff_ms: u64,
    /// Metrics snapshot log interval.
    #[serde(default = "default_metrics_interval_secs")]
    pub metrics_flush_interval_secs: u64,
    /// Model health probe interval.
    #[serde(default = "default_model_probe_secs")]
    pub model_probe_interval_secs: u64,
}

fn default_error_backoff_ms() -> u64 {
    1000
}

fn default_metrics_interval_secs() -> u64 {
    60
}

fn default_model_probe_secs() -> u64 {
    30
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            error_backoff_ms: default_error_backoff_ms(),
            metrics_flush_interval_secs: default_metrics_interval_secs(),
            model_probe_interval_secs: default_model_probe_secs(),
        }
    }
}

/// Drains one inbound partition in strict FIFO order.
pub struct PartitionWorker {
    consumer: PartitionConsumer,
    processor: Arc<TransactionProcessor>,
    error_backoff: Duration,
}

impl PartitionWorker {
    pub fn new(
        consumer: PartitionConsumer,
        processor: Arc<TransactionProcessor>,
        config: &WorkerConfig,
    ) -> Self {
        Self {
            consumer,
            processor,
            error_backoff: Duration::from_millis(config.error_backoff_ms),
        }
    }

    /// Runs indefinitely: fetch → process each record in order → commit.
    pub async fn run(&self) {
        info!(
            partition = self.consumer.partition(),
            "Partition worker starting"
        );

        loop {
            match self.step().await {
                Ok(0) => {}
                Ok(count) => {
                    tracing::debug!(
                        partition = self.consumer.partition(),
                        count = count,
                        "Processed records"
                    );
                }
                Err(e) => {
                    error!(
                        partition = self.consumer.partition(),
                        error = %e,
                        "Partition processing error"
                    );
                    tokio::time::sleep(self.error_backoff).await;
                    self.consumer.reset_connection().await;
                }
            }
        }
    }

    /// One poll cycle. A processing error leaves the failing record's
    /// offset uncommitted so redelivery re-runs it; everything before it
    /// in the batch stays acknowledged.
    async fn step(&self) -> fraud_core::Result<usize> {
        let records = self.consumer.fetch().await?;
        if records.is_empty() {
            return Ok(0);
        }

        let count = records.len();
        for record in records {
            self.processor.process(&record.payload).await?;
            self.consumer.commit(record.offset + 1);
        }
        Ok(count)
    }
}

/// Spawns partition workers and the periodic background loops.
pub struct WorkerScheduler {
    config: WorkerConfig,
    processor: Arc<TransactionProcessor>,
    consumers: Vec<PartitionConsumer>,
    model: Option<Arc<ModelClient>>,
}

impl WorkerScheduler {
    pub fn new(
        config: WorkerConfig,
        processor: Arc<TransactionProcessor>,
        consumers: Vec<PartitionConsumer>,
    ) -> Self {
        Self {
            config,
            processor,
            consumers,
            model: None,
        }
    }

    /// Attaches a model client for the periodic health probe.
    pub fn with_model(mut self, model: Arc<ModelClient>) -> Self {
        self.model = Some(model);
        self
    }

    /// Starts all workers and returns their join handles.
    pub fn start(self) -> Vec<tokio::task::JoinHandle<()>> {
        let mut handles = Vec::new();

        metrics().partitions_active.set(self.consumers.len() as u64);

        for consumer in self.consumers {
            let worker = PartitionWorker::new(consumer, self.processor.clone(), &self.config);
            handles.push(tokio::spawn(async move {
                worker.run().await;
            }));
        }

        let flush_interval = Duration::from_secs(self.config.metrics_flush_interval_secs);
        handles.push(tokio::spawn(async move {
            run_metrics_flush(flush_interval).await;
        }));

        if let Some(model) = self.model {
            let probe_interval = Duration::from_secs(self.config.model_probe_interval_secs);
            handles.push(tokio::spawn(async move {
                run_model_probe(model, probe_interval).await;
            }));
        }

        info!("Workers started");
        handles
    }
}

/// Periodically logs a metrics snapshot as one structured line.
async fn run_metrics_flush(period: Duration) {
    let mut ticker = interval(period);
    loop {
        ticker.tick().await;
        let snapshot = metrics().snapshot();
        info!(
            consumed = snapshot.transactions_consumed,
            dead_lettered = snapshot.transactions_dead_lettered,
            duplicates = snapshot.duplicates_skipped,
            allow = snapshot.decisions_allow,
            review = snapshot.decisions_review,
            block = snapshot.decisions_block,
            model_calls = snapshot.model_calls,
            model_failures = snapshot.model_failures,
            persist_conflicts = snapshot.persist_conflicts,
            evaluate_mean_ms = snapshot.evaluate_latency_mean_ms,
            model_mean_ms = snapshot.model_latency_mean_ms,
            consumer_lag = snapshot.consumer_lag,
            "Pipeline metrics"
        );
    }
}

/// Tracks model availability in the health registry. The pipeline keeps
/// scoring either way; this only drives observability.
async fn run_model_probe(model: Arc<ModelClient>, period: Duration) {
    let mut ticker = interval(period);
    loop {
        ticker.tick().await;
        if model.is_healthy().await {
            health().model.set_healthy();
        } else {
            health().model.set_unhealthy("health probe failed");
        }
    }
}
