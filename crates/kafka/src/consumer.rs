//! Per-partition transaction consumer.
//!
//! One `PartitionConsumer` per inbound partition, with manual offset
//! tracking for at-least-once delivery: an offset only advances after the
//! decision sink has succeeded, so an unacknowledged record is refetched
//! on the next poll.

use rskafka::client::partition::{OffsetAt, PartitionClient, UnknownTopicHandling};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use fraud_core::{Error, Result};

use crate::client::build_client;
use crate::config::{KafkaConfig, StartOffset};

/// A raw inbound record with the offset to commit once it is processed.
#[derive(Debug, Clone)]
pub struct InboundRecord {
    pub offset: i64,
    pub payload: Vec<u8>,
}

/// Consumer for one partition of the inbound transactions topic.
pub struct PartitionConsumer {
    config: KafkaConfig,
    topic: String,
    partition: i32,
    /// Cached partition client; dropped on transport errors.
    partition_client: RwLock<Option<Arc<PartitionClient>>>,
    /// Next offset to read.
    current_offset: AtomicI64,
    /// Whether the start offset has been resolved.
    initialized: AtomicBool,
}

impl PartitionConsumer {
    pub fn new(config: KafkaConfig, partition: i32) -> Self {
        let topic = config.topics.transactions.clone();
        Self {
            config,
            topic,
            partition,
            partition_client: RwLock::new(None),
            current_offset: AtomicI64::new(-1),
            initialized: AtomicBool::new(false),
        }
    }

    pub fn partition(&self) -> i32 {
        self.partition
    }

    /// Connects (or returns the cached connection) and resolves the start
    /// offset on first use.
    async fn ensure_connected(&self) -> Result<Arc<PartitionClient>> {
        {
            let client = self.partition_client.read().await;
            if let Some(ref c) = *client {
                return Ok(c.clone());
            }
        }

        let client = build_client(&self.config).await?;
        let partition_client = client
            .partition_client(
                self.topic.clone(),
                self.partition,
                UnknownTopicHandling::Error,
            )
            .await
            .map_err(|e| Error::kafka(format!("failed to get partition client: {e}")))?;
        let partition_client = Arc::new(partition_client);

        if !self.initialized.load(Ordering::SeqCst) {
            let at = match self.config.consumer.start {
                StartOffset::Earliest => OffsetAt::Earliest,
                StartOffset::Latest => OffsetAt::Latest,
            };
            let offset = partition_client
                .get_offset(at)
                .await
                .map_err(|e| Error::kafka(format!("failed to resolve start offset: {e}")))?;

            self.current_offset.store(offset, Ordering::SeqCst);
            self.initialized.store(true, Ordering::SeqCst);

            info!(
                topic = %self.topic,
                partition = self.partition,
                offset = offset,
                "Partition consumer initialized"
            );
        }

        {
            let mut guard = self.partition_client.write().await;
            *guard = Some(partition_client.clone());
        }

        Ok(partition_client)
    }

    /// Fetches the next batch of records, in partition order.
    pub async fn fetch(&self) -> Result<Vec<InboundRecord>> {
        let client = self.ensure_connected().await?;

        let current = self.current_offset.load(Ordering::SeqCst);
        let max_bytes = self.config.consumer.max_fetch_bytes;
        let max_wait_ms = self.config.consumer.fetch_timeout_ms as i32;

        let (records, high_watermark) = client
            .fetch_records(current, 1..max_bytes, max_wait_ms)
            .await
            .map_err(|e| Error::kafka(format!("fetch failed: {e}")))?;

        let lag = (high_watermark - current).max(0) as u64;
        telemetry::metrics().consumer_lag.set(lag);

        let mut batch = Vec::with_capacity(records.len());
        for record in records {
            // A valueless record still carries an offset that must be
            // acknowledged; an empty payload fails schema admission and
            // dead-letters downstream like any other invalid message.
            if record.record.value.is_none() {
                warn!(
                    partition = self.partition,
                    offset = record.offset,
                    "valueless record on transactions topic"
                );
            }
            batch.push(InboundRecord {
                offset: record.offset,
                payload: record.record.value.unwrap_or_default(),
            });
        }

        if !batch.is_empty() {
            debug!(
                partition = self.partition,
                count = batch.len(),
                offset_start = current,
                "Fetched inbound records"
            );
        }

        Ok(batch)
    }

    /// Acknowledges everything below `offset`; the next fetch starts there.
    pub fn commit(&self, offset: i64) {
        let prev = self.current_offset.swap(offset, Ordering::SeqCst);
        debug!(
            partition = self.partition,
            prev_offset = prev,
            new_offset = offset,
            "Committed offset"
        );
    }

    /// Returns the next offset this consumer will read.
    pub fn current_offset(&self) -> i64 {
        self.current_offset.load(Ordering::SeqCst)
    }

    /// Drops the cached connection so the next fetch reconnects.
    pub async fn reset_connection(&self) {
        let mut client = self.partition_client.write().await;
        *client = None;
        info!(partition = self.partition, "Consumer connection reset");
    }
}
