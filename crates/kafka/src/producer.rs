//! Outbound decision and dead-letter publishing.

use async_trait::async_trait;
use chrono::Utc;
use rskafka::client::partition::{Compression, PartitionClient, UnknownTopicHandling};
use rskafka::record::Record;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use fraud_core::{Decision, Error, Result};

use crate::client::build_client;
use crate::config::KafkaConfig;
use crate::partitioner::partition_hash;

/// Publisher seam for the decision sink. The real `Producer` speaks to the
/// bus; tests substitute a capturing mock.
#[async_trait]
pub trait DecisionPublisher: Send + Sync {
    /// Publishes a decision to the decisions topic, keyed by userId so
    /// per-user ordering survives downstream.
    async fn publish_decision(&self, decision: &Decision) -> Result<()>;

    /// Publishes an undecodable inbound payload to the dead-letter topic.
    async fn publish_dead_letter(&self, payload: &[u8], reason: &str) -> Result<()>;
}

/// Bus-backed publisher with cached per-partition clients.
pub struct Producer {
    config: KafkaConfig,
    /// Cached partition clients keyed by `topic:partition`.
    clients: RwLock<BTreeMap<String, Arc<PartitionClient>>>,
    /// Cached partition counts per topic.
    partition_counts: RwLock<BTreeMap<String, i32>>,
}

impl Producer {
    pub fn new(config: KafkaConfig) -> Self {
        Self {
            config,
            clients: RwLock::new(BTreeMap::new()),
            partition_counts: RwLock::new(BTreeMap::new()),
        }
    }

    /// Gets or creates a partition client for a topic.
    async fn get_client(&self, topic: &str, partition: i32) -> Result<Arc<PartitionClient>> {
        let key = format!("{topic}:{partition}");

        {
            let clients = self.clients.read().await;
            if let Some(client) = clients.get(&key) {
                return Ok(client.clone());
            }
        }

        let client = build_client(&self.config).await?;
        let partition_client = client
            .partition_client(topic.to_string(), partition, UnknownTopicHandling::Error)
            .await
            .map_err(|e| Error::kafka(format!("failed to get partition client: {e}")))?;
        let partition_client = Arc::new(partition_client);

        {
            let mut clients = self.clients.write().await;
            clients.insert(key, partition_client.clone());
        }

        Ok(partition_client)
    }

    /// Number of partitions on a topic, discovered once and cached.
    async fn partition_count(&self, topic: &str) -> Result<i32> {
        {
            let counts = self.partition_counts.read().await;
            if let Some(&count) = counts.get(topic) {
                return Ok(count);
            }
        }

        let client = build_client(&self.config).await?;
        let topics = client
            .list_topics()
            .await
            .map_err(|e| Error::kafka(format!("failed to list topics: {e}")))?;
        let count = topics
            .into_iter()
            .find(|t| t.name == topic)
            .map(|t| t.partitions.len() as i32)
            .filter(|&n| n > 0)
            .ok_or_else(|| Error::kafka(format!("topic {topic} does not exist")))?;

        {
            let mut counts = self.partition_counts.write().await;
            counts.insert(topic.to_string(), count);
        }

        Ok(count)
    }

    async fn produce_one(&self, topic: &str, partition: i32, record: Record) -> Result<()> {
        let client = self.get_client(topic, partition).await?;
        client
            .produce(vec![record], Compression::NoCompression)
            .await
            .map_err(|e| Error::kafka(format!("produce to {topic} failed: {e}")))?;
        Ok(())
    }
}

#[async_trait]
impl DecisionPublisher for Producer {
    async fn publish_decision(&self, decision: &Decision) -> Result<()> {
        let topic = self.config.topics.decisions.clone();
        let partitions = self.partition_count(&topic).await?;
        let partition = partition_hash(decision.partition_key(), partitions);

        let payload = serde_json::to_vec(decision)?;
        let record = Record {
            key: Some(decision.user_id.clone().into_bytes()),
            value: Some(payload),
            headers: BTreeMap::new(),
            timestamp: Utc::now(),
        };

        self.produce_one(&topic, partition, record).await?;

        debug!(
            tx_id = %decision.transaction_id,
            user_id = %decision.user_id,
            decision = decision.decision.as_str(),
            partition = partition,
            "Published decision"
        );
        Ok(())
    }

    async fn publish_dead_letter(&self, payload: &[u8], reason: &str) -> Result<()> {
        let topic = self.config.topics.dead_letter.clone();
        let body = serde_json::json!({
            "reason": reason,
            "payload": String::from_utf8_lossy(payload),
            "ts": Utc::now(),
        });

        let record = Record {
            key: None,
            value: Some(serde_json::to_vec(&body)?),
            headers: BTreeMap::new(),
            timestamp: Utc::now(),
        };

        // Dead letters are low-volume diagnostics; a single partition is
        // plenty and keeps them in arrival order.
        self.produce_one(&topic, 0, record).await?;

        debug!(reason = %reason, "Published dead letter");
        Ok(())
    }
}
