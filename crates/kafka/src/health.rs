//! Bus health checks and partition discovery.

use tracing::{debug, error};

use fraud_core::{Error, Result};

use crate::client::build_client;
use crate::config::KafkaConfig;

/// Check broker connection health by listing topics.
pub async fn check_connection(config: &KafkaConfig) -> bool {
    match build_client(config).await {
        Ok(client) => match client.list_topics().await {
            Ok(topics) => {
                debug!(topics = topics.len(), "Bus connection healthy");
                true
            }
            Err(e) => {
                error!("Failed to list topics: {e}");
                false
            }
        },
        Err(e) => {
            error!("Failed to connect to brokers: {e}");
            false
        }
    }
}

/// Discovers the partition ids of a topic. Worker parallelism is bounded
/// by this set: one partition worker per id.
pub async fn partition_ids(config: &KafkaConfig, topic: &str) -> Result<Vec<i32>> {
    let client = build_client(config).await?;
    let topics = client
        .list_topics()
        .await
        .map_err(|e| Error::kafka(format!("failed to list topics: {e}")))?;

    let found = topics
        .into_iter()
        .find(|t| t.name == topic)
        .ok_or_else(|| Error::kafka(format!("topic {topic} does not exist")))?;

    let partitions: Vec<i32> = found.partitions.into_iter().collect();
    Ok(partitions)
}
