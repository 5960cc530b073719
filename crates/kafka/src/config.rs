//! Bus configuration.

use serde::{Deserialize, Deserializer, Serialize};

/// Deserialize brokers as either a comma-separated string or a list.
fn deserialize_brokers<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::{self, Visitor};
    use std::fmt;

    struct BrokersVisitor;

    impl<'de> Visitor<'de> for BrokersVisitor {
        type Value = Vec<String>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a comma-separated string or a list of broker addresses")
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(value.split(',').map(|s| s.trim().to_string()).collect())
        }

        fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
        where
            A: de::SeqAccess<'de>,
        {
            let mut brokers = Vec::new();
            while let Some(broker) = seq.next_element::<String>()? {
                brokers.push(broker);
            }
            Ok(brokers)
        }
    }

    deserializer.deserialize_any(BrokersVisitor)
}

/// Topic names used by the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicsConfig {
    /// Inbound transactions, keyed by userId (producer contract).
    #[serde(default = "default_transactions_topic")]
    pub transactions: String,
    /// Outbound decisions, keyed by userId.
    #[serde(default = "default_decisions_topic")]
    pub decisions: String,
    /// Dead letters for schema-invalid inbound messages.
    #[serde(default = "default_dead_letter_topic")]
    pub dead_letter: String,
}

fn default_transactions_topic() -> String {
    "payments.transactions".to_string()
}

fn default_decisions_topic() -> String {
    "fraud.decisions".to_string()
}

fn default_dead_letter_topic() -> String {
    "payments.deadletter".to_string()
}

impl Default for TopicsConfig {
    fn default() -> Self {
        Self {
            transactions: default_transactions_topic(),
            decisions: default_decisions_topic(),
            dead_letter: default_dead_letter_topic(),
        }
    }
}

/// Where a fresh consumer starts when it has no committed offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StartOffset {
    Earliest,
    Latest,
}

/// Consumer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsumerConfig {
    /// Consumer group ID (informational; offsets are tracked in-process).
    #[serde(default = "default_group_id")]
    pub group_id: String,
    /// Start position for a fresh partition worker.
    #[serde(default = "default_start")]
    pub start: StartOffset,
    /// Maximum bytes fetched per poll.
    #[serde(default = "default_max_fetch_bytes")]
    pub max_fetch_bytes: i32,
    /// Max wait for a fetch to fill, in milliseconds.
    #[serde(default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,
}

fn default_group_id() -> String {
    "fraud-engine".to_string()
}

fn default_start() -> StartOffset {
    StartOffset::Latest
}

fn default_max_fetch_bytes() -> i32 {
    1024 * 1024
}

fn default_fetch_timeout_ms() -> u64 {
    1000
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            group_id: default_group_id(),
            start: default_start(),
            max_fetch_bytes: default_max_fetch_bytes(),
            fetch_timeout_ms: default_fetch_timeout_ms(),
        }
    }
}

/// Bus configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KafkaConfig {
    /// Broker addresses (comma-separated string or list).
    #[serde(deserialize_with = "deserialize_brokers", default = "default_brokers")]
    pub brokers: Vec<String>,
    /// SASL username (SCRAM-SHA-256 over TLS when set).
    pub sasl_username: Option<String>,
    /// SASL password.
    pub sasl_password: Option<String>,
    #[serde(default)]
    pub topics: TopicsConfig,
    #[serde(default)]
    pub consumer: ConsumerConfig,
}

fn default_brokers() -> Vec<String> {
    vec!["localhost:9092".to_string()]
}

impl Default for KafkaConfig {
    fn default() -> Self {
        Self {
            brokers: default_brokers(),
            sasl_username: None,
            sasl_password: None,
            topics: TopicsConfig::default(),
            consumer: ConsumerConfig::default(),
        }
    }
}

impl KafkaConfig {
    /// Returns the broker list as a comma-separated string.
    pub fn broker_string(&self) -> String {
        self.brokers.join(",")
    }

    pub fn check(&self) -> Result<(), String> {
        if self.brokers.is_empty() {
            return Err("at least one broker is required".to_string());
        }
        if self.sasl_username.is_some() != self.sasl_password.is_some() {
            return Err("sasl username and password must be set together".to_string());
        }
        Ok(())
    }
}
