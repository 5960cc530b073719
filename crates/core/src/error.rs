//! Unified error type for the fraud scoring pipeline.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for the pipeline.
///
/// Components that degrade instead of failing (state store reads, model
/// calls) do not surface errors at all; everything else funnels through
/// this enum.
#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("kafka error: {0}")]
    Kafka(String),

    #[error("state store error: {0}")]
    StateStore(String),

    #[error("decision store error: {0}")]
    DecisionStore(String),

    #[error("model error: {0}")]
    Model(String),

    #[error("schema invalid: {0}")]
    SchemaInvalid(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn kafka(msg: impl Into<String>) -> Self {
        Self::Kafka(msg.into())
    }

    pub fn state_store(msg: impl Into<String>) -> Self {
        Self::StateStore(msg.into())
    }

    pub fn decision_store(msg: impl Into<String>) -> Self {
        Self::DecisionStore(msg.into())
    }

    pub fn model(msg: impl Into<String>) -> Self {
        Self::Model(msg.into())
    }

    pub fn schema_invalid(msg: impl Into<String>) -> Self {
        Self::SchemaInvalid(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}
