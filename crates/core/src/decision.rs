//! Outbound decision model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::reason::ReasonTag;

/// Terminal decision category. Ordering is significant:
/// `Allow < Review < Block`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Outcome {
    Allow,
    Review,
    Block,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Allow => "ALLOW",
            Self::Review => "REVIEW",
            Self::Block => "BLOCK",
        }
    }

    /// Parses the uppercase wire form.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "ALLOW" => Some(Self::Allow),
            "REVIEW" => Some(Self::Review),
            "BLOCK" => Some(Self::Block),
            _ => None,
        }
    }
}

/// A scored decision for one transaction. Immutable once emitted; at most
/// one decision record ever exists per `transaction_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Decision {
    pub transaction_id: String,
    pub user_id: String,
    pub decision: Outcome,
    /// Clamped to [0, 100].
    pub score: f64,
    /// Ordered, duplicate-free reason tags from the closed set.
    pub reasons: Vec<ReasonTag>,
    pub latency_ms: u64,
    pub evaluated_at: DateTime<Utc>,
}

impl Decision {
    /// Pipe-delimited reason labels, the audit-store column format.
    pub fn reasons_csv(&self) -> String {
        self.reasons
            .iter()
            .map(|r| r.label())
            .collect::<Vec<_>>()
            .join("|")
    }

    /// Returns the partition key for the decisions topic.
    pub fn partition_key(&self) -> &str {
        &self.user_id
    }
}
