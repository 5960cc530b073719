//! Inbound transaction model.
//!
//! Transactions arrive as JSON on the inbound topic, keyed by `userId`.
//! Unknown fields are ignored; only `transactionId` and `userId` are
//! required for admission. A missing or non-positive amount is still
//! admitted and handled by the rule engine.

use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// Device metadata attached to a transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub ip: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
}

/// Location attached to a transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

/// A payment transaction under evaluation. Immutable once received.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    #[serde(default)]
    pub transaction_id: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub merchant_id: Option<String>,
    /// Some producers still emit the legacy `timestamp` field name.
    #[serde(default = "Utc::now", alias = "timestamp")]
    pub occurred_at: DateTime<Utc>,
    #[serde(default)]
    pub device: Option<Device>,
    #[serde(default)]
    pub location: Option<Location>,
}

impl Transaction {
    /// True when the identity fields required for admission are present.
    pub fn has_identity(&self) -> bool {
        !self.transaction_id.trim().is_empty() && !self.user_id.trim().is_empty()
    }

    /// The amount, if present, finite, and positive.
    pub fn valid_amount(&self) -> Option<f64> {
        self.amount.filter(|a| a.is_finite() && *a > 0.0)
    }

    /// Non-empty device id, if any.
    pub fn device_id(&self) -> Option<&str> {
        self.device
            .as_ref()
            .and_then(|d| d.id.as_deref())
            .filter(|id| !id.trim().is_empty())
    }

    /// Non-empty device ip, if any.
    pub fn device_ip(&self) -> Option<&str> {
        self.device
            .as_ref()
            .and_then(|d| d.ip.as_deref())
            .filter(|ip| !ip.trim().is_empty())
    }

    /// Coordinates, when the location carries both lat and lon.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        let loc = self.location.as_ref()?;
        match (loc.lat, loc.lon) {
            (Some(lat), Some(lon)) => Some((lat, lon)),
            _ => None,
        }
    }

    /// UTC hour of `occurred_at`, 0-23.
    pub fn hour_of_day(&self) -> u32 {
        self.occurred_at.hour()
    }

    /// Returns the partition key for the bus (per-user ordering).
    pub fn partition_key(&self) -> &str {
        &self.user_id
    }
}
