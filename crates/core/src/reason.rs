//! Reason tags: the closed set of rule identifiers carried on a decision.

use std::fmt;

use serde::de::{self, Deserialize, Deserializer, Visitor};
use serde::{Serialize, Serializer};

/// A reason tag identifying which rule contributed to the score.
///
/// Tags serialize as their wire labels (`"night_time"`, `"burst_60s"`, ...)
/// and the set is closed: deserializing an unknown label is an error.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ReasonTag {
    InvalidAmount,
    HighAmount,
    BadCurrency,
    NightTime,
    /// Burst of transactions inside a rolling window; the label carries the
    /// window so downstream consumers can tell configurations apart.
    Burst { window_sec: u64 },
    SpendSpike,
    NewDevice,
    NewIp,
    GeoImpossible,
    MlHighRisk,
}

impl ReasonTag {
    /// Wire label for this tag.
    pub fn label(&self) -> String {
        match self {
            Self::InvalidAmount => "invalid_amount".to_string(),
            Self::HighAmount => "high_amount".to_string(),
            Self::BadCurrency => "bad_currency".to_string(),
            Self::NightTime => "night_time".to_string(),
            Self::Burst { window_sec } => format!("burst_{window_sec}s"),
            Self::SpendSpike => "spend_spike".to_string(),
            Self::NewDevice => "new_device".to_string(),
            Self::NewIp => "new_ip".to_string(),
            Self::GeoImpossible => "geo_impossible".to_string(),
            Self::MlHighRisk => "ml_high_risk".to_string(),
        }
    }

    /// Parses a wire label back into a tag.
    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "invalid_amount" => Some(Self::InvalidAmount),
            "high_amount" => Some(Self::HighAmount),
            "bad_currency" => Some(Self::BadCurrency),
            "night_time" => Some(Self::NightTime),
            "spend_spike" => Some(Self::SpendSpike),
            "new_device" => Some(Self::NewDevice),
            "new_ip" => Some(Self::NewIp),
            "geo_impossible" => Some(Self::GeoImpossible),
            "ml_high_risk" => Some(Self::MlHighRisk),
            other => {
                let window = other.strip_prefix("burst_")?.strip_suffix('s')?;
                window.parse().ok().map(|window_sec| Self::Burst { window_sec })
            }
        }
    }
}

impl fmt::Display for ReasonTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

impl Serialize for ReasonTag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.label())
    }
}

impl<'de> Deserialize<'de> for ReasonTag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TagVisitor;

        impl Visitor<'_> for TagVisitor {
            type Value = ReasonTag;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a known reason tag label")
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<Self::Value, E> {
                ReasonTag::parse(value)
                    .ok_or_else(|| E::custom(format!("unknown reason tag: {value}")))
            }
        }

        deserializer.deserialize_str(TagVisitor)
    }
}
