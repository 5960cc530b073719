//! Rule and threshold configuration.
//!
//! Every tunable surfaces here with its default; the snapshot is loaded
//! once at startup and validated before any worker starts.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Amount rules: invalid-amount saturation and the high-amount threshold.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AmountRule {
    #[serde(default = "default_high_threshold")]
    #[validate(range(min = 0.0))]
    pub high_threshold: f64,
    #[serde(default = "default_high_score")]
    #[validate(range(min = 0.0, max = 100.0))]
    pub high_score: f64,
    #[serde(default = "default_invalid_score")]
    #[validate(range(min = 0.0, max = 100.0))]
    pub invalid_score: f64,
}

fn default_high_threshold() -> f64 {
    1000.0
}

fn default_high_score() -> f64 {
    60.0
}

fn default_invalid_score() -> f64 {
    100.0
}

impl Default for AmountRule {
    fn default() -> Self {
        Self {
            high_threshold: default_high_threshold(),
            high_score: default_high_score(),
            invalid_score: default_invalid_score(),
        }
    }
}

/// Currency rule: accepted-set membership.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CurrencyRule {
    #[serde(default = "default_currency_score")]
    #[validate(range(min = 0.0, max = 100.0))]
    pub score: f64,
}

fn default_currency_score() -> f64 {
    40.0
}

impl Default for CurrencyRule {
    fn default() -> Self {
        Self {
            score: default_currency_score(),
        }
    }
}

/// Night-time rule: inclusive UTC hour range.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NightRule {
    #[serde(default)]
    #[validate(range(max = 23))]
    pub start_hour: u32,
    #[serde(default = "default_night_end")]
    #[validate(range(max = 23))]
    pub end_hour: u32,
    #[serde(default = "default_night_score")]
    #[validate(range(min = 0.0, max = 100.0))]
    pub score: f64,
}

fn default_night_end() -> u32 {
    5
}

fn default_night_score() -> f64 {
    20.0
}

impl Default for NightRule {
    fn default() -> Self {
        Self {
            start_hour: 0,
            end_hour: default_night_end(),
            score: default_night_score(),
        }
    }
}

/// Burst rule: rolling window over the user's transaction times.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct BurstRule {
    #[serde(default = "default_burst_window")]
    #[validate(range(min = 1))]
    pub window_sec: u64,
    #[serde(default = "default_burst_count")]
    #[validate(range(min = 1))]
    pub count: u64,
    #[serde(default = "default_burst_score")]
    #[validate(range(min = 0.0, max = 100.0))]
    pub score: f64,
}

fn default_burst_window() -> u64 {
    60
}

fn default_burst_count() -> u64 {
    3
}

fn default_burst_score() -> f64 {
    40.0
}

impl Default for BurstRule {
    fn default() -> Self {
        Self {
            window_sec: default_burst_window(),
            count: default_burst_count(),
            score: default_burst_score(),
        }
    }
}

/// Spend-spike rule: multiplier over the user's median amount.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SpendRule {
    #[serde(default = "default_spend_multiplier")]
    #[validate(range(min = 1.0))]
    pub multiplier: f64,
    #[serde(default = "default_spend_history")]
    #[validate(range(min = 1))]
    pub history_size: usize,
    #[serde(default = "default_spend_score")]
    #[validate(range(min = 0.0, max = 100.0))]
    pub score: f64,
}

fn default_spend_multiplier() -> f64 {
    5.0
}

fn default_spend_history() -> usize {
    10
}

fn default_spend_score() -> f64 {
    30.0
}

impl Default for SpendRule {
    fn default() -> Self {
        Self {
            multiplier: default_spend_multiplier(),
            history_size: default_spend_history(),
            score: default_spend_score(),
        }
    }
}

/// New-device freshness rule.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DeviceRule {
    #[serde(default = "default_freshness_days")]
    pub new_within_days: i64,
    #[serde(default = "default_device_score")]
    #[validate(range(min = 0.0, max = 100.0))]
    pub score: f64,
}

fn default_freshness_days() -> i64 {
    7
}

fn default_device_score() -> f64 {
    20.0
}

impl Default for DeviceRule {
    fn default() -> Self {
        Self {
            new_within_days: default_freshness_days(),
            score: default_device_score(),
        }
    }
}

/// New-ip freshness rule.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct IpRule {
    #[serde(default = "default_freshness_days")]
    pub new_within_days: i64,
    #[serde(default = "default_ip_score")]
    #[validate(range(min = 0.0, max = 100.0))]
    pub score: f64,
}

fn default_ip_score() -> f64 {
    15.0
}

impl Default for IpRule {
    fn default() -> Self {
        Self {
            new_within_days: default_freshness_days(),
            score: default_ip_score(),
        }
    }
}

/// Geo-impossible rule: ceiling on implied travel speed.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct GeoRule {
    #[serde(default = "default_geo_speed")]
    #[validate(range(min = 1.0))]
    pub max_speed_kmph: f64,
    #[serde(default = "default_geo_score")]
    #[validate(range(min = 0.0, max = 100.0))]
    pub score: f64,
}

fn default_geo_speed() -> f64 {
    900.0
}

fn default_geo_score() -> f64 {
    50.0
}

impl Default for GeoRule {
    fn default() -> Self {
        Self {
            max_speed_kmph: default_geo_speed(),
            score: default_geo_score(),
        }
    }
}

/// Full rule configuration, including the rule-score blend weight.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RulesConfig {
    /// Weight of the rule score in the final blend.
    #[serde(default = "default_rule_weight")]
    #[validate(range(min = 0.0))]
    pub weight: f64,
    #[serde(default)]
    #[validate(nested)]
    pub amount: AmountRule,
    #[serde(default)]
    #[validate(nested)]
    pub currency: CurrencyRule,
    #[serde(default)]
    #[validate(nested)]
    pub night: NightRule,
    #[serde(default)]
    #[validate(nested)]
    pub burst: BurstRule,
    #[serde(default)]
    #[validate(nested)]
    pub spend: SpendRule,
    #[serde(default)]
    #[validate(nested)]
    pub device: DeviceRule,
    #[serde(default)]
    #[validate(nested)]
    pub ip: IpRule,
    #[serde(default)]
    #[validate(nested)]
    pub geo: GeoRule,
}

fn default_rule_weight() -> f64 {
    0.5
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            weight: default_rule_weight(),
            amount: AmountRule::default(),
            currency: CurrencyRule::default(),
            night: NightRule::default(),
            burst: BurstRule::default(),
            spend: SpendRule::default(),
            device: DeviceRule::default(),
            ip: IpRule::default(),
            geo: GeoRule::default(),
        }
    }
}

impl RulesConfig {
    /// Validates ranges plus the cross-field night window ordering.
    pub fn check(&self) -> Result<(), String> {
        self.validate().map_err(|e| e.to_string())?;
        if self.night.start_hour > self.night.end_hour {
            return Err(format!(
                "night window start {} is after end {}",
                self.night.start_hour, self.night.end_hour
            ));
        }
        Ok(())
    }
}

/// Decision thresholds: inclusive lower bounds for REVIEW and BLOCK.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Thresholds {
    #[serde(default = "default_review_threshold")]
    pub review: f64,
    #[serde(default = "default_block_threshold")]
    pub block: f64,
}

fn default_review_threshold() -> f64 {
    30.0
}

fn default_block_threshold() -> f64 {
    60.0
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            review: default_review_threshold(),
            block: default_block_threshold(),
        }
    }
}

impl Thresholds {
    /// The ALLOW < REVIEW < BLOCK ordering must be preserved.
    pub fn check(&self) -> Result<(), String> {
        if !(0.0..=100.0).contains(&self.review) || !(0.0..=100.0).contains(&self.block) {
            return Err("thresholds must lie in [0, 100]".to_string());
        }
        if self.review >= self.block {
            return Err(format!(
                "review threshold {} must be below block threshold {}",
                self.review, self.block
            ));
        }
        Ok(())
    }
}
