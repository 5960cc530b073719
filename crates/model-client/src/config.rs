//! Model service configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the external prediction service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MlConfig {
    /// When false, the model contributes a flat 0.0.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Base URL of the prediction service.
    #[serde(default = "default_url")]
    pub url: String,
    /// Weight of the model score in the final blend.
    #[serde(default = "default_weight")]
    pub weight: f64,
    /// Per-call wall-clock deadline in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_enabled() -> bool {
    true
}

fn default_url() -> String {
    "http://localhost:8084".to_string()
}

fn default_weight() -> f64 {
    0.5
}

fn default_timeout_ms() -> u64 {
    2000
}

impl Default for MlConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            url: default_url(),
            weight: default_weight(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl MlConfig {
    pub fn check(&self) -> Result<(), String> {
        if self.weight < 0.0 {
            return Err("ml weight must be non-negative".to_string());
        }
        if self.timeout_ms == 0 {
            return Err("ml timeout must be at least 1ms".to_string());
        }
        Ok(())
    }
}
