//! Redis connection configuration.

use serde::{Deserialize, Serialize};

/// Redis configuration for the warm state store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    /// Connection URL, e.g. `redis://localhost:6379/0`.
    #[serde(default = "default_url")]
    pub url: String,
    /// Connect timeout in milliseconds.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

fn default_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

fn default_connect_timeout_ms() -> u64 {
    2000
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }
}
