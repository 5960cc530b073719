//! Health check aggregation across pipeline dependencies.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};

/// Health status for the pipeline as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy)
    }
}

/// Component health state.
#[derive(Debug)]
pub struct ComponentHealth {
    name: &'static str,
    healthy: AtomicBool,
    message: parking_lot::RwLock<Option<String>>,
}

impl ComponentHealth {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            healthy: AtomicBool::new(false),
            message: parking_lot::RwLock::new(None),
        }
    }

    pub fn set_healthy(&self) {
        self.healthy.store(true, Ordering::Relaxed);
        *self.message.write() = None;
    }

    pub fn set_unhealthy(&self, msg: impl Into<String>) {
        self.healthy.store(false, Ordering::Relaxed);
        *self.message.write() = Some(msg.into());
    }

    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Relaxed)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn message(&self) -> Option<String> {
        self.message.read().clone()
    }
}

/// Aggregated health report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub components: Vec<ComponentHealthReport>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealthReport {
    pub name: String,
    pub healthy: bool,
    pub message: Option<String>,
}

/// Global health registry for the pipeline's external dependencies.
///
/// The model component is advisory: the pipeline keeps scoring on rules
/// alone when the model is down, so overall status only degrades.
pub struct HealthRegistry {
    pub kafka: ComponentHealth,
    pub redis: ComponentHealth,
    pub postgres: ComponentHealth,
    pub model: ComponentHealth,
}

impl HealthRegistry {
    pub const fn new() -> Self {
        Self {
            kafka: ComponentHealth::new("kafka"),
            redis: ComponentHealth::new("redis"),
            postgres: ComponentHealth::new("postgres"),
            model: ComponentHealth::new("model"),
        }
    }

    fn components(&self) -> [&ComponentHealth; 4] {
        [&self.kafka, &self.redis, &self.postgres, &self.model]
    }

    /// Generate a health report.
    pub fn report(&self) -> HealthReport {
        let components: Vec<ComponentHealthReport> = self
            .components()
            .iter()
            .map(|c| ComponentHealthReport {
                name: c.name().to_string(),
                healthy: c.is_healthy(),
                message: c.message(),
            })
            .collect();

        let all_healthy = components.iter().all(|c| c.healthy);
        let can_decide = self.kafka.is_healthy() && self.postgres.is_healthy();

        let status = if all_healthy {
            HealthStatus::Healthy
        } else if can_decide {
            HealthStatus::Degraded
        } else {
            HealthStatus::Unhealthy
        };

        HealthReport { status, components }
    }

    /// True when the pipeline can consume and emit decisions. Redis and the
    /// model degrade scoring quality but never block decisions.
    pub fn is_ready(&self) -> bool {
        self.kafka.is_healthy() && self.postgres.is_healthy()
    }
}

impl Default for HealthRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Global health registry.
pub static HEALTH: std::sync::LazyLock<HealthRegistry> =
    std::sync::LazyLock::new(HealthRegistry::new);

/// Get the global health registry.
pub fn health() -> &'static HealthRegistry {
    &HEALTH
}
