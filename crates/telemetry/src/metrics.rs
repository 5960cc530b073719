//! Internal metrics collection.
//!
//! Collected in-memory with relaxed atomics and periodically snapshotted
//! into a structured log line by the scheduler.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// A counter metric.
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_by(&self, n: u64) {
        self.0.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// A gauge metric (can go up or down).
#[derive(Debug, Default)]
pub struct Gauge(AtomicU64);

impl Gauge {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn set(&self, val: u64) {
        self.0.store(val, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Histogram for latency tracking in milliseconds.
#[derive(Debug)]
pub struct Histogram {
    /// Buckets: 1ms, 5ms, 10ms, 25ms, 50ms, 100ms, 250ms, 500ms, 1s, 2s, 5s
    buckets: [AtomicU64; 11],
    sum: AtomicU64,
    count: AtomicU64,
}

impl Default for Histogram {
    fn default() -> Self {
        Self::new()
    }
}

impl Histogram {
    const BUCKET_BOUNDS: [u64; 11] = [1, 5, 10, 25, 50, 100, 250, 500, 1000, 2000, 5000];

    pub fn new() -> Self {
        Self {
            buckets: Default::default(),
            sum: AtomicU64::new(0),
            count: AtomicU64::new(0),
        }
    }

    /// Records a value in milliseconds.
    pub fn observe(&self, ms: u64) {
        self.sum.fetch_add(ms, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);

        for (i, &bound) in Self::BUCKET_BOUNDS.iter().enumerate() {
            if ms <= bound {
                self.buckets[i].fetch_add(1, Ordering::Relaxed);
                return;
            }
        }
        self.buckets[10].fetch_add(1, Ordering::Relaxed);
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn sum(&self) -> u64 {
        self.sum.load(Ordering::Relaxed)
    }

    pub fn mean(&self) -> f64 {
        let count = self.count();
        if count == 0 {
            0.0
        } else {
            self.sum() as f64 / count as f64
        }
    }

    /// Returns bucket upper bounds with their counts.
    pub fn buckets(&self) -> Vec<(u64, u64)> {
        Self::BUCKET_BOUNDS
            .iter()
            .zip(self.buckets.iter())
            .map(|(&bound, count)| (bound, count.load(Ordering::Relaxed)))
            .collect()
    }
}

/// Collected metrics for the fraud pipeline.
#[derive(Debug, Default)]
pub struct Metrics {
    // Stream processor
    pub transactions_consumed: Counter,
    pub transactions_dead_lettered: Counter,
    pub duplicates_skipped: Counter,
    pub decisions_allow: Counter,
    pub decisions_review: Counter,
    pub decisions_block: Counter,
    pub rule_hits: Counter,

    // Model client
    pub model_calls: Counter,
    pub model_failures: Counter,

    // State store degradation
    pub state_read_failures: Counter,
    pub state_write_failures: Counter,

    // Decision sink
    pub publish_retries: Counter,
    pub publish_failures: Counter,
    pub persist_conflicts: Counter,
    pub persist_failures: Counter,

    // Latency histograms
    pub evaluate_latency_ms: Histogram,
    pub model_latency_ms: Histogram,
    pub publish_latency_ms: Histogram,
    pub persist_latency_ms: Histogram,

    // Gauges
    pub partitions_active: Gauge,
    pub consumer_lag: Gauge,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }
}

/// A snapshot of metrics at a point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub timestamp: DateTime<Utc>,
    pub transactions_consumed: u64,
    pub transactions_dead_lettered: u64,
    pub duplicates_skipped: u64,
    pub decisions_allow: u64,
    pub decisions_review: u64,
    pub decisions_block: u64,
    pub rule_hits: u64,
    pub model_calls: u64,
    pub model_failures: u64,
    pub state_read_failures: u64,
    pub state_write_failures: u64,
    pub publish_retries: u64,
    pub publish_failures: u64,
    pub persist_conflicts: u64,
    pub persist_failures: u64,
    pub evaluate_latency_mean_ms: f64,
    pub model_latency_mean_ms: f64,
    pub publish_latency_mean_ms: f64,
    pub persist_latency_mean_ms: f64,
    pub partitions_active: u64,
    pub consumer_lag: u64,
}

impl Metrics {
    /// Takes a snapshot of current metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            timestamp: Utc::now(),
            transactions_consumed: self.transactions_consumed.get(),
            transactions_dead_lettered: self.transactions_dead_lettered.get(),
            duplicates_skipped: self.duplicates_skipped.get(),
            decisions_allow: self.decisions_allow.get(),
            decisions_review: self.decisions_review.get(),
            decisions_block: self.decisions_block.get(),
            rule_hits: self.rule_hits.get(),
            model_calls: self.model_calls.get(),
            model_failures: self.model_failures.get(),
            state_read_failures: self.state_read_failures.get(),
            state_write_failures: self.state_write_failures.get(),
            publish_retries: self.publish_retries.get(),
            publish_failures: self.publish_failures.get(),
            persist_conflicts: self.persist_conflicts.get(),
            persist_failures: self.persist_failures.get(),
            evaluate_latency_mean_ms: self.evaluate_latency_ms.mean(),
            model_latency_mean_ms: self.model_latency_ms.mean(),
            publish_latency_mean_ms: self.publish_latency_ms.mean(),
            persist_latency_mean_ms: self.persist_latency_ms.mean(),
            partitions_active: self.partitions_active.get(),
            consumer_lag: self.consumer_lag.get(),
        }
    }
}

/// Global metrics registry.
pub static METRICS: std::sync::LazyLock<Metrics> = std::sync::LazyLock::new(Metrics::new);

/// Get the global metrics instance.
pub fn metrics() -> &'static Metrics {
    &METRICS
}
