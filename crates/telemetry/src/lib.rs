//! Internal telemetry for the fraud scoring pipeline.
//!
//! Lightweight in-process metrics plus a component health registry; both
//! are flushed to structured logs by the worker scheduler rather than an
//! external metrics system.

pub mod health;
pub mod metrics;
pub mod tracing_setup;

pub use health::*;
pub use metrics::*;
pub use tracing_setup::*;
