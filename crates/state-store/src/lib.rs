//! Warm per-user state store backed by Redis.
//!
//! Holds the rolling context that drives behavioral rules: recent
//! transaction times, amount history, device/ip first-seen maps, and the
//! last known location. All entries are namespaced by user and decay by
//! TTL; reads degrade to absent/zero on transport failure so the pipeline
//! keeps scoring.

pub mod config;
pub mod median;
pub mod store;

pub use config::*;
pub use median::*;
pub use store::*;
