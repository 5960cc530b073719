//! HTTP client for the external fraud model service.
//!
//! The model is advisory: every failure mode (disabled, timeout, transport
//! error, malformed response) degrades to a neutral probability of 0.0 and
//! the pipeline keeps scoring on rules alone.

pub mod client;
pub mod config;

pub use client::*;
pub use config::*;
