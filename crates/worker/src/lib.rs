//! Stream processing workers for the fraud pipeline.
//!
//! One partition worker per inbound partition drives the evaluation
//! sequence: idempotency gate → state reads → rules → state writes →
//! features → model → combine → sink → acknowledge.

pub mod processor;
pub mod scheduler;
pub mod sink;

pub use processor::*;
pub use scheduler::*;
pub use sink::*;
