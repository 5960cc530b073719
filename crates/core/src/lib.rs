//! Core types, shared errors, and geo math for the fraud scoring pipeline.

pub mod decision;
pub mod error;
pub mod geo;
pub mod reason;
pub mod transaction;

pub use decision::*;
pub use error::{Error, Result};
pub use reason::*;
pub use transaction::*;
