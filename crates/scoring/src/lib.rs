//! Pure scoring logic: the stateful rule engine, the model feature
//! extractor, and the score combiner / decision classifier.
//!
//! Nothing in this crate performs I/O. State signals are read by the
//! stream processor and handed in; the engine never writes state.

pub mod combine;
pub mod config;
pub mod features;
pub mod rules;
pub mod signals;

pub use combine::*;
pub use config::*;
pub use rules::*;
pub use signals::*;
