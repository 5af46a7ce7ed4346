//! Grade analysis.
//!
//! `stats` holds the descriptive statistics; `aggregator` groups grade
//! records into class, student and roster contexts.

pub mod aggregator;
pub mod stats;

pub use aggregator::*;
