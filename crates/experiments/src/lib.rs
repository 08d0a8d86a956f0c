//! A/B test statistics for the free-shipping bar: per-variant conversion
//! rates, lift against control, z-test confidence and status labels.

#![warn(clippy::unwrap_used)]

pub mod aggregate;
pub mod bootstrap;
pub mod engine;
pub mod retention;
pub mod stats;
pub mod store;
pub mod tracking;
pub mod window;

pub use engine::{compute_variant_stats, StatsEngine};
pub use store::{ExperimentStore, InMemoryStore, TimeWindow};
