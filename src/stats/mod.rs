//! Fleet statistics

pub mod metrics;

pub use metrics::{FleetCounters, FleetStats};
