//! Metric registration for parsed access-log records.
//!
//! - [`MetricRegistry`] creates one histogram per metric name on first sight
//! - [`IngestionCounters`] counts received messages and failures

pub mod counters;
pub mod metric_registry;

pub use counters::IngestionCounters;
pub use metric_registry::{MetricRegistry, ObserveError};
