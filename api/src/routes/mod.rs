//! HTTP route definitions.
//!
//! This module organizes the scrape, health and landing page routes of the exporter.

mod health;
mod index;
mod metrics;

pub use health::health_routes;
pub use index::index_routes;
pub use metrics::metrics_routes;
