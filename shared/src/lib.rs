//! nginx request exporter core library
//!
//! This crate contains the parsing and metric-registration engine of the
//! exporter: it turns syslog frames carrying nginx access-log lines into
//! observations on dynamically created Prometheus histograms.
//!
//! # Modules
//!
//! - [`models`] - Transport envelope and parsed record types
//! - [`parser`] - Syslog frame and log payload parsers
//! - [`registry`] - Dynamic histogram registry and ingestion counters
//! - [`ingest`] - Envelope validation, per-record processing and lifecycle
//! - [`config`] - Bucket boundaries and core settings
//!
//! # Example
//!
//! ```
//! use prometheus::Registry;
//! use shared::config::ExporterConfig;
//! use shared::ingest::{EnvelopeValidator, RecordProcessor};
//! use shared::models::LogEnvelope;
//! use shared::registry::{IngestionCounters, MetricRegistry};
//!
//! let prometheus = Registry::new();
//! let config = ExporterConfig::default();
//! let counters = IngestionCounters::register(&prometheus, &config.namespace).unwrap();
//! let validator = EnvelopeValidator::new(&config.expected_tag, counters.clone());
//! let mut processor = RecordProcessor::new(
//!     validator,
//!     MetricRegistry::new(prometheus, &config, counters),
//! );
//!
//! let envelope = LogEnvelope::new("nginx", "web-1", "time:0.5 status=200");
//! let outcome = processor.process(&envelope).unwrap();
//! assert_eq!(outcome.observed, 1);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod ingest;
pub mod models;
pub mod parser;
pub mod registry;

/// Re-export common dependencies for convenience.
pub use chrono;
pub use prometheus;
pub use serde;
pub use serde_json;
