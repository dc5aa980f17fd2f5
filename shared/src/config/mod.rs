//! Configuration module for the exporter core.
//!
//! This module contains the histogram bucket policy and the settings consumed
//! by the ingestion core.

pub mod buckets;
pub mod exporter;

pub use buckets::{BucketsError, HistogramBuckets, DEFAULT_BUCKETS};
pub use exporter::{
    ConfigError, ExporterConfig, DEFAULT_CHANNEL_CAPACITY, DEFAULT_DRAIN_TIMEOUT_SECS,
    DEFAULT_NAMESPACE, DEFAULT_TAG,
};
