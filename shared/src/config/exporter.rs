//! Core exporter configuration.
//!
//! Settings consumed by the ingestion core. They are supplied once at startup
//! and never change while the process runs.

use super::buckets::{BucketsError, HistogramBuckets};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use validator::{Validate, ValidationError};

/// Default metric namespace.
pub const DEFAULT_NAMESPACE: &str = "nginx_request";

/// Default syslog tag expected from nginx.
pub const DEFAULT_TAG: &str = "nginx";

/// Default capacity of the channel between the transport and the ingestion loop.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 20_000;

/// Default time allowed for draining buffered messages on shutdown.
pub const DEFAULT_DRAIN_TIMEOUT_SECS: u64 = 5;

/// Errors that can occur while building configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The bucket boundaries are invalid.
    #[error("Invalid histogram buckets: {0}")]
    Buckets(#[from] BucketsError),

    /// A value could not be parsed.
    #[error("Invalid value '{value}' for {key}")]
    InvalidValue {
        /// The setting or environment variable name.
        key: String,
        /// The rejected value.
        value: String,
    },

    /// Validation failed with details.
    #[error("Validation failed: {0}")]
    ValidationError(#[from] validator::ValidationErrors),
}

/// Configuration of the ingestion core.
///
/// # Example
///
/// ```
/// use shared::config::ExporterConfig;
///
/// let config = ExporterConfig::default().with_namespace("edge");
/// assert!(config.validate_config().is_ok());
/// assert_eq!(config.expected_tag, "nginx");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct ExporterConfig {
    /// Prefix of every exported metric name.
    #[validate(custom(function = "validate_identifier"))]
    pub namespace: String,

    /// Syslog tag an envelope must carry to be accepted.
    #[validate(length(min = 1, message = "Expected tag cannot be empty"))]
    pub expected_tag: String,

    /// Bucket boundaries shared by all histograms.
    pub buckets: HistogramBuckets,

    /// Capacity of the transport channel.
    #[validate(range(min = 1, message = "Channel capacity must be at least 1"))]
    pub channel_capacity: usize,

    /// Seconds allowed for draining buffered messages on shutdown.
    pub drain_timeout_secs: u64,
}

impl ExporterConfig {
    /// Sets the metric namespace.
    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Sets the expected syslog tag.
    #[must_use]
    pub fn with_expected_tag(mut self, tag: impl Into<String>) -> Self {
        self.expected_tag = tag.into();
        self
    }

    /// Sets the histogram buckets.
    #[must_use]
    pub fn with_buckets(mut self, buckets: HistogramBuckets) -> Self {
        self.buckets = buckets;
        self
    }

    /// Sets the transport channel capacity.
    #[must_use]
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }

    /// Sets the drain timeout in seconds.
    #[must_use]
    pub fn with_drain_timeout_secs(mut self, secs: u64) -> Self {
        self.drain_timeout_secs = secs;
        self
    }

    /// Returns the drain timeout as a `Duration`.
    #[must_use]
    pub fn drain_timeout(&self) -> Duration {
        Duration::from_secs(self.drain_timeout_secs)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The namespace is not a valid metric name prefix
    /// - The expected tag is empty
    /// - The channel capacity is zero
    pub fn validate_config(&self) -> Result<(), ConfigError> {
        self.validate()?;
        Ok(())
    }
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            expected_tag: DEFAULT_TAG.to_string(),
            buckets: HistogramBuckets::default(),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            drain_timeout_secs: DEFAULT_DRAIN_TIMEOUT_SECS,
        }
    }
}

fn validate_identifier(value: &str) -> Result<(), ValidationError> {
    let mut chars = value.chars();
    let valid_start = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    if valid_start && chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_namespace")
            .with_message("Namespace must match [a-zA-Z_][a-zA-Z0-9_]*".into()))
    }
}
