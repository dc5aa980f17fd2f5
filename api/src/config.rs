//! Server configuration module.
//!
//! Handles loading configuration from environment variables with sensible defaults.

use crate::transport::{normalize_address, SyslogAddress};
use anyhow::{bail, Context, Result};
use shared::config::{ConfigError, ExporterConfig, HistogramBuckets};
use std::str::FromStr;

/// Default address of the scrape endpoint.
pub const DEFAULT_LISTEN_ADDRESS: &str = ":9147";

/// Default path under which metrics are exposed.
pub const DEFAULT_METRICS_PATH: &str = "/metrics";

/// Exporter process configuration.
///
/// Configuration values can be set via environment variables:
/// - `NGINX_EXPORTER_LISTEN_ADDRESS`: address of the scrape endpoint (default: ":9147")
/// - `NGINX_EXPORTER_METRICS_PATH`: path of the metrics endpoint (default: "/metrics")
/// - `NGINX_EXPORTER_SYSLOG_ADDRESS`: UDP address or `unix:<path>` (default: ":9514")
/// - `NGINX_EXPORTER_BUCKETS`: comma-separated histogram buckets
/// - `NGINX_EXPORTER_NAMESPACE`: metric namespace (default: "`nginx_request`")
/// - `NGINX_EXPORTER_TAG`: syslog tag to accept (default: "nginx")
/// - `NGINX_EXPORTER_CHANNEL_CAPACITY`: transport channel capacity (default: 20000)
/// - `NGINX_EXPORTER_DRAIN_TIMEOUT_SECS`: shutdown drain timeout (default: 5)
#[derive(Debug, Clone)]
pub struct Config {
    /// Address the scrape endpoint listens on.
    pub listen_address: String,
    /// Path of the metrics endpoint.
    pub metrics_path: String,
    /// Address the syslog listener binds.
    pub syslog_address: SyslogAddress,
    /// Settings of the ingestion core.
    pub exporter: ExporterConfig,
}

impl Config {
    /// Creates a new configuration from environment variables.
    ///
    /// A `.env` file in the working directory is loaded first, if present.
    ///
    /// # Errors
    ///
    /// Returns an error if any variable is set to a value that cannot be
    /// parsed, or if the resulting configuration is invalid.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Same as [`Config::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(address) = lookup("NGINX_EXPORTER_LISTEN_ADDRESS") {
            config.listen_address = address;
        }
        if let Some(path) = lookup("NGINX_EXPORTER_METRICS_PATH") {
            config.metrics_path = path;
        }
        if let Some(address) = lookup("NGINX_EXPORTER_SYSLOG_ADDRESS") {
            config.syslog_address = address.parse()?;
        }
        if let Some(buckets) = lookup("NGINX_EXPORTER_BUCKETS") {
            config.exporter.buckets = buckets.parse::<HistogramBuckets>()?;
        }
        if let Some(namespace) = lookup("NGINX_EXPORTER_NAMESPACE") {
            config.exporter.namespace = namespace;
        }
        if let Some(tag) = lookup("NGINX_EXPORTER_TAG") {
            config.exporter.expected_tag = tag;
        }
        if let Some(capacity) = lookup("NGINX_EXPORTER_CHANNEL_CAPACITY") {
            config.exporter.channel_capacity =
                parse_value("NGINX_EXPORTER_CHANNEL_CAPACITY", &capacity)?;
        }
        if let Some(secs) = lookup("NGINX_EXPORTER_DRAIN_TIMEOUT_SECS") {
            config.exporter.drain_timeout_secs =
                parse_value("NGINX_EXPORTER_DRAIN_TIMEOUT_SECS", &secs)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Returns the `host:port` address of the scrape endpoint, with the
    /// `:port` shorthand expanded. Host names are left for bind time.
    ///
    /// # Errors
    ///
    /// Returns an error if the listen address is not a valid `host:port`
    /// pair or `:port` shorthand.
    pub fn bind_address(&self) -> Result<String> {
        normalize_address(&self.listen_address)
            .with_context(|| format!("Invalid listen address '{}'", self.listen_address))
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The listen address cannot be parsed
    /// - The metrics path does not start with `/` or collides with `/` or `/health`
    /// - The exporter settings are invalid
    pub fn validate(&self) -> Result<()> {
        self.bind_address()?;

        if !self.metrics_path.starts_with('/') {
            bail!("Metrics path '{}' must start with '/'", self.metrics_path);
        }
        if matches!(self.metrics_path.as_str(), "/" | "/health") {
            bail!("Metrics path '{}' is reserved", self.metrics_path);
        }

        self.exporter.validate_config()?;
        Ok(())
    }
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_address: DEFAULT_LISTEN_ADDRESS.to_string(),
            metrics_path: DEFAULT_METRICS_PATH.to_string(),
            syslog_address: SyslogAddress::default(),
            exporter: ExporterConfig::default(),
        }
    }
}
