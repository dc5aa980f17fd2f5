//! Dynamic histogram registry.
//!
//! Maps metric names seen in access logs onto Prometheus histograms. A
//! histogram is created the first time its name is observed, using the label
//! names of that record as its fixed schema, and reused for every later
//! record whose label-name set matches.

use super::counters::IngestionCounters;
use crate::config::{ExporterConfig, HistogramBuckets};
use crate::models::LabelSet;
use prometheus::{HistogramOpts, HistogramVec, Registry};
use std::collections::HashMap;
use thiserror::Error;

/// Errors that can occur while recording an observation.
#[derive(Debug, Error)]
pub enum ObserveError {
    /// The metric exists with a different label-name set.
    #[error("Label schema conflict for metric '{name}': registered with {expected:?}, got {found:?}")]
    SchemaConflict {
        /// The metric name.
        name: String,
        /// Label names the histogram was created with.
        expected: Vec<String>,
        /// Label names carried by the rejected record.
        found: Vec<String>,
    },

    /// The histogram could not be built or registered.
    #[error("Failed to register histogram '{name}': {source}")]
    Registration {
        /// The metric name.
        name: String,
        /// The underlying Prometheus error.
        #[source]
        source: prometheus::Error,
    },

    /// The histogram rejected the label values.
    #[error("Failed to observe histogram '{name}': {source}")]
    Observation {
        /// The metric name.
        name: String,
        /// The underlying Prometheus error.
        #[source]
        source: prometheus::Error,
    },
}

/// Label names a histogram cannot carry: `le` is its bucket label and `__`
/// prefixes are reserved by Prometheus.
fn is_reserved_label(name: &str) -> bool {
    name == "le" || name.starts_with("__")
}

/// A registered histogram and its fixed label schema.
struct Collector {
    histogram: HistogramVec,
    label_names: Vec<String>,
}

impl Collector {
    /// Returns the label values in schema order, or `None` if the label-name
    /// set of `labels` differs from the schema.
    fn values_for<'a>(&self, labels: &'a LabelSet) -> Option<Vec<&'a str>> {
        if labels.len() != self.label_names.len() {
            return None;
        }
        self.label_names
            .iter()
            .map(|name| labels.get(name))
            .collect()
    }
}

/// Registry of dynamically created histograms.
///
/// The registry is owned by the ingestion loop, which is its only writer;
/// `observe` takes `&mut self` so that single-writer discipline is enforced by
/// the borrow checker. Scrapes read through the shared
/// [`prometheus::Registry`] handle returned by [`MetricRegistry::prometheus`].
///
/// # Example
///
/// ```
/// use prometheus::Registry;
/// use shared::config::ExporterConfig;
/// use shared::models::LabelSet;
/// use shared::registry::{IngestionCounters, MetricRegistry};
///
/// let prometheus = Registry::new();
/// let config = ExporterConfig::default();
/// let counters = IngestionCounters::register(&prometheus, &config.namespace).unwrap();
/// let mut registry = MetricRegistry::new(prometheus, &config, counters);
///
/// let labels = LabelSet::new().with("status", "200");
/// registry.observe("time", 0.5, &labels).unwrap();
/// registry.observe("time", 1.2, &labels).unwrap();
///
/// assert_eq!(registry.len(), 1);
/// assert_eq!(registry.sample_count("time", &labels), Some(2));
/// ```
pub struct MetricRegistry {
    registry: Registry,
    namespace: String,
    buckets: HistogramBuckets,
    collectors: HashMap<String, Collector>,
    counters: IngestionCounters,
}

impl MetricRegistry {
    /// Creates an empty registry that registers histograms into `registry`.
    #[must_use]
    pub fn new(registry: Registry, config: &ExporterConfig, counters: IngestionCounters) -> Self {
        Self {
            registry,
            namespace: config.namespace.clone(),
            buckets: config.buckets.clone(),
            collectors: HashMap::new(),
            counters,
        }
    }

    /// Records one observation for metric `name` with the given labels.
    ///
    /// An unseen name creates and registers a histogram whose schema is the
    /// label names of `labels` in their insertion order. A seen name requires
    /// the same label-name set; order may differ and is translated to the
    /// stored schema order.
    ///
    /// Every error is logged and counted as an ingestion failure; the
    /// existing histograms are never modified by a failed call.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The label-name set differs from the registered schema
    /// - The histogram cannot be created or registered (invalid name, name
    ///   already taken by another collector)
    /// - The histogram rejects the label values
    pub fn observe(&mut self, name: &str, value: f64, labels: &LabelSet) -> Result<(), ObserveError> {
        let result = self.try_observe(name, value, labels);
        if let Err(ref e) = result {
            self.counters.record_failure();
            match e {
                ObserveError::SchemaConflict { .. } => {
                    tracing::warn!(metric = name, error = %e, "Dropping observation");
                }
                ObserveError::Registration { .. } | ObserveError::Observation { .. } => {
                    tracing::error!(metric = name, error = %e, "Skipping observation");
                }
            }
        }
        result
    }

    fn try_observe(&mut self, name: &str, value: f64, labels: &LabelSet) -> Result<(), ObserveError> {
        if !self.collectors.contains_key(name) {
            let collector = self.register(name, labels)?;
            self.collectors.insert(name.to_string(), collector);
        }

        let collector = &self.collectors[name];
        let values = collector
            .values_for(labels)
            .ok_or_else(|| ObserveError::SchemaConflict {
                name: name.to_string(),
                expected: collector.label_names.clone(),
                found: labels.names().map(str::to_string).collect(),
            })?;

        let histogram = collector
            .histogram
            .get_metric_with_label_values(&values)
            .map_err(|source| ObserveError::Observation {
                name: name.to_string(),
                source,
            })?;
        histogram.observe(value);
        Ok(())
    }

    fn register(&self, name: &str, labels: &LabelSet) -> Result<Collector, ObserveError> {
        let label_names: Vec<String> = labels.names().map(str::to_string).collect();
        let label_refs: Vec<&str> = label_names.iter().map(String::as_str).collect();

        let opts = HistogramOpts::new(name, format!("Nginx request log value for {name}"))
            .namespace(self.namespace.as_str())
            .buckets(self.buckets.to_vec());

        let registration_error = |source| ObserveError::Registration {
            name: name.to_string(),
            source,
        };
        if let Some(label) = label_names.iter().find(|l| is_reserved_label(l)) {
            return Err(registration_error(prometheus::Error::Msg(format!(
                "`{label}` is not allowed as label name in histograms"
            ))));
        }
        let histogram = HistogramVec::new(opts, &label_refs).map_err(registration_error)?;
        self.registry
            .register(Box::new(histogram.clone()))
            .map_err(registration_error)?;

        tracing::info!(
            metric = %format!("{}_{name}", self.namespace),
            labels = ?label_names,
            "Registered histogram"
        );

        Ok(Collector {
            histogram,
            label_names,
        })
    }

    /// Returns the number of registered histograms.
    #[must_use]
    pub fn len(&self) -> usize {
        self.collectors.len()
    }

    /// Returns true if no histogram has been registered yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.collectors.is_empty()
    }

    /// Returns true if a histogram exists for `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.collectors.contains_key(name)
    }

    /// Returns the label schema of the histogram for `name`.
    #[must_use]
    pub fn label_names(&self, name: &str) -> Option<&[String]> {
        self.collectors.get(name).map(|c| c.label_names.as_slice())
    }

    /// Returns how many observations the histogram for `name` holds for `labels`.
    #[must_use]
    pub fn sample_count(&self, name: &str, labels: &LabelSet) -> Option<u64> {
        self.series(name, labels).map(|h| h.get_sample_count())
    }

    /// Returns the sum of observations the histogram for `name` holds for `labels`.
    #[must_use]
    pub fn sample_sum(&self, name: &str, labels: &LabelSet) -> Option<f64> {
        self.series(name, labels).map(|h| h.get_sample_sum())
    }

    fn series(&self, name: &str, labels: &LabelSet) -> Option<prometheus::Histogram> {
        let collector = self.collectors.get(name)?;
        let values = collector.values_for(labels)?;
        collector.histogram.get_metric_with_label_values(&values).ok()
    }

    /// Returns the Prometheus registry the histograms are registered in.
    #[must_use]
    pub fn prometheus(&self) -> &Registry {
        &self.registry
    }

    /// Returns the ingestion counters shared with this registry.
    #[must_use]
    pub fn counters(&self) -> &IngestionCounters {
        &self.counters
    }
}
