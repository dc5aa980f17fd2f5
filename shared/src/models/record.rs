//! Parsed access-log record model.
//!
//! A record is what the content parser makes out of one log line: the numeric
//! measurements (`key:value` tokens) and the label dimensions (`key=value`
//! tokens) that apply to every measurement of that line.

use serde::{Deserialize, Serialize};

/// One numeric measurement extracted from a log line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedMetric {
    /// The metric name, without the exporter namespace.
    pub name: String,
    /// The observed value.
    pub value: f64,
}

impl ParsedMetric {
    /// Creates a new parsed metric.
    #[must_use]
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// A single label name/value pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    /// The label name.
    pub name: String,
    /// The label value, with surrounding quotes already stripped.
    pub value: String,
}

/// Ordered set of labels extracted from one log line.
///
/// Insertion order is preserved and is the order used for the label schema
/// when a collector is created. Inserting a name that is already present
/// replaces its value and keeps the original position.
///
/// # Example
///
/// ```
/// use shared::models::LabelSet;
///
/// let mut labels = LabelSet::new();
/// labels.insert("status", "200");
/// labels.insert("method", "GET");
/// labels.insert("status", "404");
///
/// assert_eq!(labels.names().collect::<Vec<_>>(), vec!["status", "method"]);
/// assert_eq!(labels.get("status"), Some("404"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelSet {
    labels: Vec<Label>,
}

impl LabelSet {
    /// Creates an empty label set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a label, overwriting the value of an existing label in place.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.labels.iter_mut().find(|l| l.name == name) {
            Some(existing) => existing.value = value,
            None => self.labels.push(Label { name, value }),
        }
    }

    /// Adds a label, builder style.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    /// Returns the value of the label with the given name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.labels
            .iter()
            .find(|l| l.name == name)
            .map(|l| l.value.as_str())
    }

    /// Returns the label names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(|l| l.name.as_str())
    }

    /// Returns the labels in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Label> {
        self.labels.iter()
    }

    /// Returns the number of labels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Returns true if the set holds no labels.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// The result of parsing one log line.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedRecord {
    /// Measurements in encounter order.
    pub metrics: Vec<ParsedMetric>,
    /// Labels shared by every measurement of the record.
    pub labels: LabelSet,
}

impl ParsedRecord {
    /// Adds a measurement, replacing the value of an earlier one with the same name.
    pub fn push_metric(&mut self, name: impl Into<String>, value: f64) {
        let name = name.into();
        match self.metrics.iter_mut().find(|m| m.name == name) {
            Some(existing) => existing.value = value,
            None => self.metrics.push(ParsedMetric { name, value }),
        }
    }

    /// Returns true if the record carries no measurement.
    #[must_use]
    pub fn has_metrics(&self) -> bool {
        !self.metrics.is_empty()
    }
}
