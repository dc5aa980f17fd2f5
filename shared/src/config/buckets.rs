//! Histogram bucket boundaries.
//!
//! One set of boundaries is shared by every histogram the exporter creates.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// Default bucket boundaries, in seconds.
pub const DEFAULT_BUCKETS: [f64; 11] = [0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];

/// Errors that can occur while building bucket boundaries.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BucketsError {
    /// No boundary was given.
    #[error("At least one histogram bucket is required")]
    Empty,

    /// A boundary is not a number.
    #[error("Invalid histogram bucket: '{0}'")]
    InvalidNumber(String),

    /// A boundary is negative, infinite or NaN.
    #[error("Histogram bucket must be a finite non-negative number, got {0}")]
    OutOfRange(f64),

    /// Boundaries are not strictly increasing.
    #[error("Histogram buckets must be strictly increasing ({previous} is followed by {next})")]
    NotIncreasing {
        /// The earlier boundary.
        previous: f64,
        /// The boundary that does not exceed it.
        next: f64,
    },
}

/// Validated, strictly increasing histogram bucket boundaries.
///
/// # Example
///
/// ```
/// use shared::config::HistogramBuckets;
///
/// let buckets: HistogramBuckets = ".1, .5, 1, 5".parse().unwrap();
/// assert_eq!(buckets.as_slice(), &[0.1, 0.5, 1.0, 5.0]);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct HistogramBuckets(Vec<f64>);

impl HistogramBuckets {
    /// Creates bucket boundaries from a list of upper bounds.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The list is empty
    /// - A bound is negative or not finite
    /// - The bounds are not strictly increasing
    pub fn new(bounds: Vec<f64>) -> Result<Self, BucketsError> {
        if bounds.is_empty() {
            return Err(BucketsError::Empty);
        }
        if let Some(&bad) = bounds.iter().find(|b| !b.is_finite() || **b < 0.0) {
            return Err(BucketsError::OutOfRange(bad));
        }
        if let Some(pair) = bounds.windows(2).find(|w| w[1] <= w[0]) {
            return Err(BucketsError::NotIncreasing {
                previous: pair[0],
                next: pair[1],
            });
        }
        Ok(Self(bounds))
    }

    /// Returns the boundaries as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// Returns an owned copy of the boundaries.
    #[must_use]
    pub fn to_vec(&self) -> Vec<f64> {
        self.0.clone()
    }
}

impl Default for HistogramBuckets {
    fn default() -> Self {
        Self(DEFAULT_BUCKETS.to_vec())
    }
}

impl FromStr for HistogramBuckets {
    type Err = BucketsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bounds = s
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(|item| {
                item.parse::<f64>()
                    .map_err(|_| BucketsError::InvalidNumber(item.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(bounds)
    }
}

impl TryFrom<Vec<f64>> for HistogramBuckets {
    type Error = BucketsError;

    fn try_from(bounds: Vec<f64>) -> Result<Self, Self::Error> {
        Self::new(bounds)
    }
}

impl From<HistogramBuckets> for Vec<f64> {
    fn from(buckets: HistogramBuckets) -> Self {
        buckets.0
    }
}

impl std::fmt::Display for HistogramBuckets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let joined = self
            .0
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");
        write!(f, "{joined}")
    }
}
