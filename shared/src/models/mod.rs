//! Data models for the exporter.
//!
//! This module contains the transport envelope and the parsed record types.

pub mod envelope;
pub mod record;

pub use envelope::LogEnvelope;
pub use record::{Label, LabelSet, ParsedMetric, ParsedRecord};
