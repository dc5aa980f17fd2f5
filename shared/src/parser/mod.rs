//! Parsers for the exporter's two input layers.
//!
//! - [`parse_rfc3164`] turns a syslog frame into a typed [`LogEnvelope`](crate::models::LogEnvelope)
//! - [`parse_content`] turns the envelope payload into measurements and labels
//!
//! # Example
//!
//! ```
//! use shared::parser::{parse_content, parse_rfc3164};
//!
//! let envelope = parse_rfc3164("<190>Feb 20 09:55:28 web-1 nginx: time:0.5 status=200").unwrap();
//! let record = parse_content(&envelope.content).unwrap();
//! assert_eq!(record.metrics.len(), 1);
//! assert_eq!(record.labels.get("status"), Some("200"));
//! ```

mod content;
mod syslog;

pub use content::{parse_content, ContentError};
pub use syslog::{parse_rfc3164, SyslogError, MAX_PRIORITY};
