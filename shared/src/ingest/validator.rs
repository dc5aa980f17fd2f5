//! Transport-level envelope validation.

use crate::models::LogEnvelope;
use crate::registry::IngestionCounters;
use serde::Serialize;
use thiserror::Error;

/// Reason an envelope was rejected before its content was parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Error)]
#[serde(rename_all = "snake_case")]
pub enum Rejection {
    /// The syslog tag does not match the expected tag.
    #[error("Ignoring syslog message with wrong tag")]
    WrongTag,

    /// The syslog header carries no hostname.
    #[error("Hostname missing in syslog message")]
    MissingHostname,

    /// The message has no content.
    #[error("Ignoring empty syslog message")]
    EmptyContent,
}

/// Checks envelopes before their content is handed to the parser.
///
/// Every envelope presented is counted as a received message. Rules are
/// checked in order and the first failing rule decides the rejection; each
/// rejection is counted as a failure.
#[derive(Clone)]
pub struct EnvelopeValidator {
    expected_tag: String,
    counters: IngestionCounters,
}

impl EnvelopeValidator {
    /// Creates a validator accepting envelopes tagged `expected_tag`.
    #[must_use]
    pub fn new(expected_tag: impl Into<String>, counters: IngestionCounters) -> Self {
        Self {
            expected_tag: expected_tag.into(),
            counters,
        }
    }

    /// Validates an envelope and returns its content.
    ///
    /// # Errors
    ///
    /// Returns a `Rejection` if, checked in this order:
    /// - The tag differs from the expected tag
    /// - The hostname is empty
    /// - The content is empty
    pub fn validate<'a>(&self, envelope: &'a LogEnvelope) -> Result<&'a str, Rejection> {
        // Counted before any rule runs so rejected envelopes show up as received.
        self.counters.record_message();

        let result = if envelope.tag != self.expected_tag {
            Err(Rejection::WrongTag)
        } else if envelope.hostname.is_empty() {
            Err(Rejection::MissingHostname)
        } else if envelope.content.is_empty() {
            Err(Rejection::EmptyContent)
        } else {
            Ok(envelope.content.as_str())
        };

        if result.is_err() {
            self.counters.record_failure();
        }
        result
    }

    /// Returns the expected tag.
    #[must_use]
    pub fn expected_tag(&self) -> &str {
        &self.expected_tag
    }
}
