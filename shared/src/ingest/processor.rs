//! Per-record processing: validate, parse, observe.

use super::validator::{EnvelopeValidator, Rejection};
use crate::models::LogEnvelope;
use crate::parser::{parse_content, ContentError};
use crate::registry::MetricRegistry;
use thiserror::Error;

/// Errors that drop a whole record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    /// The envelope failed validation.
    #[error("Envelope rejected: {0}")]
    Rejected(#[from] Rejection),

    /// The content could not be parsed.
    #[error("Failed to parse content: {0}")]
    Content(#[from] ContentError),
}

/// What happened to the measurements of one accepted record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordOutcome {
    /// Measurements recorded into a histogram.
    pub observed: usize,
    /// Measurements dropped by the registry (schema conflict, registration failure).
    pub skipped: usize,
}

/// Runs one envelope through validation, parsing and registration.
///
/// Every step is synchronous. Failures are logged and counted here or by the
/// component that detected them; none of them is fatal.
pub struct RecordProcessor {
    validator: EnvelopeValidator,
    registry: MetricRegistry,
}

impl RecordProcessor {
    /// Creates a processor from its two stages.
    #[must_use]
    pub fn new(validator: EnvelopeValidator, registry: MetricRegistry) -> Self {
        Self {
            validator,
            registry,
        }
    }

    /// Processes one envelope.
    ///
    /// A record without measurements is accepted and observes nothing.
    ///
    /// # Errors
    ///
    /// Returns an error if the envelope is rejected or its content cannot be
    /// parsed. Per-measurement registry errors do not fail the record; they are
    /// reported in `RecordOutcome::skipped`.
    pub fn process(&mut self, envelope: &LogEnvelope) -> Result<RecordOutcome, RecordError> {
        tracing::debug!(
            tag = %envelope.tag,
            hostname = %envelope.hostname,
            content = %envelope.content,
            "Received syslog message"
        );

        let content = match self.validator.validate(envelope) {
            Ok(content) => content,
            Err(rejection) => {
                tracing::warn!(
                    tag = %envelope.tag,
                    hostname = %envelope.hostname,
                    reason = %rejection,
                    "Rejected syslog message"
                );
                return Err(rejection.into());
            }
        };

        let record = match parse_content(content) {
            Ok(record) => record,
            Err(e) => {
                self.registry.counters().record_failure();
                tracing::warn!(
                    hostname = %envelope.hostname,
                    content = %content,
                    error = %e,
                    "Failed to parse syslog message"
                );
                return Err(e.into());
            }
        };

        let mut outcome = RecordOutcome::default();
        for metric in &record.metrics {
            match self
                .registry
                .observe(&metric.name, metric.value, &record.labels)
            {
                Ok(()) => outcome.observed += 1,
                Err(_) => outcome.skipped += 1,
            }
        }

        tracing::debug!(
            metrics = record.metrics.len(),
            labels = record.labels.len(),
            observed = outcome.observed,
            "Processed syslog message"
        );
        Ok(outcome)
    }

    /// Returns the metric registry.
    #[must_use]
    pub fn registry(&self) -> &MetricRegistry {
        &self.registry
    }
}
