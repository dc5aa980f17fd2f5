//! Ingestion loop task.
//!
//! The single consumer of the transport channel and the only writer of the
//! metric registry.

use serde::Serialize;
use shared::ingest::RecordProcessor;
use shared::models::LogEnvelope;
use tokio::sync::mpsc;

/// Totals reported when the ingestion loop finishes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestionReport {
    /// Envelopes taken off the channel.
    pub processed: usize,
    /// Measurements recorded into histograms.
    pub observations: usize,
    /// Envelopes dropped because they were rejected or failed to parse.
    pub failed_records: usize,
}

/// Processes envelopes until every sender is dropped and the channel is empty.
///
/// Per-record errors are logged by the processor and never stop the loop.
pub async fn run_ingestion(
    mut rx: mpsc::Receiver<LogEnvelope>,
    mut processor: RecordProcessor,
) -> IngestionReport {
    let mut report = IngestionReport::default();

    while let Some(envelope) = rx.recv().await {
        report.processed += 1;
        match processor.process(&envelope) {
            Ok(outcome) => report.observations += outcome.observed,
            Err(e) => {
                report.failed_records += 1;
                tracing::debug!(error = %e, "Dropped syslog message");
            }
        }
    }

    tracing::info!(
        processed = report.processed,
        observations = report.observations,
        failed = report.failed_records,
        "Ingestion loop finished"
    );
    report
}
