//! Application state module.
//!
//! Defines the shared application state that is passed to route handlers.

use prometheus::Registry;
use shared::ingest::IngestionState;
use tokio::sync::watch;

use crate::config::DEFAULT_METRICS_PATH;

/// Application state shared across all request handlers.
///
/// Handlers only read: the registry is gathered on scrape and the ingestion
/// state is observed through a watch receiver. The ingestion loop is the only
/// writer of either.
#[derive(Clone)]
pub struct AppState {
    /// Registry gathered on every scrape.
    registry: Registry,
    /// Current state of the ingestion subsystem.
    ingestion: watch::Receiver<IngestionState>,
    /// Path of the metrics endpoint.
    metrics_path: String,
}

impl AppState {
    /// Creates a new application state.
    pub fn new(
        registry: Registry,
        ingestion: watch::Receiver<IngestionState>,
        metrics_path: impl Into<String>,
    ) -> Self {
        Self {
            registry,
            ingestion,
            metrics_path: metrics_path.into(),
        }
    }

    /// Creates a state around `registry` with a fixed `Running` ingestion
    /// state and the default metrics path.
    ///
    /// This is useful for testing the routes without a live ingestion loop.
    #[must_use]
    pub fn with_registry(registry: Registry) -> Self {
        let (_, ingestion) = watch::channel(IngestionState::Running);
        Self::new(registry, ingestion, DEFAULT_METRICS_PATH)
    }

    /// Returns the Prometheus registry.
    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Returns the current ingestion state.
    #[must_use]
    pub fn ingestion_state(&self) -> IngestionState {
        *self.ingestion.borrow()
    }

    /// Returns the path of the metrics endpoint.
    #[must_use]
    pub fn metrics_path(&self) -> &str {
        &self.metrics_path
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::with_registry(Registry::new())
    }
}
