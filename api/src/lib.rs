//! Nginx Request Exporter Server
//!
//! This crate runs the exporter process: it receives nginx access-log records
//! over syslog, turns their numeric fields into Prometheus histograms and
//! serves them to scrapers.
//!
//! # Architecture
//!
//! Three Tokio tasks cooperate:
//! - The syslog listener decodes datagrams into envelopes and pushes them
//!   into a bounded channel
//! - The ingestion loop is the only consumer of that channel and the only
//!   writer of the metric registry
//! - The Axum server gathers the registry on every scrape
//!
//! # Example
//!
//! ```no_run
//! use api::run_server;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     run_server().await
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod config;
pub mod ingest;
mod routes;
mod state;
pub mod transport;

pub use config::{Config, DEFAULT_LISTEN_ADDRESS, DEFAULT_METRICS_PATH};
pub use ingest::{run_ingestion, IngestionReport};
pub use state::AppState;
pub use transport::{SyslogAddress, SyslogListener};

use anyhow::{anyhow, Context, Result};
use axum::Router;
use prometheus::Registry;
use serde::Serialize;
use shared::ingest::{EnvelopeValidator, IngestionLifecycle, IngestionState, RecordProcessor};
use shared::registry::{IngestionCounters, MetricRegistry};
use std::future::Future;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot, watch};
use tower_http::trace::TraceLayer;
use transport::resolve_address;

/// Totals reported when the exporter shuts down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ExporterReport {
    /// Value of the messages-received counter.
    pub messages_received: u64,
    /// Value of the parse-failure counter.
    pub parse_failures: u64,
    /// Ingestion loop totals, or `None` if the loop was aborted.
    pub ingestion: Option<IngestionReport>,
}

/// An exporter whose sockets are bound but whose tasks are not started yet.
///
/// Splitting binding from serving lets callers learn the actual local
/// addresses (for example after binding port 0) before traffic flows.
pub struct Exporter {
    config: Config,
    state: AppState,
    lifecycle: IngestionLifecycle,
    listener: SyslogListener,
    http: TcpListener,
    processor: RecordProcessor,
}

impl Exporter {
    /// Builds the ingestion components and binds both sockets.
    ///
    /// On success the ingestion lifecycle is `Listening`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The configuration is invalid
    /// - The process counters cannot be registered
    /// - The scrape endpoint or the syslog listener fails to bind
    pub async fn bind(config: Config) -> Result<Self> {
        config.validate()?;

        let lifecycle = IngestionLifecycle::new();
        let registry = Registry::new();
        let counters = IngestionCounters::register(&registry, &config.exporter.namespace)
            .context("Failed to register exporter counters")?;
        let validator = EnvelopeValidator::new(&config.exporter.expected_tag, counters.clone());
        let metrics = MetricRegistry::new(registry.clone(), &config.exporter, counters.clone());
        let processor = RecordProcessor::new(validator, metrics);

        let addr = config.bind_address()?;
        let bound = match resolve_address(&addr).await {
            Ok(resolved) => TcpListener::bind(resolved).await,
            Err(e) => Err(e),
        };
        let http = match bound {
            Ok(http) => http,
            Err(e) => {
                lifecycle.advance(IngestionState::Stopped)?;
                return Err(
                    anyhow::Error::new(e).context(format!("Failed to bind scrape endpoint on {addr}"))
                );
            }
        };

        let listener = match SyslogListener::bind(&config.syslog_address, counters).await {
            Ok(listener) => listener,
            Err(e) => {
                lifecycle.advance(IngestionState::Stopped)?;
                return Err(e.into());
            }
        };
        lifecycle.advance(IngestionState::Listening)?;

        let state = AppState::new(registry, lifecycle.subscribe(), config.metrics_path.clone());

        Ok(Self {
            config,
            state,
            lifecycle,
            listener,
            http,
            processor,
        })
    }

    /// Returns the state served to HTTP handlers.
    #[must_use]
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Returns the bound UDP address of the syslog listener, if it is a UDP socket.
    #[must_use]
    pub fn syslog_local_addr(&self) -> Option<SocketAddr> {
        self.listener.local_addr()
    }

    /// Returns the bound address of the scrape endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket address cannot be read.
    pub fn http_local_addr(&self) -> Result<SocketAddr> {
        Ok(self.http.local_addr()?)
    }

    /// Runs the exporter until `shutdown` resolves, then drains.
    ///
    /// On shutdown the listener stops reading and drops its sender, and the
    /// ingestion loop keeps consuming until the channel is empty or the drain
    /// timeout elapses, in which case both tasks are aborted. The scrape
    /// endpoint stays up until ingestion has stopped.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP server fails, or if a lifecycle
    /// transition is rejected.
    pub async fn serve(self, shutdown: impl Future<Output = ()>) -> Result<ExporterReport> {
        let Self {
            config,
            state,
            lifecycle,
            listener,
            http,
            processor,
        } = self;
        let counters = processor.registry().counters().clone();
        let drain_timeout = config.exporter.drain_timeout();

        let (tx, rx) = mpsc::channel(config.exporter.channel_capacity);
        let (stop_tx, stop_rx) = watch::channel(false);

        let mut ingestion = tokio::spawn(run_ingestion(rx, processor));
        let mut transport = tokio::spawn(listener.run(tx, stop_rx));
        lifecycle.advance(IngestionState::Running)?;

        let (http_stop_tx, http_stop_rx) = oneshot::channel::<()>();
        let app = create_router(state);
        tracing::info!(
            address = %config.listen_address,
            metrics_path = %config.metrics_path,
            "Starting server"
        );
        let mut server = tokio::spawn(async move {
            axum::serve(http, app)
                .with_graceful_shutdown(async {
                    http_stop_rx.await.ok();
                })
                .await
        });

        let server_exited = tokio::select! {
            () = shutdown => None,
            result = &mut server => Some(result),
        };

        lifecycle.advance(IngestionState::Draining)?;
        stop_tx.send(true).ok();

        let drained = tokio::time::timeout(drain_timeout, async {
            if let Err(e) = (&mut transport).await {
                tracing::error!(error = %e, "Syslog listener task failed");
            }
            (&mut ingestion).await
        })
        .await;

        let ingestion_report = match drained {
            Ok(Ok(report)) => Some(report),
            Ok(Err(e)) => {
                tracing::error!(error = %e, "Ingestion task failed");
                None
            }
            Err(_) => {
                tracing::warn!(
                    timeout_secs = drain_timeout.as_secs(),
                    "Drain timeout elapsed, aborting ingestion"
                );
                transport.abort();
                ingestion.abort();
                None
            }
        };

        lifecycle.advance(IngestionState::Stopped)?;
        tracing::info!(messages = counters.messages(), "Messages received");

        let report = ExporterReport {
            messages_received: counters.messages(),
            parse_failures: counters.failures(),
            ingestion: ingestion_report,
        };

        match server_exited {
            Some(result) => {
                result.context("HTTP server task failed")??;
                Err(anyhow!("HTTP server exited unexpectedly"))
            }
            None => {
                http_stop_tx.send(()).ok();
                server.await.context("HTTP server task failed")??;
                tracing::info!("Server shutdown complete");
                Ok(report)
            }
        }
    }
}

/// Runs the exporter.
///
/// This function initializes the exporter with configuration from environment
/// variables and runs it until SIGTERM/SIGINT, then drains and shuts down.
///
/// # Errors
///
/// Returns an error if:
/// - Configuration cannot be loaded from environment
/// - A socket fails to bind
/// - A fatal error occurs during operation
pub async fn run_server() -> Result<()> {
    let config = Config::from_env()?;
    run_server_with_config(config).await
}

/// Runs the exporter with the provided configuration.
///
/// This is useful for testing or when you want to provide configuration programmatically.
///
/// # Errors
///
/// Returns an error if:
/// - A socket fails to bind
/// - A fatal error occurs during operation
pub async fn run_server_with_config(config: Config) -> Result<()> {
    tracing::info!(
        listen_address = %config.listen_address,
        syslog_address = %config.syslog_address,
        namespace = %config.exporter.namespace,
        buckets = %config.exporter.buckets,
        "Nginx request exporter starting"
    );

    let exporter = Exporter::bind(config).await?;
    let report = exporter.serve(shutdown_signal()).await?;

    tracing::info!(
        messages = report.messages_received,
        failures = report.parse_failures,
        "Exporter stopped"
    );
    Ok(())
}

/// Creates the main application router with all routes and middleware.
///
/// This function is public to allow testing the router without starting a full server.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(routes::index_routes(state.clone()))
        .merge(routes::health_routes(state.clone()))
        .merge(routes::metrics_routes(state))
        .layer(TraceLayer::new_for_http())
}

/// Waits for a shutdown signal (SIGTERM or SIGINT).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
