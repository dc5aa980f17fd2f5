//! Common test utilities and helpers for integration tests.
//!
//! This module provides shared functionality used across all integration tests,
//! including test app setup, HTTP request helpers and a running exporter.

use anyhow::Result;
use api::{create_router, AppState, Config, Exporter, ExporterReport, SyslogAddress};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use prometheus::Registry;
use serde_json::Value;
use shared::config::ExporterConfig;
use shared::ingest::{EnvelopeValidator, RecordProcessor};
use shared::registry::{IngestionCounters, MetricRegistry};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, UdpSocket};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Creates a test router over a fresh registry.
///
/// # Returns
///
/// A tuple containing the configured router and the app state.
pub fn test_app() -> (Router, AppState) {
    let state = AppState::with_registry(Registry::new());
    let router = create_router(state.clone());
    (router, state)
}

/// Creates a record processor writing into `registry` with default settings.
pub fn test_processor(registry: &Registry) -> RecordProcessor {
    let config = ExporterConfig::default();
    let counters = IngestionCounters::register(registry, &config.namespace).unwrap();
    let validator = EnvelopeValidator::new(&config.expected_tag, counters.clone());
    RecordProcessor::new(
        validator,
        MetricRegistry::new(registry.clone(), &config, counters),
    )
}

/// Helper to make a GET request and parse a JSON body.
///
/// # Returns
///
/// A tuple containing the response status code and parsed JSON response body.
pub async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    let (status, body) = get_text(app, uri).await;
    let json: Value = serde_json::from_str(&body).unwrap_or(Value::Null);

    (status, json)
}

/// Helper to make a GET request and return the body as text.
pub async fn get_text(app: Router, uri: &str) -> (StatusCode, String) {
    let response = tower::ServiceExt::oneshot(
        app,
        Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    )
    .await
    .unwrap();

    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();

    (status, String::from_utf8(body_bytes.to_vec()).unwrap())
}

/// A running exporter bound to loopback ports.
pub struct RunningExporter {
    /// State shared with the exporter's HTTP handlers.
    pub state: AppState,
    /// Address of the syslog UDP socket.
    pub syslog_addr: SocketAddr,
    /// Address of the scrape endpoint.
    pub http_addr: SocketAddr,
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<Result<ExporterReport>>,
}

impl RunningExporter {
    /// Returns a router over the exporter's state.
    pub fn router(&self) -> Router {
        create_router(self.state.clone())
    }

    /// Triggers shutdown and waits for the exporter to drain.
    pub async fn stop(self) -> ExporterReport {
        self.shutdown.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(10), self.handle)
            .await
            .expect("exporter did not stop in time")
            .unwrap()
            .unwrap()
    }
}

/// Binds an exporter on loopback ports and starts serving it.
pub async fn start_exporter(exporter: ExporterConfig) -> RunningExporter {
    let config = Config {
        listen_address: "127.0.0.1:0".to_string(),
        syslog_address: SyslogAddress::Udp("127.0.0.1:0".to_string()),
        exporter,
        ..Config::default()
    };

    let exporter = Exporter::bind(config).await.unwrap();
    let state = exporter.state().clone();
    let syslog_addr = exporter.syslog_local_addr().unwrap();
    let http_addr = exporter.http_local_addr().unwrap();

    let (shutdown, stop) = oneshot::channel::<()>();
    let handle = tokio::spawn(exporter.serve(async {
        stop.await.ok();
    }));

    RunningExporter {
        state,
        syslog_addr,
        http_addr,
        shutdown,
        handle,
    }
}

/// Sends one syslog line per datagram to `target`.
pub async fn send_syslog(target: SocketAddr, lines: &[&str]) {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    for line in lines {
        socket.send_to(line.as_bytes(), target).await.unwrap();
    }
}

/// Sends a raw HTTP/1.1 GET over TCP and returns the whole response.
pub async fn http_get(addr: SocketAddr, path: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = format!("GET {path} HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n");
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut response = Vec::new();
    tokio::time::timeout(Duration::from_secs(5), stream.read_to_end(&mut response))
        .await
        .expect("scrape endpoint did not answer in time")
        .unwrap();
    String::from_utf8(response).unwrap()
}

/// Formats an RFC 3164 line the way nginx sends access-log records.
pub fn nginx_line(hostname: &str, tag: &str, content: &str) -> String {
    format!("<190>Feb 20 09:55:28 {hostname} {tag}: {content}")
}

/// Scrapes `/metrics` until `needle` shows up or five seconds pass.
pub async fn wait_for_metric(app: &Router, needle: &str) -> String {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let (status, body) = get_text(app.clone(), "/metrics").await;
        assert_eq!(status, StatusCode::OK);
        if body.contains(needle) {
            return body;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "metric '{needle}' not exposed, last scrape:\n{body}"
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}
