//! Integration tests for health check and general server functionality.
//!
//! Tests cover:
//! - Health check endpoint
//! - Landing page
//! - Empty registry behavior
//! - The scrape endpoint over a real TCP connection

use axum::http::StatusCode;
use shared::config::ExporterConfig;

use super::common::{get, get_text, http_get, start_exporter, test_app};

#[tokio::test]
async fn test_health_check() {
    let (app, _state) = test_app();

    let (status, response) = get(app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["status"], "healthy");
    assert_eq!(response["service"], "nginx-request-exporter");
}

#[tokio::test]
async fn test_empty_registry_scrapes_empty() {
    let (app, _state) = test_app();

    let (status, body) = get_text(app, "/metrics").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.is_empty());
}

#[tokio::test]
async fn test_landing_page() {
    let (app, _state) = test_app();

    let (status, body) = get_text(app, "/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("<a href='/metrics'>Metrics</a>"));
}

#[tokio::test]
async fn test_running_exporter_reports_running() {
    let exporter = start_exporter(ExporterConfig::default()).await;

    let (status, response) = get(exporter.router(), "/health").await;
    assert_eq!(status, StatusCode::OK);
    // The state may still read "listening" if serve has not started yet.
    assert!(matches!(
        response["ingestion"].as_str(),
        Some("listening" | "running")
    ));

    exporter.stop().await;
}

#[tokio::test]
async fn test_scrape_endpoint_answers_over_tcp() {
    let exporter = start_exporter(ExporterConfig::default()).await;

    let response = http_get(exporter.http_addr, "/health").await;
    assert!(response.starts_with("HTTP/1.1 200"));
    assert!(response.contains("\"status\":\"healthy\""));

    let response = http_get(exporter.http_addr, "/metrics").await;
    assert!(response.starts_with("HTTP/1.1 200"));
    assert!(response.contains("nginx_request_exporter_syslog_messages 0"));

    exporter.stop().await;
}
