//! Integration tests for the Prometheus exposition.
//!
//! Records are pushed through a record processor directly and the result is
//! scraped through the router.

use axum::http::StatusCode;
use prometheus::Registry;
use shared::models::LogEnvelope;

use super::common::{get_text, test_processor};
use api::{create_router, AppState};

fn scrape_app(registry: &Registry) -> axum::Router {
    create_router(AppState::with_registry(registry.clone()))
}

#[tokio::test]
async fn test_two_records_one_histogram_per_status() {
    let registry = Registry::new();
    let mut processor = test_processor(&registry);

    processor
        .process(&LogEnvelope::new("nginx", "h1", "time:0.5 status=200"))
        .unwrap();
    processor
        .process(&LogEnvelope::new("nginx", "h1", "time:1.2 status=404"))
        .unwrap();

    let (status, body) = get_text(scrape_app(&registry), "/metrics").await;
    assert_eq!(status, StatusCode::OK);

    assert!(body.contains("# HELP nginx_request_time Nginx request log value for time"));
    assert!(body.contains("# TYPE nginx_request_time histogram"));
    assert!(body.contains("nginx_request_time_count{status=\"200\"} 1"));
    assert!(body.contains("nginx_request_time_sum{status=\"200\"} 0.5"));
    assert!(body.contains("nginx_request_time_count{status=\"404\"} 1"));
    assert!(body.contains("nginx_request_time_sum{status=\"404\"} 1.2"));
}

#[tokio::test]
async fn test_process_counters_are_exposed() {
    let registry = Registry::new();
    let mut processor = test_processor(&registry);

    processor
        .process(&LogEnvelope::new("nginx", "h1", "time:0.1 status=200"))
        .unwrap();
    assert!(processor
        .process(&LogEnvelope::new("apache", "h1", "time:0.1"))
        .is_err());

    let (_, body) = get_text(scrape_app(&registry), "/metrics").await;
    assert!(body.contains("nginx_request_exporter_syslog_messages 2"));
    assert!(body.contains("nginx_request_exporter_syslog_parse_failure 1"));
}

#[tokio::test]
async fn test_quoted_label_values_are_unquoted() {
    let registry = Registry::new();
    let mut processor = test_processor(&registry);

    processor
        .process(&LogEnvelope::new(
            "nginx",
            "h1",
            "time:0.000 upstream=\"-\"",
        ))
        .unwrap();

    let (_, body) = get_text(scrape_app(&registry), "/metrics").await;
    assert!(body.contains("nginx_request_time_count{upstream=\"-\"} 1"));
}

#[tokio::test]
async fn test_schema_conflict_keeps_first_schema() {
    let registry = Registry::new();
    let mut processor = test_processor(&registry);

    processor
        .process(&LogEnvelope::new("nginx", "h1", "time:0.1 status=200"))
        .unwrap();
    let outcome = processor
        .process(&LogEnvelope::new("nginx", "h1", "time:0.2 method=GET"))
        .unwrap();
    assert_eq!(outcome.skipped, 1);

    let (_, body) = get_text(scrape_app(&registry), "/metrics").await;
    assert!(body.contains("nginx_request_time_count{status=\"200\"} 1"));
    assert!(!body.contains("method=\"GET\""));
    assert!(body.contains("nginx_request_exporter_syslog_parse_failure 1"));
}
