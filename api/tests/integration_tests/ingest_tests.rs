//! Integration tests for live syslog ingestion.
//!
//! Tests cover:
//! - UDP datagrams showing up on the scrape endpoint
//! - Rejected and unparseable records being counted
//! - Graceful drain on shutdown
//! - Backpressure and the drain timeout

use shared::config::{ExporterConfig, HistogramBuckets};
use shared::ingest::IngestionState;

use super::common::{get_text, nginx_line, send_syslog, start_exporter, wait_for_metric};

#[tokio::test]
async fn test_datagrams_are_exposed_as_histograms() {
    let exporter = start_exporter(ExporterConfig::default()).await;

    send_syslog(
        exporter.syslog_addr,
        &[
            &nginx_line("web-1", "nginx", "time:0.5 status=200"),
            &nginx_line("web-1", "nginx", "time:1.2 status=404"),
        ],
    )
    .await;

    let app = exporter.router();
    let body = wait_for_metric(&app, "nginx_request_time_count{status=\"404\"} 1").await;
    assert!(body.contains("nginx_request_time_count{status=\"200\"} 1"));
    assert!(body.contains("nginx_request_exporter_syslog_messages 2"));

    let report = exporter.stop().await;
    assert_eq!(report.messages_received, 2);
    assert_eq!(report.parse_failures, 0);
}

#[tokio::test]
async fn test_bad_records_are_counted_not_fatal() {
    let exporter = start_exporter(ExporterConfig::default()).await;

    send_syslog(
        exporter.syslog_addr,
        &[
            "not a syslog frame",
            &nginx_line("web-1", "sshd", "time:0.5"),
            &nginx_line("web-1", "nginx", "time:fast status=200"),
            &nginx_line("web-1", "nginx", "bytes:512 status=200"),
        ],
    )
    .await;

    let app = exporter.router();
    let body = wait_for_metric(&app, "nginx_request_bytes_count{status=\"200\"} 1").await;
    assert!(body.contains("nginx_request_exporter_syslog_messages 4"));
    assert!(body.contains("nginx_request_exporter_syslog_parse_failure 3"));

    let report = exporter.stop().await;
    let ingestion = report.ingestion.unwrap();
    assert_eq!(ingestion.processed, 3);
    assert_eq!(ingestion.failed_records, 2);
    assert_eq!(ingestion.observations, 1);
}

#[tokio::test]
async fn test_custom_namespace_tag_and_buckets() {
    let exporter = start_exporter(
        ExporterConfig::default()
            .with_namespace("edge")
            .with_expected_tag("nginx_edge")
            .with_buckets(HistogramBuckets::new(vec![0.1, 1.0]).unwrap()),
    )
    .await;

    send_syslog(
        exporter.syslog_addr,
        &[&nginx_line("web-1", "nginx_edge", "time:0.05 status=200")],
    )
    .await;

    let app = exporter.router();
    let body = wait_for_metric(&app, "edge_time_count{status=\"200\"} 1").await;
    assert!(body.contains("edge_time_bucket{status=\"200\",le=\"0.1\"} 1"));
    assert!(body.contains("edge_time_bucket{status=\"200\",le=\"+Inf\"} 1"));
    assert!(body.contains("edge_exporter_syslog_messages 1"));

    exporter.stop().await;
}

#[tokio::test]
async fn test_shutdown_drains_and_stops() {
    let exporter = start_exporter(ExporterConfig::default()).await;
    let state = exporter.state.clone();

    let lines: Vec<String> = (0..50)
        .map(|i| nginx_line("web-1", "nginx", &format!("time:0.{i:02} status=200")))
        .collect();
    let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
    send_syslog(exporter.syslog_addr, &refs).await;

    wait_for_metric(
        &exporter.router(),
        "nginx_request_time_count{status=\"200\"} 50",
    )
    .await;

    let report = exporter.stop().await;

    assert_eq!(state.ingestion_state(), IngestionState::Stopped);
    assert_eq!(report.messages_received, 50);
    assert_eq!(report.ingestion.unwrap().observations, 50);
}

fn burst(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| nginx_line("web-1", "nginx", &format!("time:{i} status=200")))
        .collect()
}

#[tokio::test]
async fn test_stop_right_after_burst_counts_every_buffered_envelope() {
    let exporter = start_exporter(ExporterConfig::default()).await;
    let app = exporter.router();

    let lines = burst(200);
    let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
    send_syslog(exporter.syslog_addr, &refs).await;

    let report = exporter.stop().await;
    let ingestion = report.ingestion.unwrap();

    // Datagrams still in the kernel buffer at shutdown are never read, but
    // every envelope that reached the channel is processed.
    assert_eq!(ingestion.processed as u64, report.messages_received);
    assert_eq!(ingestion.observations, ingestion.processed);
    assert_eq!(ingestion.failed_records, 0);
    assert_eq!(report.parse_failures, 0);

    if ingestion.processed > 0 {
        let (_, body) = get_text(app, "/metrics").await;
        let count = format!("nginx_request_time_count{{status=\"200\"}} {}", ingestion.processed);
        assert!(body.contains(&count), "expected '{count}' in:\n{body}");
    }
}

#[tokio::test]
async fn test_zero_drain_timeout_still_stops() {
    let exporter = start_exporter(
        ExporterConfig::default()
            .with_channel_capacity(1)
            .with_drain_timeout_secs(0),
    )
    .await;
    let state = exporter.state.clone();

    let lines = burst(500);
    let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
    send_syslog(exporter.syslog_addr, &refs).await;

    let report = exporter.stop().await;

    assert_eq!(state.ingestion_state(), IngestionState::Stopped);
    // Ingestion either finished within the zero timeout or was aborted.
    if let Some(ingestion) = report.ingestion {
        assert_eq!(ingestion.processed as u64, report.messages_received);
    }
}

#[tokio::test]
async fn test_single_slot_channel_loses_nothing() {
    let exporter = start_exporter(ExporterConfig::default().with_channel_capacity(1)).await;

    let lines = burst(100);
    let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
    send_syslog(exporter.syslog_addr, &refs).await;

    wait_for_metric(
        &exporter.router(),
        "nginx_request_time_count{status=\"200\"} 100",
    )
    .await;

    let report = exporter.stop().await;
    assert_eq!(report.messages_received, 100);
    assert_eq!(report.ingestion.unwrap().processed, 100);
}
