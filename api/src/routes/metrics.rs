//! Prometheus scrape endpoint.

use crate::state::AppState;
use axum::{
    extract::State,
    http::{header, StatusCode},
    routing::get,
    Router,
};
use prometheus::{Encoder, TextEncoder};

/// Creates the scrape route at the configured metrics path.
pub fn metrics_routes(state: AppState) -> Router {
    let path = state.metrics_path().to_string();
    Router::new()
        .route(&path, get(scrape))
        .with_state(state)
}

/// Encodes every registered metric in the Prometheus text format.
///
/// Gathering takes a consistent snapshot of each collector, so a scrape
/// running alongside the ingestion loop never sees a half-updated histogram.
async fn scrape(
    State(state): State<AppState>,
) -> Result<([(header::HeaderName, String); 1], Vec<u8>), (StatusCode, String)> {
    let encoder = TextEncoder::new();
    let families = state.registry().gather();

    let mut buffer = Vec::new();
    encoder.encode(&families, &mut buffer).map_err(|e| {
        tracing::error!(error = %e, "Failed to encode metrics");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to encode metrics: {e}"),
        )
    })?;

    Ok((
        [(header::CONTENT_TYPE, encoder.format_type().to_string())],
        buffer,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use prometheus::{Histogram, HistogramOpts, Registry};
    use tower::ServiceExt;

    async fn scrape_body(app: Router, uri: &str) -> (StatusCode, Option<String>, String) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, content_type, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_scrape_exposes_registered_histogram() {
        let registry = Registry::new();
        let histogram =
            Histogram::with_opts(HistogramOpts::new("request_time", "Request time")).unwrap();
        registry.register(Box::new(histogram.clone())).unwrap();
        histogram.observe(0.25);

        let app = metrics_routes(AppState::with_registry(registry));
        let (status, content_type, body) = scrape_body(app, "/metrics").await;

        assert_eq!(status, StatusCode::OK);
        assert!(content_type.is_some_and(|ct| ct.starts_with("text/plain")));
        assert!(body.contains("# TYPE request_time histogram"));
        assert!(body.contains("request_time_count 1"));
    }

    #[tokio::test]
    async fn test_scrape_of_empty_registry_is_empty() {
        let app = metrics_routes(AppState::default());
        let (status, _, body) = scrape_body(app, "/metrics").await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn test_scrape_uses_configured_path() {
        let (_, ingestion) = tokio::sync::watch::channel(shared::ingest::IngestionState::Running);
        let state = AppState::new(Registry::new(), ingestion, "/prom");

        let (status, _, _) = scrape_body(metrics_routes(state.clone()), "/prom").await;
        assert_eq!(status, StatusCode::OK);

        let (status, _, _) = scrape_body(metrics_routes(state), "/metrics").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
