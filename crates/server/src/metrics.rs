//! Prometheus metrics for observability.
//!
//! This module provides metrics for monitoring the jellylink server:
//! - HTTP request metrics (latency, counts, in flight)
//! - Monitor and library status (collected dynamically)
//! - Core reconciliation and linking metrics (registered from the core crate)

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// HTTP Request Metrics
// =============================================================================

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "jellylink_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
        ]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("jellylink_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "jellylink_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

// =============================================================================
// Monitor / Library Metrics
// =============================================================================

/// Whether the background monitor is running (1 = running, 0 = stopped).
pub static MONITOR_RUNNING: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "jellylink_monitor_running",
        "Whether the library monitor is running",
    )
    .unwrap()
});

/// Title folders in the library.
pub static LIBRARY_TITLES: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("jellylink_library_titles", "Title folders in the library").unwrap()
});

// =============================================================================
// Registration
// =============================================================================

fn register_metrics(registry: &Registry) {
    // HTTP
    registry
        .register(Box::new(HTTP_REQUEST_DURATION.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()))
        .unwrap();

    // Monitor / library
    registry
        .register(Box::new(MONITOR_RUNNING.clone()))
        .unwrap();
    registry
        .register(Box::new(LIBRARY_TITLES.clone()))
        .unwrap();

    // Core metrics (sync, linking, probe)
    for metric in jellylink_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::warn!("Failed to encode metrics: {}", e);
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Collect dynamic metrics from current application state.
///
/// Called before encoding so gauges reflect the current monitor and library.
pub async fn collect_dynamic_metrics(state: &crate::state::AppState) {
    MONITOR_RUNNING.set(if state.monitor().is_running() { 1 } else { 0 });

    if let Ok(titles) = state.service().library().await {
        LIBRARY_TITLES.set(titles.len() as i64);
    }
}

/// Normalize a path for metric labels (titles, seasons and movie names
/// become placeholders).
pub fn normalize_path(path: &str) -> String {
    if let Some((prefix, rest)) = path.split_once("/library/") {
        if rest.is_empty() {
            return path.to_string();
        }
        return match rest.split_once("/seasons/") {
            Some(_) => format!("{}/library/{{title}}/seasons/{{season}}", prefix),
            None => format!("{}/library/{{title}}", prefix),
        };
    }
    match path.split_once("/movies/") {
        Some((prefix, rest)) if !rest.is_empty() => format!("{}/movies/{{name}}", prefix),
        _ => path.to_string(),
    }
}
