//! Prometheus metrics for observability.
//!
//! This module provides metrics for monitoring the pinforge server:
//! - HTTP request metrics (latency, counts)
//! - Job queue status (collected dynamically)
//!
//! Pinning, gateway and job metrics live in `pinforge_core::metrics` and are
//! registered here.

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, IntGaugeVec, Opts,
    Registry, TextEncoder,
};
use tracing::warn;

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
            "pinforge_http_request_duration_seconds",
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
        Opts::new("pinforge_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "pinforge_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

// =============================================================================
// Job Queue Metrics
// =============================================================================

/// Job records by current state (collected dynamically).
pub static JOBS_BY_STATE: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new("pinforge_jobs_by_state", "Current job record count by state"),
        &["state"],
    )
    .unwrap()
});

/// Whether the scheduler loop is running.
pub static SCHEDULER_RUNNING: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "pinforge_scheduler_running",
        "Whether the job scheduler is running (1) or not (0)",
    )
    .unwrap()
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

    // Job queue
    registry.register(Box::new(JOBS_BY_STATE.clone())).unwrap();
    registry
        .register(Box::new(SCHEDULER_RUNNING.clone()))
        .unwrap();

    // Core metrics (pinning, gateway, jobs)
    for metric in pinforge_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        warn!(error = %e, "Failed to encode metrics");
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Collect dynamic metrics from current application state.
///
/// Called before encoding so the queue gauges reflect the job store.
pub fn collect_dynamic_metrics(state: &crate::state::AppState) {
    match state.scheduler().status() {
        Ok(status) => {
            SCHEDULER_RUNNING.set(if status.running { 1 } else { 0 });
            JOBS_BY_STATE
                .with_label_values(&["waiting"])
                .set(status.waiting_count as i64);
            JOBS_BY_STATE
                .with_label_values(&["pending"])
                .set(status.pending_count as i64);
            JOBS_BY_STATE
                .with_label_values(&["canceled"])
                .set(status.canceled_count as i64);
        }
        Err(e) => warn!(error = %e, "Failed to collect job metrics"),
    }
}

/// Metric label for a request path: the matched route template, or
/// `unmatched` for requests that hit no route.
pub fn normalize_path(matched: Option<&str>) -> String {
    matched.unwrap_or("unmatched").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path_uses_route_template() {
        assert_eq!(
            normalize_path(Some("/api/v1/jobs/{user_id}/{collection_id}")),
            "/api/v1/jobs/{user_id}/{collection_id}"
        );
    }

    #[test]
    fn test_normalize_path_unmatched() {
        assert_eq!(normalize_path(None), "unmatched");
    }

    #[test]
    fn test_encode_metrics_returns_prometheus_format() {
        HTTP_REQUESTS_TOTAL
            .with_label_values(&["GET", "/test", "200"])
            .inc();

        let output = encode_metrics();
        assert!(output.contains("pinforge_http_requests_total"));
        assert!(output.contains("# HELP"));
        assert!(output.contains("# TYPE"));
    }

    #[test]
    fn test_registry_contains_all_metrics() {
        // Prometheus only outputs metrics that have been accessed
        HTTP_REQUEST_DURATION
            .with_label_values(&["GET", "/test", "200"])
            .observe(0.1);
        HTTP_REQUESTS_IN_FLIGHT.set(0);
        JOBS_BY_STATE.with_label_values(&["waiting"]).set(0);
        SCHEDULER_RUNNING.set(0);
        pinforge_core::metrics::JOBS_STARTED.inc_by(0);
        pinforge_core::metrics::PIN_REQUESTS
            .with_label_values(&["success"])
            .inc_by(0);

        let output = encode_metrics();

        assert!(output.contains("pinforge_http_request_duration_seconds"));
        assert!(output.contains("pinforge_http_requests_in_flight"));
        assert!(output.contains("pinforge_jobs_by_state"));
        assert!(output.contains("pinforge_scheduler_running"));
        assert!(output.contains("pinforge_jobs_started_total"));
        assert!(output.contains("pinforge_pin_requests_total"));
    }
}
