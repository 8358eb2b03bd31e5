//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Pinning (requests, batch attempts, batch sizes, folder assembly)
//! - Gateway fetches
//! - Jobs (scheduling, outcomes, rendered frames)

use once_cell::sync::Lazy;
use prometheus::{Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts};

// =============================================================================
// Pinning Metrics
// =============================================================================

/// Pin requests settled, by result.
pub static PIN_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("pinforge_pin_requests_total", "Total pin requests settled"),
        &["result"], // "success", "failed"
    )
    .unwrap()
});

/// Pin batch attempts, by outcome.
pub static PIN_BATCH_ATTEMPTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("pinforge_pin_batch_attempts_total", "Total pin batch attempts"),
        &["result"], // "success", "empty", "error"
    )
    .unwrap()
});

/// Files per submitted batch.
pub static PIN_BATCH_FILES: Lazy<Histogram> = Lazy::new(|| {
    Histogram::with_opts(
        HistogramOpts::new("pinforge_pin_batch_files", "Number of files per pin batch")
            .buckets(vec![1.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0]),
    )
    .unwrap()
});

/// Folder assemblies, by result.
pub static FOLDER_ASSEMBLIES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("pinforge_folder_assemblies_total", "Total folder assemblies"),
        &["result"], // "success", "failed"
    )
    .unwrap()
});

// =============================================================================
// Gateway Metrics
// =============================================================================

/// Gateway HTTP requests, by result.
pub static GATEWAY_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("pinforge_gateway_requests_total", "Total gateway requests"),
        &["result"], // "success", "error"
    )
    .unwrap()
});

/// Gateway fetch requests settled, by outcome.
pub static GATEWAY_BLOBS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("pinforge_gateway_blobs_total", "Total gateway fetch requests settled"),
        &["result"], // "found", "not_found", "failed"
    )
    .unwrap()
});

// =============================================================================
// Job Metrics
// =============================================================================

/// Jobs handed to the orchestrator.
pub static JOBS_STARTED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("pinforge_jobs_started_total", "Total jobs started").unwrap()
});

/// Jobs finished, by outcome.
pub static JOBS_FINISHED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("pinforge_jobs_finished_total", "Total jobs finished"),
        &["outcome"], // "completed", "cancelled", "failed", "missing"
    )
    .unwrap()
});

/// Jobs currently running.
pub static JOBS_RUNNING: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("pinforge_jobs_running", "Number of jobs currently running").unwrap()
});

/// Job duration in seconds.
pub static JOB_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new("pinforge_job_duration_seconds", "Duration of jobs").buckets(vec![
            10.0, 30.0, 60.0, 300.0, 600.0, 1800.0, 3600.0, 7200.0, 14400.0,
        ]),
        &["outcome"],
    )
    .unwrap()
});

/// Frames rendered.
pub static FRAMES_RENDERED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("pinforge_frames_rendered_total", "Total frames rendered").unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Pinning
        Box::new(PIN_REQUESTS.clone()),
        Box::new(PIN_BATCH_ATTEMPTS.clone()),
        Box::new(PIN_BATCH_FILES.clone()),
        Box::new(FOLDER_ASSEMBLIES.clone()),
        // Gateway
        Box::new(GATEWAY_REQUESTS.clone()),
        Box::new(GATEWAY_BLOBS.clone()),
        // Jobs
        Box::new(JOBS_STARTED.clone()),
        Box::new(JOBS_FINISHED.clone()),
        Box::new(JOBS_RUNNING.clone()),
        Box::new(JOB_DURATION.clone()),
        Box::new(FRAMES_RENDERED.clone()),
    ]
}
