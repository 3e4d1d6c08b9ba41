//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Reconciliation (sync outcomes, daemon and tracked torrent counts)
//! - Library linking (torrents linked, per-file outcomes, cycle duration)
//! - External tools (duration probe failures)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts};

// =============================================================================
// Reconciliation Metrics
// =============================================================================

/// Sync attempts by outcome.
pub static SYNC_RESULTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("jellylink_sync_results_total", "Total daemon sync attempts"),
        &["result"], // "synced", "daemon_empty", "unreachable", "auth_failed", "list_failed", "store_failed"
    )
    .unwrap()
});

/// Torrents reported by the daemon in the last successful sync.
pub static DAEMON_TORRENTS: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "jellylink_daemon_torrents",
        "Torrents reported by the daemon in the last sync",
    )
    .unwrap()
});

/// Tracked torrents in the store at the last successful sync.
pub static TRACKED_TORRENTS: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "jellylink_tracked_torrents",
        "Tracked torrents at the last sync",
    )
    .unwrap()
});

// =============================================================================
// Library Metrics
// =============================================================================

/// Torrents linked into the library by the monitor.
pub static TORRENTS_LINKED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "jellylink_torrents_linked_total",
        "Completed torrents linked into the library",
    )
    .unwrap()
});

/// Torrents that were ready but could not be linked.
pub static LINK_FAILURES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "jellylink_link_failures_total",
            "Completed torrents that failed to link",
        ),
        &["stage"], // "plan", "apply", "store"
    )
    .unwrap()
});

/// Per-file link outcomes.
pub static FILES_LINKED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("jellylink_files_linked_total", "Library symlink outcomes"),
        &["outcome"], // "linked", "already_linked", "failed"
    )
    .unwrap()
});

/// Monitor cycle duration in seconds.
pub static CYCLE_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "jellylink_cycle_duration_seconds",
            "Duration of a monitor cycle",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]),
        &["result"], // "linked", "idle", "skipped"
    )
    .unwrap()
});

// =============================================================================
// External Tools
// =============================================================================

/// Duration probe failures by kind.
pub static PROBE_FAILURES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("jellylink_probe_failures_total", "Duration probe failures"),
        &["kind"], // "not_installed", "timeout", "failed", "io"
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Reconciliation
        Box::new(SYNC_RESULTS.clone()),
        Box::new(DAEMON_TORRENTS.clone()),
        Box::new(TRACKED_TORRENTS.clone()),
        // Library
        Box::new(TORRENTS_LINKED.clone()),
        Box::new(LINK_FAILURES.clone()),
        Box::new(FILES_LINKED.clone()),
        Box::new(CYCLE_DURATION.clone()),
        // External tools
        Box::new(PROBE_FAILURES.clone()),
    ]
}
