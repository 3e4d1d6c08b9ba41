//! Library monitor runner.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::layout::LibraryLayoutPlanner;
use crate::linker::LibraryLinker;
use crate::metrics;
use crate::reconcile::{
    classify_completed, CompletionCandidate, ReconciliationEngine, SyncOutcome,
    DAEMON_EMPTY_REASON,
};
use crate::store::{NotificationStore, TorrentStore, TrackedStatus, TrackedTorrent};

use super::MonitorConfig;

/// Result of one monitor cycle.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CycleReport {
    /// Torrents linked during this cycle, with their updated store fields.
    pub linked: Vec<TrackedTorrent>,
    /// Completed torrents that could not be linked; retried next cycle.
    pub failed: usize,
    /// Why the cycle did nothing (daemon unreachable, empty, ...).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped_reason: Option<String>,
}

impl CycleReport {
    fn skipped(reason: impl Into<String>) -> Self {
        Self {
            skipped_reason: Some(reason.into()),
            ..Self::default()
        }
    }

    fn result_label(&self) -> &'static str {
        if self.skipped_reason.is_some() {
            "skipped"
        } else if self.linked.is_empty() {
            "idle"
        } else {
            "linked"
        }
    }
}

/// Stage at which linking a finished torrent failed.
#[derive(Debug, Clone, Copy)]
enum LinkStage {
    Plan,
    Apply,
    Store,
}

impl LinkStage {
    fn as_str(self) -> &'static str {
        match self {
            LinkStage::Plan => "plan",
            LinkStage::Apply => "apply",
            LinkStage::Store => "store",
        }
    }
}

/// Everything a cycle touches. Shared between the background loop and
/// on-demand runs.
struct CyclePipeline {
    engine: Arc<ReconciliationEngine>,
    planner: Arc<LibraryLayoutPlanner>,
    linker: Arc<LibraryLinker>,
    store: Arc<dyn TorrentStore>,
    notifications: Arc<dyn NotificationStore>,
    /// One cycle at a time, so a cycle's store writes land before the next
    /// one syncs.
    cycle_lock: Mutex<()>,
}

impl CyclePipeline {
    async fn run(&self) -> CycleReport {
        let _guard = self.cycle_lock.lock().await;
        let started = Instant::now();

        let report = self.run_locked().await;

        metrics::CYCLE_DURATION
            .with_label_values(&[report.result_label()])
            .observe(started.elapsed().as_secs_f64());
        report
    }

    async fn run_locked(&self) -> CycleReport {
        let views = match self.engine.sync().await {
            Ok(SyncOutcome::Synced(views)) => views,
            Ok(SyncOutcome::DaemonEmpty) => {
                debug!("Daemon has no torrents; skipping cycle");
                return CycleReport::skipped(DAEMON_EMPTY_REASON);
            }
            Err(e) => {
                warn!(error = %e, "Sync failed; skipping cycle");
                return CycleReport::skipped(e.to_string());
            }
        };

        let mut report = CycleReport::default();
        for candidate in classify_completed(&views) {
            match self.link_one(&candidate).await {
                Ok(torrent) => report.linked.push(torrent),
                Err(stage) => {
                    metrics::LINK_FAILURES
                        .with_label_values(&[stage.as_str()])
                        .inc();
                    report.failed += 1;
                }
            }
        }

        if !report.linked.is_empty() {
            metrics::TORRENTS_LINKED.inc_by(report.linked.len() as u64);
            if let Err(e) = self.notifications.save_completions(&report.linked) {
                warn!(error = %e, "Failed to save completion notifications");
            }
            info!(
                linked = report.linked.len(),
                failed = report.failed,
                "Linked completed torrents into the library"
            );
        }
        report
    }

    async fn link_one(&self, candidate: &CompletionCandidate) -> Result<TrackedTorrent, LinkStage> {
        let torrent = &candidate.torrent;
        let download_path: &Path = &candidate.download_path;

        let plan = self
            .planner
            .plan(torrent, download_path)
            .await
            .ok_or(LinkStage::Plan)?;

        if let Err(e) = self.linker.apply(&plan, torrent, download_path).await {
            warn!(
                torrent_id = torrent.id,
                error = %e,
                "Failed to link completed torrent"
            );
            return Err(LinkStage::Apply);
        }

        let source = download_path.to_string_lossy().into_owned();
        let library = plan.library_root.to_string_lossy().into_owned();
        let stored = self
            .store
            .update_paths(torrent.id, &source, &library)
            .and_then(|_| {
                self.store
                    .update_status(torrent.id, TrackedStatus::AddedToLibrary)
            });
        if let Err(e) = stored {
            warn!(
                torrent_id = torrent.id,
                error = %e,
                "Linked torrent but failed to record it"
            );
            return Err(LinkStage::Store);
        }

        let mut linked = torrent.clone();
        linked.download_path = source;
        linked.library_path = Some(library);
        linked.status = TrackedStatus::AddedToLibrary;
        Ok(linked)
    }
}

/// Periodically links finished torrents into the library.
pub struct LibraryMonitor {
    config: MonitorConfig,
    pipeline: Arc<CyclePipeline>,

    // Runtime state
    running: Arc<AtomicBool>,
    shutdown_tx: broadcast::Sender<()>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl LibraryMonitor {
    pub fn new(
        config: MonitorConfig,
        engine: Arc<ReconciliationEngine>,
        planner: Arc<LibraryLayoutPlanner>,
        linker: Arc<LibraryLinker>,
        store: Arc<dyn TorrentStore>,
        notifications: Arc<dyn NotificationStore>,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            config,
            pipeline: Arc::new(CyclePipeline {
                engine,
                planner,
                linker,
                store,
                notifications,
                cycle_lock: Mutex::new(()),
            }),
            running: Arc::new(AtomicBool::new(false)),
            shutdown_tx,
            handle: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Run one cycle now. Waits for an in-flight background cycle first.
    pub async fn run_cycle(&self) -> CycleReport {
        self.pipeline.run().await
    }

    /// Start the background loop. The first cycle runs immediately.
    pub async fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Library monitor already running");
            return;
        }

        info!(
            interval_secs = self.config.interval_secs,
            "Starting library monitor"
        );
        let handle = self.spawn_loop();
        *self.handle.lock().await = Some(handle);
    }

    /// Stop the background loop, waiting briefly for an in-flight cycle.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            warn!("Library monitor not running");
            return;
        }

        info!("Stopping library monitor");
        let _ = self.shutdown_tx.send(());

        if let Some(handle) = self.handle.lock().await.take() {
            if tokio::time::timeout(Duration::from_secs(2), handle)
                .await
                .is_err()
            {
                warn!("Library monitor did not stop within 2s; leaving it to finish");
            }
        }
        info!("Library monitor stopped");
    }

    fn spawn_loop(&self) -> JoinHandle<()> {
        let running = Arc::clone(&self.running);
        let pipeline = Arc::clone(&self.pipeline);
        let interval = Duration::from_secs(self.config.interval_secs);
        let tick = Duration::from_millis(self.config.poll_tick_ms.max(1));
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            info!("Library monitor loop started");
            'cycles: while running.load(Ordering::Relaxed) {
                pipeline.run().await;

                let next = Instant::now() + interval;
                while Instant::now() < next {
                    tokio::select! {
                        _ = shutdown_rx.recv() => break 'cycles,
                        _ = tokio::time::sleep(tick) => {
                            if !running.load(Ordering::Relaxed) {
                                break 'cycles;
                            }
                        }
                    }
                }
            }
            info!("Library monitor loop stopped");
        })
    }
}
