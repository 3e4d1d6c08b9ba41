//! Tracked torrent / daemon reconciliation.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::metrics;
use crate::store::{TorrentStore, TrackedStatus, TrackedTorrent};
use crate::torrent_client::{DaemonTorrent, TorrentClient};

use super::{CompletionCandidate, StatusSummary, SyncError, SyncOutcome, SyncedTorrentView};

/// Merges the tracked torrent store with live daemon status.
///
/// Holds no mutable state; concurrent `sync` calls are independent.
pub struct ReconciliationEngine {
    client: Arc<dyn TorrentClient>,
    store: Arc<dyn TorrentStore>,
}

impl ReconciliationEngine {
    pub fn new(client: Arc<dyn TorrentClient>, store: Arc<dyn TorrentStore>) -> Self {
        Self { client, store }
    }

    /// Fetch daemon status and merge it into one view per tracked torrent.
    ///
    /// Never mutates the store.
    pub async fn sync(&self) -> Result<SyncOutcome, SyncError> {
        let result = self.try_sync().await;
        let label = match &result {
            Ok(SyncOutcome::Synced(_)) => "synced",
            Ok(SyncOutcome::DaemonEmpty) => "daemon_empty",
            Err(e) => e.kind(),
        };
        metrics::SYNC_RESULTS.with_label_values(&[label]).inc();
        result
    }

    async fn try_sync(&self) -> Result<SyncOutcome, SyncError> {
        if !self.client.check_reachable().await {
            debug!(client = self.client.name(), "Daemon not reachable");
            return Err(SyncError::DaemonUnreachable);
        }

        let session = self.client.authenticate().await.map_err(|e| {
            warn!(client = self.client.name(), error = %e, "Daemon authentication failed");
            SyncError::AuthenticationFailed(e)
        })?;

        let listing = self.client.list_torrents(&session).await;
        self.client.logout(&session).await;
        let daemon_torrents = listing.map_err(SyncError::ListFailed)?;

        metrics::DAEMON_TORRENTS.set(daemon_torrents.len() as i64);
        if daemon_torrents.is_empty() {
            return Ok(SyncOutcome::DaemonEmpty);
        }

        let tracked = self.store.list()?;
        metrics::TRACKED_TORRENTS.set(tracked.len() as i64);

        let views = merge(tracked, &daemon_torrents);
        debug!(
            tracked = views.len(),
            daemon = daemon_torrents.len(),
            found = views.iter().filter(|v| v.found_in_daemon).count(),
            "Synced tracked torrents with daemon"
        );
        Ok(SyncOutcome::Synced(views))
    }
}

/// Pair each tracked torrent with the daemon entry of the same content hash.
///
/// Hashes compare case-insensitively; output keeps the tracked order.
pub fn merge(tracked: Vec<TrackedTorrent>, daemon: &[DaemonTorrent]) -> Vec<SyncedTorrentView> {
    let by_hash: HashMap<String, &DaemonTorrent> = daemon
        .iter()
        .map(|t| (t.hash.to_lowercase(), t))
        .collect();

    tracked
        .into_iter()
        .map(|torrent| {
            let found = if torrent.content_hash.is_empty() {
                None
            } else {
                by_hash.get(&torrent.content_hash.to_lowercase()).copied()
            };
            match found {
                Some(live) => SyncedTorrentView::found(torrent, live.clone()),
                None => SyncedTorrentView::not_found(torrent),
            }
        })
        .collect()
}

/// Select views whose torrents have finished and should be linked now.
///
/// A torrent qualifies only if the daemon knows it, reports a library-ready
/// state, it is not already in the library, it carries a library title, and
/// the daemon's `save_path/name` exists on disk.
pub fn classify_completed(views: &[SyncedTorrentView]) -> Vec<CompletionCandidate> {
    views
        .iter()
        .filter(|v| v.found_in_daemon && v.state.is_library_ready())
        .filter(|v| v.torrent.status != TrackedStatus::AddedToLibrary)
        .filter(|v| {
            let titled = v.torrent.library_title().is_some();
            if !titled {
                debug!(
                    torrent_id = v.torrent.id,
                    "Finished torrent has no library title; not processing"
                );
            }
            titled
        })
        .filter_map(|v| {
            let path = v.daemon_content_path()?;
            if path.exists() {
                Some(CompletionCandidate {
                    torrent: v.torrent.clone(),
                    download_path: path,
                })
            } else {
                info!(
                    torrent_id = v.torrent.id,
                    path = %path.display(),
                    "Finished torrent's files are not on disk"
                );
                None
            }
        })
        .collect()
}

/// Count views by display category.
pub fn summarize(views: &[SyncedTorrentView]) -> StatusSummary {
    let mut summary = StatusSummary {
        total: views.len(),
        ..StatusSummary::default()
    };
    for view in views {
        if view.found_in_daemon {
            summary.found_in_daemon += 1;
        }
        *summary.by_category.entry(view.category()).or_insert(0) += 1;
    }
    summary
}
