//! Reconciliation result types.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::store::{StoreError, TrackedTorrent};
use crate::torrent_client::{DaemonState, DaemonTorrent, StateCategory, TorrentClientError};

/// Reason reported when the daemon lists no torrents at all.
pub const DAEMON_EMPTY_REASON: &str = "no torrents in daemon";

/// Why a sync could not produce a view.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("daemon not accessible")]
    DaemonUnreachable,

    #[error("authentication failed")]
    AuthenticationFailed(#[source] TorrentClientError),

    #[error("failed to list daemon torrents: {0}")]
    ListFailed(#[source] TorrentClientError),

    #[error("failed to read tracked torrents: {0}")]
    Store(#[from] StoreError),
}

impl SyncError {
    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            SyncError::DaemonUnreachable => "unreachable",
            SyncError::AuthenticationFailed(_) => "auth_failed",
            SyncError::ListFailed(_) => "list_failed",
            SyncError::Store(_) => "store_failed",
        }
    }
}

/// Successful sync result.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    /// One view per tracked torrent, in store order.
    Synced(Vec<SyncedTorrentView>),
    /// The daemon reported zero torrents; the store was not consulted.
    DaemonEmpty,
}

impl SyncOutcome {
    pub fn views(&self) -> &[SyncedTorrentView] {
        match self {
            SyncOutcome::Synced(views) => views,
            SyncOutcome::DaemonEmpty => &[],
        }
    }

    pub fn into_views(self) -> Vec<SyncedTorrentView> {
        match self {
            SyncOutcome::Synced(views) => views,
            SyncOutcome::DaemonEmpty => Vec::new(),
        }
    }

    /// Explanation accompanying an empty result, if any.
    pub fn reason(&self) -> Option<&'static str> {
        match self {
            SyncOutcome::Synced(_) => None,
            SyncOutcome::DaemonEmpty => Some(DAEMON_EMPTY_REASON),
        }
    }
}

/// A tracked torrent merged with its live daemon status.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncedTorrentView {
    pub torrent: TrackedTorrent,
    pub found_in_daemon: bool,
    /// Daemon state, or `NotFound` when the daemon does not know the torrent.
    pub state: DaemonState,
    /// Live daemon fields; absent when not found.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub daemon: Option<DaemonTorrent>,
}

impl SyncedTorrentView {
    pub fn found(torrent: TrackedTorrent, daemon: DaemonTorrent) -> Self {
        Self {
            torrent,
            found_in_daemon: true,
            state: daemon.state,
            daemon: Some(daemon),
        }
    }

    pub fn not_found(torrent: TrackedTorrent) -> Self {
        Self {
            torrent,
            found_in_daemon: false,
            state: DaemonState::NotFound,
            daemon: None,
        }
    }

    pub fn category(&self) -> StateCategory {
        self.state.category()
    }

    /// `save_path/name` as reported by the daemon, when both are non-empty.
    pub fn daemon_content_path(&self) -> Option<PathBuf> {
        let daemon = self.daemon.as_ref()?;
        if daemon.save_path.is_empty() || daemon.name.is_empty() {
            return None;
        }
        Some(PathBuf::from(&daemon.save_path).join(&daemon.name))
    }
}

/// A finished torrent ready for planning and linking.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionCandidate {
    pub torrent: TrackedTorrent,
    /// Existing on-disk location of the payload.
    pub download_path: PathBuf,
}

/// View counts per display category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusSummary {
    pub total: usize,
    pub found_in_daemon: usize,
    pub by_category: BTreeMap<StateCategory, usize>,
}
