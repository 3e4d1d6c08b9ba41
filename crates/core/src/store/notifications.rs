//! Completion notifications shown to the user after unattended linking.

use std::path::PathBuf;
use std::sync::Mutex;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::json_store::{read_json_or_default, write_json_atomic};
use super::{StoreError, TrackedTorrent};

/// One "added to your library" message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionNotification {
    /// Unix time in seconds.
    pub timestamp: f64,
    #[serde(alias = "anime_title")]
    pub title: String,
    pub torrent_title: String,
    #[serde(default)]
    pub torrent_id: Option<u64>,
    pub message: String,
}

impl CompletionNotification {
    pub fn for_torrent(torrent: &TrackedTorrent, now: f64) -> Self {
        let title = torrent.library_title().unwrap_or("Unknown").to_string();
        Self {
            timestamp: now,
            message: format!("'{title}' has been automatically added to your library!"),
            title,
            torrent_title: torrent.title.clone(),
            torrent_id: Some(torrent.id),
        }
    }
}

/// Storage for pending completion notifications.
pub trait NotificationStore: Send + Sync {
    /// Append one notification per torrent, dropping expired entries.
    fn save_completions(&self, torrents: &[TrackedTorrent]) -> Result<(), StoreError>;

    /// Return every pending notification and clear the list.
    fn take_pending(&self) -> Result<Vec<CompletionNotification>, StoreError>;
}

/// Notification store backed by a JSON array file.
pub struct JsonNotificationStore {
    path: PathBuf,
    retention_secs: f64,
    lock: Mutex<()>,
}

impl JsonNotificationStore {
    pub fn new(path: impl Into<PathBuf>, retention_hours: u32) -> Self {
        Self {
            path: path.into(),
            retention_secs: retention_hours as f64 * 3600.0,
            lock: Mutex::new(()),
        }
    }

    fn now() -> f64 {
        Utc::now().timestamp_millis() as f64 / 1000.0
    }
}

impl NotificationStore for JsonNotificationStore {
    fn save_completions(&self, torrents: &[TrackedTorrent]) -> Result<(), StoreError> {
        if torrents.is_empty() {
            return Ok(());
        }

        let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut pending: Vec<CompletionNotification> = read_json_or_default(&self.path)?;

        let now = Self::now();
        pending.extend(
            torrents
                .iter()
                .map(|torrent| CompletionNotification::for_torrent(torrent, now)),
        );
        pending.retain(|n| now - n.timestamp < self.retention_secs);

        write_json_atomic(&self.path, &pending)
    }

    fn take_pending(&self) -> Result<Vec<CompletionNotification>, StoreError> {
        let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let pending: Vec<CompletionNotification> = read_json_or_default(&self.path)?;
        if !pending.is_empty() {
            write_json_atomic(&self.path, &Vec::<CompletionNotification>::new())?;
        }
        Ok(pending)
    }
}
