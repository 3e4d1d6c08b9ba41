//! `track.json` provenance records.

use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::store::TrackedTorrent;

/// File name of the provenance record inside a title folder.
pub const PROVENANCE_FILE: &str = "track.json";

/// Snapshot of a tracked torrent written next to its library links.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvenanceRecord {
    #[serde(flatten)]
    pub torrent: TrackedTorrent,
    pub source_download_path: String,
    pub library_path: String,
}

impl ProvenanceRecord {
    pub fn new(torrent: &TrackedTorrent, source_download_path: &Path, library_path: &Path) -> Self {
        // The record's own `library_path` replaces the flattened one.
        let mut torrent = torrent.clone();
        torrent.library_path = None;
        Self {
            torrent,
            source_download_path: source_download_path.to_string_lossy().into_owned(),
            library_path: library_path.to_string_lossy().into_owned(),
        }
    }

    pub async fn read(folder: &Path) -> Option<Self> {
        let path = folder.join(PROVENANCE_FILE);
        let raw = tokio::fs::read(&path).await.ok()?;
        match serde_json::from_slice(&raw) {
            Ok(record) => Some(record),
            Err(e) => {
                debug!(path = %path.display(), error = %e, "Unreadable provenance record");
                None
            }
        }
    }

    pub async fn write(&self, folder: &Path) -> std::io::Result<()> {
        let json = serde_json::to_vec_pretty(self)?;
        tokio::fs::write(folder.join(PROVENANCE_FILE), json).await
    }
}

/// Lexically normalize a path: drop `.` components, resolve `..`, and strip
/// trailing separators. Does not touch the filesystem.
pub fn normalize_path(path: impl AsRef<Path>) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.as_ref().components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

fn same_path(a: &str, b: &str) -> bool {
    !a.trim().is_empty() && !b.trim().is_empty() && normalize_path(a) == normalize_path(b)
}

/// Map a library title folder back to its tracked torrent via `track.json`.
///
/// Matches by content hash first, then by download path. `None` when the
/// record is missing, unreadable, or matches nothing.
pub async fn find_provenance(folder: &Path, tracked: &[TrackedTorrent]) -> Option<TrackedTorrent> {
    let record = ProvenanceRecord::read(folder).await?;

    let by_hash = (!record.torrent.content_hash.is_empty())
        .then(|| {
            tracked
                .iter()
                .find(|t| t.has_content_hash(&record.torrent.content_hash))
        })
        .flatten();

    by_hash
        .or_else(|| {
            tracked.iter().find(|t| {
                same_path(&t.download_path, &record.source_download_path)
                    || same_path(&t.download_path, &record.torrent.download_path)
            })
        })
        .cloned()
}
