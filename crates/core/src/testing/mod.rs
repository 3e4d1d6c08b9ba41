//! Testing utilities and mock implementations.
//!
//! This module provides mock implementations of the external collaborator
//! traits (torrent daemon, duration probe), allowing the reconciliation
//! pipeline to be exercised end to end without a running daemon or ffprobe.
//!
//! # Example
//!
//! ```rust,ignore
//! use jellylink_core::testing::{fixtures, MockDurationProbe, MockTorrentClient};
//!
//! let client = MockTorrentClient::new();
//! let probe = MockDurationProbe::new().with_duration("movie.mkv", 5400.0);
//!
//! client
//!     .add_daemon_torrent(fixtures::daemon_torrent("abcd", DaemonState::Uploading, "/dl", "Show"))
//!     .await;
//! ```

mod mock_probe;
mod mock_torrent_client;

pub use mock_probe::MockDurationProbe;
pub use mock_torrent_client::{MockTorrentClient, RecordedAddTorrent, RecordedRemoval};

/// Test fixtures and helper functions.
pub mod fixtures {
    use chrono::Utc;

    use crate::store::{LibraryInfo, NewTrackedTorrent, TrackedTorrent};
    use crate::torrent_client::{DaemonState, DaemonTorrent};

    /// A store entry classified under `library_title`.
    pub fn new_tracked(content_hash: &str, library_title: &str) -> NewTrackedTorrent {
        NewTrackedTorrent::new(format!("[Group] {} (1080p)", library_title), content_hash)
            .with_source_link(format!("magnet:?xt=urn:btih:{}", content_hash))
            .with_library_info(LibraryInfo::titled(library_title))
    }

    /// A tracked torrent in the `added` state.
    pub fn tracked_torrent(id: u64, content_hash: &str, library_title: &str) -> TrackedTorrent {
        new_tracked(content_hash, library_title).into_tracked(id, Utc::now())
    }

    /// A daemon listing entry.
    pub fn daemon_torrent(
        hash: &str,
        state: DaemonState,
        save_path: &str,
        name: &str,
    ) -> DaemonTorrent {
        let done = state.is_library_ready();
        DaemonTorrent {
            hash: hash.to_string(),
            name: name.to_string(),
            state,
            progress: if done { 1.0 } else { 0.5 },
            downloaded_bytes: if done { 1024 * 1024 * 700 } else { 1024 * 1024 * 350 },
            size_bytes: 1024 * 1024 * 700, // 700 MB
            download_speed: if done { 0 } else { 1024 * 1024 },
            upload_speed: 1024 * 64,
            eta_secs: if done { None } else { Some(350) },
            ratio: 0.4,
            save_path: save_path.to_string(),
            category: Some("anime".to_string()),
        }
    }
}
