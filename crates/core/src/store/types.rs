//! Tracked torrent records.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Errors from the persistent stores.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Store file {path} is corrupt: {message}")]
    Corrupt { path: PathBuf, message: String },

    #[error("Tracked torrent not found: {0}")]
    NotFound(u64),

    #[error("Failed to encode store document: {0}")]
    Encode(String),
}

/// Lifecycle status of a tracked torrent.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TrackedStatus {
    /// Accepted by the daemon, not yet linked.
    Added,
    /// Linked into the library; never auto-processed again.
    AddedToLibrary,
    /// Any other free-form status written by hand or by older versions.
    Other(String),
}

impl TrackedStatus {
    pub fn as_str(&self) -> &str {
        match self {
            TrackedStatus::Added => "added",
            TrackedStatus::AddedToLibrary => "added_to_library",
            TrackedStatus::Other(s) => s,
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "added" => TrackedStatus::Added,
            "added_to_library" => TrackedStatus::AddedToLibrary,
            other => TrackedStatus::Other(other.to_string()),
        }
    }
}

impl Default for TrackedStatus {
    fn default() -> Self {
        TrackedStatus::Added
    }
}

impl fmt::Display for TrackedStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for TrackedStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for TrackedStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(TrackedStatus::parse(&raw))
    }
}

/// Classification metadata captured when the torrent was chosen.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryInfo {
    /// Library title; names the title folder.
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    /// External catalog id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
}

impl LibraryInfo {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}

/// A torrent added on the user's behalf.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedTorrent {
    pub id: u64,
    #[serde(default)]
    pub title: String,
    /// Human readable size, e.g. "1.2 GiB".
    #[serde(default)]
    pub size: String,
    #[serde(default)]
    pub seeds: u64,
    #[serde(default)]
    pub leechers: u64,
    #[serde(default)]
    pub downloads: u64,
    #[serde(default, alias = "infohash")]
    pub content_hash: String,
    #[serde(default)]
    pub category: String,
    #[serde(default, alias = "link")]
    pub source_link: String,
    #[serde(default)]
    pub download_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub library_path: Option<String>,
    #[serde(alias = "added_date", with = "super::timestamp")]
    pub added_at: DateTime<Utc>,
    #[serde(default)]
    pub status: TrackedStatus,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "super::timestamp::option"
    )]
    pub status_updated: Option<DateTime<Utc>>,
    #[serde(default, alias = "anilist_info", skip_serializing_if = "Option::is_none")]
    pub library_info: Option<LibraryInfo>,
}

impl TrackedTorrent {
    /// The classification title, if present and non-blank.
    pub fn library_title(&self) -> Option<&str> {
        self.library_info
            .as_ref()
            .map(|info| info.title.trim())
            .filter(|title| !title.is_empty())
    }

    /// Case-insensitive content hash comparison.
    pub fn has_content_hash(&self, hash: &str) -> bool {
        !self.content_hash.is_empty() && self.content_hash.eq_ignore_ascii_case(hash)
    }
}

/// Input for `TorrentStore::add`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewTrackedTorrent {
    pub title: String,
    #[serde(default)]
    pub size: String,
    #[serde(default)]
    pub seeds: u64,
    #[serde(default)]
    pub leechers: u64,
    #[serde(default)]
    pub downloads: u64,
    pub content_hash: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub source_link: String,
    #[serde(default)]
    pub download_path: String,
    #[serde(default)]
    pub library_info: Option<LibraryInfo>,
}

impl NewTrackedTorrent {
    pub fn new(title: impl Into<String>, content_hash: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content_hash: content_hash.into(),
            ..Self::default()
        }
    }

    pub fn with_library_info(mut self, info: LibraryInfo) -> Self {
        self.library_info = Some(info);
        self
    }

    pub fn with_download_path(mut self, path: impl Into<String>) -> Self {
        self.download_path = path.into();
        self
    }

    pub fn with_source_link(mut self, link: impl Into<String>) -> Self {
        self.source_link = link.into();
        self
    }

    pub(crate) fn into_tracked(self, id: u64, added_at: DateTime<Utc>) -> TrackedTorrent {
        TrackedTorrent {
            id,
            title: self.title,
            size: self.size,
            seeds: self.seeds,
            leechers: self.leechers,
            downloads: self.downloads,
            content_hash: self.content_hash,
            category: self.category,
            source_link: self.source_link,
            download_path: self.download_path,
            library_path: None,
            added_at,
            status: TrackedStatus::Added,
            status_updated: None,
            library_info: self.library_info,
        }
    }
}

/// Trait for tracked torrent storage backends.
pub trait TorrentStore: Send + Sync {
    /// All records in insertion order.
    fn list(&self) -> Result<Vec<TrackedTorrent>, StoreError>;

    fn get(&self, id: u64) -> Result<Option<TrackedTorrent>, StoreError>;

    /// Persist a new record and return its id.
    fn add(&self, entry: NewTrackedTorrent) -> Result<u64, StoreError>;

    fn update_status(&self, id: u64, status: TrackedStatus) -> Result<(), StoreError>;

    /// Record where the payload lives and where it was linked.
    fn update_paths(&self, id: u64, source_path: &str, library_path: &str)
        -> Result<(), StoreError>;

    /// Delete every record with the given content hash. Returns how many were removed.
    fn remove_by_content_hash(&self, hash: &str) -> Result<usize, StoreError>;
}
