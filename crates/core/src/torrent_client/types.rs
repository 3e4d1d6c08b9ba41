//! Types for torrent daemon operations.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::DaemonState;

/// Errors that can occur while talking to the torrent daemon.
#[derive(Debug, Error)]
pub enum TorrentClientError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Daemon unavailable: HTTP {0}")]
    Unavailable(u16),

    #[error("Daemon rejected request: {0}")]
    Rejected(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl TorrentClientError {
    /// Whether the failure is transient and worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ConnectionFailed(_) | Self::Timeout | Self::Unavailable(_)
        )
    }
}

impl From<reqwest::Error> for TorrentClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TorrentClientError::Timeout
        } else if e.is_connect() {
            TorrentClientError::ConnectionFailed(e.to_string())
        } else {
            TorrentClientError::ApiError(e.to_string())
        }
    }
}

/// An authenticated daemon session.
///
/// Holds the session cookie handed out at login. Daemons that whitelist the
/// caller (no auth required) produce a session without a cookie.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    cookie: Option<String>,
}

impl Session {
    /// Session carrying the given cookie value.
    pub fn new(cookie: impl Into<String>) -> Self {
        Self {
            cookie: Some(cookie.into()),
        }
    }

    /// Session for a daemon that does not require a cookie.
    pub fn anonymous() -> Self {
        Self { cookie: None }
    }

    pub fn cookie(&self) -> Option<&str> {
        self.cookie.as_deref()
    }
}

/// Live status of one torrent as reported by the daemon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaemonTorrent {
    /// Content hash (lowercase hex).
    pub hash: String,
    /// Daemon-side name; for multi-file torrents this is the folder name.
    pub name: String,
    /// Current state.
    pub state: DaemonState,
    /// Download progress (0.0 - 1.0).
    pub progress: f64,
    /// Downloaded bytes.
    pub downloaded_bytes: u64,
    /// Total size in bytes.
    pub size_bytes: u64,
    /// Current download speed in bytes/second.
    pub download_speed: u64,
    /// Current upload speed in bytes/second.
    pub upload_speed: u64,
    /// ETA in seconds (None if unknown or complete).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eta_secs: Option<u64>,
    /// Share ratio (uploaded/downloaded).
    pub ratio: f64,
    /// Base download directory; empty if the daemon did not report one.
    pub save_path: String,
    /// Category/label.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

/// Request to add a torrent by URL or magnet link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddTorrentRequest {
    /// Torrent file URL or magnet URI.
    pub url: String,
    /// Optional download path override.
    pub save_path: Option<String>,
    /// Optional category/label.
    pub category: Option<String>,
}

impl AddTorrentRequest {
    /// Create a request with default options.
    pub fn url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            save_path: None,
            category: None,
        }
    }

    /// Set the download path.
    pub fn with_save_path(mut self, path: impl Into<String>) -> Self {
        self.save_path = Some(path.into());
        self
    }

    /// Set the category.
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
}

/// Trait for torrent daemon backends.
#[async_trait]
pub trait TorrentClient: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &str;

    /// Lightweight health check. Short timeout, never retried.
    async fn check_reachable(&self) -> bool;

    /// Log in and obtain a session.
    async fn authenticate(&self) -> Result<Session, TorrentClientError>;

    /// List every torrent known to the daemon.
    async fn list_torrents(&self, session: &Session)
        -> Result<Vec<DaemonTorrent>, TorrentClientError>;

    /// Add a torrent.
    async fn add_torrent(
        &self,
        session: &Session,
        request: AddTorrentRequest,
    ) -> Result<(), TorrentClientError>;

    /// Remove a torrent.
    /// If `delete_files` is true, also delete downloaded files.
    async fn remove_torrent(
        &self,
        session: &Session,
        hash: &str,
        delete_files: bool,
    ) -> Result<(), TorrentClientError>;

    /// End the session. Best effort.
    async fn logout(&self, session: &Session);
}
