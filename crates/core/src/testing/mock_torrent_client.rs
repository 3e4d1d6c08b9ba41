//! Mock torrent client for testing.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::torrent_client::{
    AddTorrentRequest, DaemonState, DaemonTorrent, Session, TorrentClient, TorrentClientError,
};

/// A recorded torrent addition for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedAddTorrent {
    /// The request that was made.
    pub request: AddTorrentRequest,
    /// When the request was made.
    pub timestamp: chrono::DateTime<Utc>,
}

/// A recorded torrent removal for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRemoval {
    pub hash: String,
    pub delete_files: bool,
}

/// Mock implementation of the TorrentClient trait.
///
/// Provides controllable behavior for testing:
/// - Script the daemon listing
/// - Simulate an unreachable daemon or rejected credentials
/// - Record adds, removals and logouts for assertions
///
/// # Example
///
/// ```rust,ignore
/// let client = MockTorrentClient::new();
/// client
///     .add_daemon_torrent(fixtures::daemon_torrent("abcd", DaemonState::Uploading, "/dl", "Show"))
///     .await;
///
/// let session = client.authenticate().await?;
/// assert_eq!(client.list_torrents(&session).await?.len(), 1);
///
/// client.set_reachable(false).await;
/// assert!(!client.check_reachable().await);
/// ```
#[derive(Debug)]
pub struct MockTorrentClient {
    /// Torrents returned by `list_torrents`.
    torrents: Arc<RwLock<Vec<DaemonTorrent>>>,
    reachable: Arc<RwLock<bool>>,
    reject_login: Arc<RwLock<bool>>,
    /// If set, the next data operation will fail with this error.
    next_error: Arc<RwLock<Option<TorrentClientError>>>,
    added: Arc<RwLock<Vec<RecordedAddTorrent>>>,
    removed: Arc<RwLock<Vec<RecordedRemoval>>>,
    logins: Arc<RwLock<u32>>,
    logouts: Arc<RwLock<u32>>,
}

impl Default for MockTorrentClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTorrentClient {
    /// Create a reachable mock daemon with no torrents.
    pub fn new() -> Self {
        Self {
            torrents: Arc::new(RwLock::new(Vec::new())),
            reachable: Arc::new(RwLock::new(true)),
            reject_login: Arc::new(RwLock::new(false)),
            next_error: Arc::new(RwLock::new(None)),
            added: Arc::new(RwLock::new(Vec::new())),
            removed: Arc::new(RwLock::new(Vec::new())),
            logins: Arc::new(RwLock::new(0)),
            logouts: Arc::new(RwLock::new(0)),
        }
    }

    /// Add a torrent to the daemon listing.
    pub async fn add_daemon_torrent(&self, torrent: DaemonTorrent) {
        self.torrents.write().await.push(torrent);
    }

    /// Replace the daemon listing.
    pub async fn set_torrents(&self, torrents: Vec<DaemonTorrent>) {
        *self.torrents.write().await = torrents;
    }

    /// Set the state of a listed torrent.
    pub async fn set_state(&self, hash: &str, state: DaemonState) {
        let mut torrents = self.torrents.write().await;
        if let Some(torrent) = torrents.iter_mut().find(|t| t.hash.eq_ignore_ascii_case(hash)) {
            torrent.state = state;
            if state.is_library_ready() {
                torrent.progress = 1.0;
                torrent.downloaded_bytes = torrent.size_bytes;
                torrent.eta_secs = None;
            }
        }
    }

    pub async fn set_reachable(&self, reachable: bool) {
        *self.reachable.write().await = reachable;
    }

    /// Make every login attempt fail with rejected credentials.
    pub async fn set_reject_login(&self, reject: bool) {
        *self.reject_login.write().await = reject;
    }

    /// Make the next list/add/remove call fail with `error`.
    pub async fn set_next_error(&self, error: TorrentClientError) {
        *self.next_error.write().await = Some(error);
    }

    /// Get all recorded add_torrent calls.
    pub async fn added_torrents(&self) -> Vec<RecordedAddTorrent> {
        self.added.read().await.clone()
    }

    /// Get all recorded remove_torrent calls.
    pub async fn removed_torrents(&self) -> Vec<RecordedRemoval> {
        self.removed.read().await.clone()
    }

    pub async fn login_count(&self) -> u32 {
        *self.logins.read().await
    }

    pub async fn logout_count(&self) -> u32 {
        *self.logouts.read().await
    }

    async fn take_error(&self) -> Result<(), TorrentClientError> {
        match self.next_error.write().await.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl TorrentClient for MockTorrentClient {
    fn name(&self) -> &str {
        "mock"
    }

    async fn check_reachable(&self) -> bool {
        *self.reachable.read().await
    }

    async fn authenticate(&self) -> Result<Session, TorrentClientError> {
        if !*self.reachable.read().await {
            return Err(TorrentClientError::ConnectionFailed(
                "mock daemon unreachable".to_string(),
            ));
        }
        if *self.reject_login.read().await {
            return Err(TorrentClientError::AuthenticationFailed(
                "Invalid credentials".to_string(),
            ));
        }
        *self.logins.write().await += 1;
        Ok(Session::new("mock-sid"))
    }

    async fn list_torrents(
        &self,
        _session: &Session,
    ) -> Result<Vec<DaemonTorrent>, TorrentClientError> {
        self.take_error().await?;
        Ok(self.torrents.read().await.clone())
    }

    async fn add_torrent(
        &self,
        _session: &Session,
        request: AddTorrentRequest,
    ) -> Result<(), TorrentClientError> {
        self.take_error().await?;
        self.added.write().await.push(RecordedAddTorrent {
            request,
            timestamp: Utc::now(),
        });
        Ok(())
    }

    async fn remove_torrent(
        &self,
        _session: &Session,
        hash: &str,
        delete_files: bool,
    ) -> Result<(), TorrentClientError> {
        self.take_error().await?;
        self.torrents
            .write()
            .await
            .retain(|t| !t.hash.eq_ignore_ascii_case(hash));
        self.removed.write().await.push(RecordedRemoval {
            hash: hash.to_string(),
            delete_files,
        });
        Ok(())
    }

    async fn logout(&self, _session: &Session) {
        *self.logouts.write().await += 1;
    }
}
