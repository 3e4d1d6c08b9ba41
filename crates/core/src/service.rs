//! Foreground library operations.
//!
//! What an interactive surface needs: the tracked torrent view, adding a
//! torrent to the daemon and the store, listing and removing library titles
//! or single seasons, linking a local folder, the movie library, running a
//! monitor cycle on demand, and draining notifications.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::layout::{LayoutError, LibraryLayoutPlanner, TargetFolder};
use crate::linker::{
    cleanup_jellyfin_files, scan_library, LibraryLinker, LibraryTitle, LinkReport, LinkerError,
};
use crate::monitor::{CycleReport, LibraryMonitor};
use crate::movies::{AddMovieRequest, MovieEntry, MovieError, MovieLibrary};
use crate::reconcile::{
    summarize, ReconciliationEngine, StatusSummary, SyncError, SyncOutcome, SyncedTorrentView,
};
use crate::store::{
    CompletionNotification, LibraryInfo, NewTrackedTorrent, NotificationStore, StoreError,
    TorrentStore, TrackedTorrent,
};
use crate::torrent_client::{AddTorrentRequest, MagnetLink, TorrentClient, TorrentClientError};

/// Errors from foreground operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("daemon not accessible")]
    DaemonUnreachable,

    #[error("daemon error: {0}")]
    Daemon(#[from] TorrentClientError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("{0}")]
    Linker(#[from] LinkerError),

    #[error("no content hash given and none found in the link")]
    MissingContentHash,

    #[error("invalid library title: {0:?}")]
    InvalidTitle(String),

    #[error("library title not found: {0}")]
    TitleNotFound(String),

    #[error("no tracked torrent matches library title {0}")]
    TorrentNotLocated(String),

    #[error("{season} not found in library title {title}")]
    SeasonNotFound { title: String, season: String },

    #[error("season folder already exists: {0}")]
    SeasonExists(PathBuf),

    #[error("{0}")]
    Layout(#[from] LayoutError),

    #[error("movie library is not configured")]
    MoviesDisabled,

    #[error("{0}")]
    Movie(#[from] MovieError),
}

/// Tracked torrents merged with daemon status.
#[derive(Debug, Clone, Serialize)]
pub struct TrackedView {
    /// Set when the daemon could not be queried or reported nothing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub torrents: Vec<SyncedTorrentView>,
    pub summary: StatusSummary,
}

/// A torrent to add to the daemon and start tracking.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AddTrackedTorrent {
    /// Magnet URI or .torrent URL.
    pub link: String,
    /// Release title; defaults to the magnet display name.
    #[serde(default)]
    pub title: Option<String>,
    /// Required unless the link is a magnet URI.
    #[serde(default)]
    pub content_hash: Option<String>,
    /// Library title the finished download is filed under.
    pub library_title: String,
    #[serde(default)]
    pub library_year: Option<i32>,
    #[serde(default)]
    pub library_id: Option<u64>,
    #[serde(default)]
    pub save_path: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub seeds: u64,
    #[serde(default)]
    pub leechers: u64,
    #[serde(default)]
    pub downloads: u64,
}

/// What to do with the daemon's torrent when a library title is removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DaemonRemoval {
    /// Leave the daemon alone.
    #[default]
    Keep,
    /// Remove the torrent, keep downloaded files.
    RemoveTorrent,
    /// Remove the torrent and its downloaded files.
    RemoveTorrentAndFiles,
}

impl DaemonRemoval {
    pub fn from_flags(remove_torrent: bool, delete_files: bool) -> Self {
        match (remove_torrent, delete_files) {
            (false, _) => DaemonRemoval::Keep,
            (true, false) => DaemonRemoval::RemoveTorrent,
            (true, true) => DaemonRemoval::RemoveTorrentAndFiles,
        }
    }
}

/// Outcome of removing a library title.
#[derive(Debug, Clone, Serialize)]
pub struct TitleRemoval {
    pub title: String,
    pub path: PathBuf,
    /// Tracked torrent the title was linked from, when one was found.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub torrent_id: Option<u64>,
    pub records_removed: usize,
    pub daemon_torrent_removed: bool,
    /// Jellyfin metadata files deleted from the source folders.
    pub sidecars_removed: Vec<PathBuf>,
}

/// Outcome of removing one season folder.
#[derive(Debug, Clone, Serialize)]
pub struct SeasonRemoval {
    pub title: String,
    /// Folder name, e.g. `Season 02`.
    pub season: String,
    pub path: PathBuf,
    /// Media folders the title still holds.
    pub remaining: Vec<String>,
    /// The last season went, so the title folder went too.
    pub title_removed: bool,
    pub records_removed: usize,
    pub sidecars_removed: Vec<PathBuf>,
}

/// Link an existing local folder into the library as one season.
#[derive(Debug, Clone, Deserialize)]
pub struct LocalLinkRequest {
    pub source: PathBuf,
    pub title: String,
    /// Defaults to 1.
    #[serde(default)]
    pub season: Option<u32>,
    /// Replace an existing folder for the same season.
    #[serde(default)]
    pub overwrite: bool,
}

/// Outcome of linking a local folder.
#[derive(Debug, Clone, Serialize)]
pub struct LocalLink {
    pub title: String,
    pub path: PathBuf,
    pub season: String,
    pub episodes: usize,
    pub extras: usize,
    /// An existing season folder was replaced.
    pub replaced: bool,
    #[serde(flatten)]
    pub report: LinkReport,
}

/// Foreground operations over the shared components.
pub struct LibraryService {
    library_root: PathBuf,
    client: Arc<dyn TorrentClient>,
    store: Arc<dyn TorrentStore>,
    notifications: Arc<dyn NotificationStore>,
    engine: Arc<ReconciliationEngine>,
    planner: Arc<LibraryLayoutPlanner>,
    linker: Arc<LibraryLinker>,
    monitor: Arc<LibraryMonitor>,
    movies: Option<Arc<MovieLibrary>>,
}

impl LibraryService {
    pub fn new(
        client: Arc<dyn TorrentClient>,
        store: Arc<dyn TorrentStore>,
        notifications: Arc<dyn NotificationStore>,
        engine: Arc<ReconciliationEngine>,
        planner: Arc<LibraryLayoutPlanner>,
        linker: Arc<LibraryLinker>,
        monitor: Arc<LibraryMonitor>,
    ) -> Self {
        Self {
            library_root: linker.library_root().to_path_buf(),
            client,
            store,
            notifications,
            engine,
            planner,
            linker,
            monitor,
            movies: None,
        }
    }

    /// Enable the movie operations.
    pub fn with_movies(mut self, movies: Arc<MovieLibrary>) -> Self {
        self.movies = Some(movies);
        self
    }

    pub fn monitor(&self) -> &Arc<LibraryMonitor> {
        &self.monitor
    }

    /// Tracked torrents merged with live daemon status.
    ///
    /// Connectivity failures come back as `reason`, not as errors, together
    /// with the stored torrents marked as not found in the daemon.
    pub async fn tracked_view(&self) -> Result<TrackedView, ServiceError> {
        let (reason, torrents) = match self.engine.sync().await {
            Ok(SyncOutcome::Synced(views)) => (None, views),
            Ok(outcome @ SyncOutcome::DaemonEmpty) => {
                (outcome.reason().map(str::to_string), self.stored_views()?)
            }
            Err(SyncError::Store(e)) => return Err(e.into()),
            Err(e) => (Some(e.to_string()), self.stored_views()?),
        };

        Ok(TrackedView {
            summary: summarize(&torrents),
            reason,
            torrents,
        })
    }

    /// Add a torrent to the daemon, then record it in the store.
    pub async fn add_torrent(
        &self,
        request: AddTrackedTorrent,
    ) -> Result<TrackedTorrent, ServiceError> {
        let library_title = request.library_title.trim();
        if library_title.is_empty() {
            return Err(ServiceError::InvalidTitle(request.library_title.clone()));
        }

        let magnet = MagnetLink::parse(&request.link);
        let content_hash = request
            .content_hash
            .as_deref()
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .map(str::to_lowercase)
            .or_else(|| magnet.as_ref().map(|m| m.hash.clone()))
            .ok_or(ServiceError::MissingContentHash)?;
        let title = request
            .title
            .clone()
            .filter(|t| !t.trim().is_empty())
            .or_else(|| magnet.and_then(|m| m.display_name))
            .unwrap_or_else(|| library_title.to_string());

        if !self.client.check_reachable().await {
            return Err(ServiceError::DaemonUnreachable);
        }
        let session = self.client.authenticate().await?;

        let mut daemon_request = AddTorrentRequest::url(&request.link);
        if let Some(path) = &request.save_path {
            daemon_request = daemon_request.with_save_path(path);
        }
        if let Some(category) = &request.category {
            daemon_request = daemon_request.with_category(category);
        }
        let added = self.client.add_torrent(&session, daemon_request).await;
        self.client.logout(&session).await;
        added?;

        let mut entry = NewTrackedTorrent::new(title, content_hash)
            .with_source_link(&request.link)
            .with_download_path(request.save_path.clone().unwrap_or_default())
            .with_library_info(LibraryInfo {
                title: library_title.to_string(),
                year: request.library_year,
                id: request.library_id,
            });
        entry.size = request.size.clone().unwrap_or_default();
        entry.seeds = request.seeds;
        entry.leechers = request.leechers;
        entry.downloads = request.downloads;
        entry.category = request.category.clone().unwrap_or_default();

        let id = self.store.add(entry)?;
        info!(torrent_id = id, library_title, "Tracking new torrent");
        self.store
            .get(id)?
            .ok_or(ServiceError::Store(StoreError::NotFound(id)))
    }

    /// Titles currently in the library.
    pub async fn library(&self) -> Result<Vec<LibraryTitle>, ServiceError> {
        Ok(scan_library(&self.library_root).await?)
    }

    /// Remove a library title folder, its tracked record, and optionally the
    /// daemon's torrent.
    ///
    /// The daemon is handled first so a daemon failure leaves the library
    /// untouched. Unless the daemon deletes the files, Jellyfin sidecars are
    /// cleaned from the source folders afterwards.
    pub async fn remove_title(
        &self,
        title: &str,
        daemon: DaemonRemoval,
    ) -> Result<TitleRemoval, ServiceError> {
        let folder = self.title_folder(title)?;
        if tokio::fs::symlink_metadata(&folder).await.is_err() {
            return Err(ServiceError::TitleNotFound(title.to_string()));
        }

        let tracked = self.store.list()?;
        let torrent = self.linker.locate_torrent(&folder, &tracked).await;
        if torrent.is_none() {
            warn!(title, "No tracked torrent found for library title");
        }
        let sources = self.linker.link_sources(&folder).await;

        let daemon_torrent_removed = match (daemon, &torrent) {
            (DaemonRemoval::Keep, _) => false,
            (_, None) => return Err(ServiceError::TorrentNotLocated(title.to_string())),
            (_, Some(torrent)) if torrent.content_hash.trim().is_empty() => {
                warn!(title, torrent_id = torrent.id, "Tracked torrent has no content hash");
                return Err(ServiceError::TorrentNotLocated(title.to_string()));
            }
            (removal, Some(torrent)) => {
                self.remove_from_daemon(
                    &torrent.content_hash,
                    removal == DaemonRemoval::RemoveTorrentAndFiles,
                )
                .await?;
                true
            }
        };

        let records_removed = self.linker.remove(&folder, torrent.as_ref()).await?;
        let sidecars_removed = if daemon == DaemonRemoval::RemoveTorrentAndFiles {
            Vec::new()
        } else {
            clean_sidecars(&sources).await
        };
        info!(
            title,
            records_removed,
            daemon_torrent_removed,
            sidecars = sidecars_removed.len(),
            "Removed library title"
        );

        Ok(TitleRemoval {
            title: title.to_string(),
            path: folder,
            torrent_id: torrent.map(|t| t.id),
            records_removed,
            daemon_torrent_removed,
            sidecars_removed,
        })
    }

    /// Remove one season folder of a library title.
    ///
    /// When no media folders are left the whole title goes, together with
    /// its tracked record, and the source folders are cleared of Jellyfin
    /// sidecar files. The daemon is never touched.
    pub async fn remove_season(
        &self,
        title: &str,
        season: u32,
    ) -> Result<SeasonRemoval, ServiceError> {
        let folder = self.title_folder(title)?;
        if tokio::fs::symlink_metadata(&folder).await.is_err() {
            return Err(ServiceError::TitleNotFound(title.to_string()));
        }
        let season_name = TargetFolder::season(season).folder_name();

        // Both need the links that are about to go.
        let tracked = self.store.list()?;
        let torrent = self.linker.locate_torrent(&folder, &tracked).await;
        let sources = self.linker.link_sources(&folder).await;

        let remaining = match self.linker.remove_season(&folder, &season_name).await {
            Err(LinkerError::NotFound(_)) => {
                return Err(ServiceError::SeasonNotFound {
                    title: title.to_string(),
                    season: season_name,
                })
            }
            other => other?,
        };

        let mut removal = SeasonRemoval {
            title: title.to_string(),
            path: folder.join(&season_name),
            season: season_name,
            remaining,
            title_removed: false,
            records_removed: 0,
            sidecars_removed: Vec::new(),
        };
        if removal.remaining.is_empty() {
            removal.records_removed = self.linker.remove(&folder, torrent.as_ref()).await?;
            removal.title_removed = true;
            removal.sidecars_removed = clean_sidecars(&sources).await;
        }

        info!(
            title,
            season = %removal.season,
            remaining = removal.remaining.len(),
            title_removed = removal.title_removed,
            "Removed library season"
        );
        Ok(removal)
    }

    /// Link the videos of a local folder into `title` as one season.
    ///
    /// Top-level videos become the season; videos in immediate subfolders
    /// become specials. No provenance record is written.
    pub async fn link_local_folder(
        &self,
        request: LocalLinkRequest,
    ) -> Result<LocalLink, ServiceError> {
        let season = request.season.unwrap_or(1);
        let plan = self
            .planner
            .plan_local(&request.source, &request.title, season)
            .await?;

        let kind = TargetFolder::season(season);
        let season_name = kind.folder_name();
        let season_folder = plan.library_root.join(&season_name);
        let replaced = tokio::fs::symlink_metadata(&season_folder).await.is_ok();
        if replaced {
            if !request.overwrite {
                return Err(ServiceError::SeasonExists(season_folder));
            }
            self.linker
                .remove_season(&plan.library_root, &season_name)
                .await?;
        }

        let report = self.linker.link_plan(&plan).await?;
        let count = |wanted: TargetFolder| {
            plan.folders
                .iter()
                .filter(|f| f.kind == wanted)
                .map(|f| f.files.len())
                .sum::<usize>()
        };
        let link = LocalLink {
            title: plan
                .library_root
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            episodes: count(kind),
            extras: count(TargetFolder::Specials),
            path: plan.library_root.clone(),
            season: season_name,
            replaced,
            report,
        };
        info!(
            title = %link.title,
            season = %link.season,
            source = %request.source.display(),
            episodes = link.episodes,
            extras = link.extras,
            "Linked local folder"
        );
        Ok(link)
    }

    /// Movies in the movie library.
    pub async fn list_movies(&self) -> Result<Vec<MovieEntry>, ServiceError> {
        Ok(self.movies()?.list().await?)
    }

    /// Link a movie file into the movie library.
    pub async fn add_movie(&self, request: AddMovieRequest) -> Result<MovieEntry, ServiceError> {
        Ok(self
            .movies()?
            .add(&request.source, request.overwrite)
            .await?)
    }

    /// Remove a movie link; the movie file itself stays.
    pub async fn remove_movie(&self, name: &str) -> Result<MovieEntry, ServiceError> {
        Ok(self.movies()?.remove(name).await?)
    }

    /// Run one monitor cycle now.
    pub async fn run_cycle_now(&self) -> CycleReport {
        self.monitor.run_cycle().await
    }

    /// Pending completion notifications; clears them.
    pub fn take_notifications(&self) -> Result<Vec<CompletionNotification>, ServiceError> {
        Ok(self.notifications.take_pending()?)
    }

    fn movies(&self) -> Result<&MovieLibrary, ServiceError> {
        self.movies.as_deref().ok_or(ServiceError::MoviesDisabled)
    }

    fn stored_views(&self) -> Result<Vec<SyncedTorrentView>, ServiceError> {
        Ok(self
            .store
            .list()?
            .into_iter()
            .map(SyncedTorrentView::not_found)
            .collect())
    }

    async fn remove_from_daemon(&self, hash: &str, delete_files: bool) -> Result<(), ServiceError> {
        if !self.client.check_reachable().await {
            return Err(ServiceError::DaemonUnreachable);
        }
        let session = self.client.authenticate().await?;
        let removed = self
            .client
            .remove_torrent(&session, hash, delete_files)
            .await;
        self.client.logout(&session).await;
        removed?;
        info!(hash, delete_files, "Removed torrent from daemon");
        Ok(())
    }

    /// `root/<title>`, where `title` must be a single plain path component.
    fn title_folder(&self, title: &str) -> Result<PathBuf, ServiceError> {
        let mut components = Path::new(title).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => Ok(self.library_root.join(title)),
            _ => Err(ServiceError::InvalidTitle(title.to_string())),
        }
    }
}

/// Clear Jellyfin sidecars from each source folder; failures are logged.
async fn clean_sidecars(sources: &[PathBuf]) -> Vec<PathBuf> {
    let mut removed = Vec::new();
    for dir in sources {
        match cleanup_jellyfin_files(dir).await {
            Ok(files) => removed.extend(files),
            Err(e) => warn!(path = %dir.display(), error = %e, "Failed to clean source folder"),
        }
    }
    removed
}
