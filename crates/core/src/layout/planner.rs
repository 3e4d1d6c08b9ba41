//! Layout planning for finished downloads.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::fs;
use tracing::{debug, warn};

use crate::config::LibraryConfig;
use crate::metrics;
use crate::probe::DurationProbe;
use crate::store::TrackedTorrent;

use super::patterns::sanitize_title;
use super::{
    FileFacts, LayoutError, LayoutStrategy, LayoutPlan, PlannedFile, PlannedFolder, TargetFolder,
};

/// A video file found in a download, with its enclosing folder names.
#[derive(Debug)]
struct FoundFile {
    path: PathBuf,
    file_name: String,
    /// Nearest first, ending with the download folder's name.
    dir_components: Vec<String>,
}

/// Computes where each video file of a finished download goes in the library.
pub struct LibraryLayoutPlanner {
    library_root: PathBuf,
    video_extensions: Vec<String>,
    movie_min_duration_secs: u64,
    strategy: Arc<dyn LayoutStrategy>,
    probe: Arc<dyn DurationProbe>,
}

impl LibraryLayoutPlanner {
    pub fn new(
        config: &LibraryConfig,
        strategy: Arc<dyn LayoutStrategy>,
        probe: Arc<dyn DurationProbe>,
    ) -> Self {
        Self {
            library_root: config.root.clone(),
            video_extensions: config
                .video_extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_lowercase())
                .collect(),
            movie_min_duration_secs: config.movie_min_duration_secs,
            strategy,
            probe,
        }
    }

    pub fn strategy_name(&self) -> &str {
        self.strategy.name()
    }

    /// Title folder for a torrent: `<library root>/<sanitized title>`.
    pub fn title_root(&self, torrent: &TrackedTorrent) -> Result<PathBuf, LayoutError> {
        let title = torrent
            .library_title()
            .map(sanitize_title)
            .filter(|t| !t.is_empty())
            .ok_or(LayoutError::MissingTitle)?;
        Ok(self.library_root.join(title))
    }

    /// Plan the library layout for `download_path`.
    ///
    /// Returns `None` when the torrent has no usable title or the download
    /// cannot be listed. A plan with no files means nothing linkable was found.
    pub async fn plan(&self, torrent: &TrackedTorrent, download_path: &Path) -> Option<LayoutPlan> {
        match self.try_plan(torrent, download_path).await {
            Ok(plan) => Some(plan),
            Err(e) => {
                warn!(
                    torrent_id = torrent.id,
                    path = %download_path.display(),
                    error = %e,
                    "Cannot plan library layout"
                );
                None
            }
        }
    }

    async fn try_plan(
        &self,
        torrent: &TrackedTorrent,
        download_path: &Path,
    ) -> Result<LayoutPlan, LayoutError> {
        let library_root = self.title_root(torrent)?;
        let found = self.collect_videos(download_path).await?;

        let mut grouped: BTreeMap<TargetFolder, Vec<PlannedFile>> = BTreeMap::new();
        let mut seen_targets = HashSet::new();

        for file in found {
            let duration_secs = match self.probe.duration_secs(&file.path).await {
                Ok(d) => Some(d),
                Err(e) => {
                    metrics::PROBE_FAILURES.with_label_values(&[e.kind()]).inc();
                    debug!(path = %file.path.display(), error = %e, "Duration unknown");
                    None
                }
            };

            let facts = FileFacts {
                file_name: file.file_name,
                dir_components: file.dir_components,
                duration_secs,
                movie_min_duration_secs: self.movie_min_duration_secs,
            };
            let folder = self.strategy.place(&facts);
            let target = library_root.join(folder.folder_name()).join(&facts.file_name);

            if !seen_targets.insert(target.clone()) {
                warn!(
                    source = %file.path.display(),
                    target = %target.display(),
                    "Another file already maps to this library path; skipping"
                );
                continue;
            }

            debug!(
                source = %file.path.display(),
                folder = %folder,
                "Planned library link"
            );
            grouped.entry(folder).or_default().push(PlannedFile {
                source: file.path,
                target,
            });
        }

        let folders = grouped
            .into_iter()
            .map(|(kind, files)| PlannedFolder {
                kind,
                path: library_root.join(kind.folder_name()),
                files,
            })
            .collect();

        Ok(LayoutPlan {
            library_root,
            folders,
        })
    }

    /// Plan links for a folder the user already has on disk.
    ///
    /// Video files directly inside `source` go to `Season {season}`. Video
    /// files one level down go to `Season 00`, prefixed with their folder
    /// name so extras from different folders cannot collide. Durations are
    /// not looked at.
    pub async fn plan_local(
        &self,
        source: &Path,
        title: &str,
        season: u32,
    ) -> Result<LayoutPlan, LayoutError> {
        if season == 0 {
            return Err(LayoutError::InvalidSeason(season));
        }
        let name = sanitize_title(title);
        if name.is_empty() || name == "." || name == ".." {
            return Err(LayoutError::InvalidTitle(title.to_string()));
        }
        let library_root = self.library_root.join(name);

        let source = fs::canonicalize(source)
            .await
            .map_err(|e| LayoutError::Unreadable {
                path: source.to_path_buf(),
                source: e,
            })?;
        let (episodes, subfolders) = self.list_local(&source).await?;
        if episodes.is_empty() {
            return Err(LayoutError::NoVideos(source));
        }

        let season_folder = TargetFolder::Season(season);
        let season_path = library_root.join(season_folder.folder_name());
        let mut folders = vec![PlannedFolder {
            kind: season_folder,
            files: episodes
                .into_iter()
                .map(|(file_name, path)| PlannedFile {
                    target: season_path.join(file_name),
                    source: path,
                })
                .collect(),
            path: season_path,
        }];

        let specials_path = library_root.join(TargetFolder::Specials.folder_name());
        let mut extras = Vec::new();
        for (folder_name, folder) in subfolders {
            let (videos, _) = match self.list_local(&folder).await {
                Ok(listing) => listing,
                Err(e) => {
                    warn!(
                        path = %folder.display(),
                        error = %e,
                        "Skipping unreadable extras folder"
                    );
                    continue;
                }
            };
            for (file_name, path) in videos {
                extras.push(PlannedFile {
                    target: specials_path.join(format!("{folder_name} - {file_name}")),
                    source: path,
                });
            }
        }
        if !extras.is_empty() {
            folders.push(PlannedFolder {
                kind: TargetFolder::Specials,
                path: specials_path,
                files: extras,
            });
        }

        Ok(LayoutPlan {
            library_root,
            folders,
        })
    }

    /// Video files and subfolders directly inside `dir`, each sorted by name.
    async fn list_local(
        &self,
        dir: &Path,
    ) -> Result<(Vec<(String, PathBuf)>, Vec<(String, PathBuf)>), LayoutError> {
        let unreadable = |source| LayoutError::Unreadable {
            path: dir.to_path_buf(),
            source,
        };

        let mut entries = fs::read_dir(dir).await.map_err(unreadable)?;
        let mut videos = Vec::new();
        let mut subfolders = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(unreadable)? {
            let name = entry.file_name().to_string_lossy().into_owned();
            // Follows symlinks, so linked-in episodes count too.
            let Ok(metadata) = fs::metadata(entry.path()).await else {
                continue;
            };
            if metadata.is_dir() {
                subfolders.push((name, entry.path()));
            } else if metadata.is_file() && self.is_video(&name) {
                videos.push((name, entry.path()));
            }
        }
        videos.sort();
        subfolders.sort();
        Ok((videos, subfolders))
    }

    fn is_video(&self, name: &str) -> bool {
        Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .is_some_and(|e| self.video_extensions.contains(&e))
    }

    /// Walk the download and collect every video file, sorted by path.
    ///
    /// Only the top-level listing is fatal; unreadable subfolders are skipped.
    async fn collect_videos(&self, download_path: &Path) -> Result<Vec<FoundFile>, LayoutError> {
        let unreadable = |source| LayoutError::Unreadable {
            path: download_path.to_path_buf(),
            source,
        };

        let metadata = fs::metadata(download_path).await.map_err(unreadable)?;
        let root_name = download_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        if metadata.is_file() {
            if !self.is_video(&root_name) {
                return Ok(Vec::new());
            }
            return Ok(vec![FoundFile {
                path: download_path.to_path_buf(),
                file_name: root_name,
                dir_components: Vec::new(),
            }]);
        }

        let mut found = Vec::new();
        let mut pending = vec![(download_path.to_path_buf(), vec![root_name])];
        let mut is_root = true;

        while let Some((dir, components)) = pending.pop() {
            let mut entries = match fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if is_root => return Err(unreadable(e)),
                Err(e) => {
                    warn!(path = %dir.display(), error = %e, "Skipping unreadable folder");
                    continue;
                }
            };
            is_root = false;

            loop {
                let entry = match entries.next_entry().await {
                    Ok(Some(entry)) => entry,
                    Ok(None) => break,
                    Err(e) => {
                        warn!(path = %dir.display(), error = %e, "Folder listing interrupted");
                        break;
                    }
                };

                let file_type = match entry.file_type().await {
                    Ok(t) => t,
                    Err(_) => continue,
                };
                let name = entry.file_name().to_string_lossy().into_owned();

                if file_type.is_dir() {
                    let mut child = Vec::with_capacity(components.len() + 1);
                    child.push(name);
                    child.extend(components.iter().cloned());
                    pending.push((entry.path(), child));
                } else if file_type.is_file() && self.is_video(&name) {
                    found.push(FoundFile {
                        path: entry.path(),
                        file_name: name,
                        dir_components: components.clone(),
                    });
                }
            }
        }

        found.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(found)
    }
}
