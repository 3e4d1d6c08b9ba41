//! Symlink-based library linker.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::fs;
use tracing::{debug, info, warn};

use crate::layout::LayoutPlan;
use crate::metrics;
use crate::store::{TorrentStore, TrackedTorrent};

use super::inventory::{all_link_targets, first_link_targets, media_folder_names};
use super::provenance::{find_provenance, normalize_path, ProvenanceRecord};
use super::{LinkReport, LinkerError};

/// Applies layout plans to the library and removes title folders.
pub struct LibraryLinker {
    library_root: PathBuf,
    store: Arc<dyn TorrentStore>,
}

impl LibraryLinker {
    pub fn new(library_root: impl Into<PathBuf>, store: Arc<dyn TorrentStore>) -> Self {
        Self {
            library_root: library_root.into(),
            store,
        }
    }

    pub fn library_root(&self) -> &Path {
        &self.library_root
    }

    /// Create every planned symlink, then write `track.json`.
    ///
    /// Idempotent: existing targets count as already linked. Fails if a
    /// folder cannot be created or nothing ends up in the library.
    pub async fn apply(
        &self,
        plan: &LayoutPlan,
        torrent: &TrackedTorrent,
        source_download_path: &Path,
    ) -> Result<LinkReport, LinkerError> {
        let report = self.link_plan(plan).await?;

        let record = ProvenanceRecord::new(torrent, source_download_path, &plan.library_root);
        if let Err(e) = record.write(&plan.library_root).await {
            warn!(
                path = %plan.library_root.display(),
                error = %e,
                "Failed to write provenance record"
            );
        }

        info!(
            torrent_id = torrent.id,
            library_path = %plan.library_root.display(),
            linked = report.linked,
            already_linked = report.already_linked,
            failed = report.failed,
            "Applied library layout"
        );
        Ok(report)
    }

    /// Create every planned symlink without recording provenance.
    pub async fn link_plan(&self, plan: &LayoutPlan) -> Result<LinkReport, LinkerError> {
        let mut report = LinkReport::default();

        for folder in &plan.folders {
            fs::create_dir_all(&folder.path)
                .await
                .map_err(|source| LinkerError::CreateDir {
                    path: folder.path.clone(),
                    source,
                })?;

            for file in &folder.files {
                if fs::symlink_metadata(&file.target).await.is_ok() {
                    report.already_linked += 1;
                    continue;
                }

                match create_symlink(&file.source, &file.target).await {
                    Ok(()) => {
                        debug!(
                            source = %file.source.display(),
                            target = %file.target.display(),
                            "Linked"
                        );
                        report.linked += 1;
                    }
                    Err(e) => {
                        warn!(
                            source = %file.source.display(),
                            target = %file.target.display(),
                            error = %e,
                            "Failed to create library symlink"
                        );
                        report.failed += 1;
                    }
                }
            }
        }

        metrics::FILES_LINKED
            .with_label_values(&["linked"])
            .inc_by(report.linked as u64);
        metrics::FILES_LINKED
            .with_label_values(&["already_linked"])
            .inc_by(report.already_linked as u64);
        metrics::FILES_LINKED
            .with_label_values(&["failed"])
            .inc_by(report.failed as u64);

        if report.present() == 0 {
            return Err(LinkerError::NothingLinked {
                path: plan.library_root.clone(),
                failed: report.failed,
            });
        }
        Ok(report)
    }

    /// Find the tracked torrent behind a library title folder.
    ///
    /// Tries `track.json` first, then matches the download folder implied by
    /// the folder's symlinks against tracked download paths.
    pub async fn locate_torrent(
        &self,
        folder: &Path,
        tracked: &[TrackedTorrent],
    ) -> Option<TrackedTorrent> {
        if let Some(found) = find_provenance(folder, tracked).await {
            return Some(found);
        }

        for target in first_link_targets(folder).await {
            // The link itself, its folder, then one level up for nested extras.
            for candidate in target.ancestors().take(3) {
                let candidate = normalize_path(candidate);
                if candidate.parent().is_none() {
                    break;
                }
                if let Some(found) = tracked.iter().find(|t| {
                    !t.download_path.trim().is_empty()
                        && normalize_path(&t.download_path) == candidate
                }) {
                    debug!(
                        folder = %folder.display(),
                        torrent_id = found.id,
                        "Matched library folder by symlink target"
                    );
                    return Some(found.clone());
                }
            }
        }

        None
    }

    /// Delete a library title folder and the tracked records of `torrent`.
    ///
    /// Only links live under the library, so original media is untouched.
    /// Completed steps are not rolled back. Returns how many store records
    /// were removed.
    pub async fn remove(
        &self,
        folder: &Path,
        torrent: Option<&TrackedTorrent>,
    ) -> Result<usize, LinkerError> {
        let folder = self.check_removable(folder).await?;

        let metadata = fs::symlink_metadata(&folder)
            .await
            .map_err(|_| LinkerError::NotFound(folder.clone()))?;

        let removed = if metadata.is_dir() {
            fs::remove_dir_all(&folder).await
        } else {
            fs::remove_file(&folder).await
        };
        removed.map_err(|source| LinkerError::Remove {
            path: folder.clone(),
            source,
        })?;
        info!(path = %folder.display(), "Removed library folder");

        let Some(torrent) = torrent else {
            return Ok(0);
        };
        if torrent.content_hash.is_empty() {
            return Ok(0);
        }

        let records = self.store.remove_by_content_hash(&torrent.content_hash)?;
        info!(
            torrent_id = torrent.id,
            records, "Removed tracked torrent records"
        );
        Ok(records)
    }

    /// Delete one `Season NN` (or `Movies`) folder of a title.
    ///
    /// Returns the media folders the title still has. The title folder itself
    /// is left alone.
    pub async fn remove_season(
        &self,
        title_folder: &Path,
        folder_name: &str,
    ) -> Result<Vec<String>, LinkerError> {
        let folder = self.check_removable(&title_folder.join(folder_name)).await?;
        let parent = folder.parent().unwrap_or(folder.as_path());
        if normalize_path(parent) != normalize_path(title_folder) {
            return Err(LinkerError::OutsideLibrary(folder));
        }

        let metadata = fs::symlink_metadata(&folder)
            .await
            .map_err(|_| LinkerError::NotFound(folder.clone()))?;
        let removed = if metadata.is_dir() {
            fs::remove_dir_all(&folder).await
        } else {
            fs::remove_file(&folder).await
        };
        removed.map_err(|source| LinkerError::Remove {
            path: folder.clone(),
            source,
        })?;
        info!(path = %folder.display(), "Removed library season folder");

        Ok(media_folder_names(title_folder).await)
    }

    /// Folders outside the library that the title's symlinks point into.
    ///
    /// Collected before a removal so leftovers can be cleaned up afterwards.
    pub async fn link_sources(&self, title_folder: &Path) -> Vec<PathBuf> {
        let root = normalize_path(&self.library_root);
        let mut sources: Vec<PathBuf> = Vec::new();
        for target in all_link_targets(title_folder).await {
            let Some(parent) = target.parent() else {
                continue;
            };
            let parent = normalize_path(parent);
            if parent.starts_with(&root) || !parent.is_absolute() {
                continue;
            }
            if !sources.contains(&parent) {
                sources.push(parent);
            }
        }
        sources
    }

    /// Refuse the library root itself and anything outside it.
    async fn check_removable(&self, folder: &Path) -> Result<PathBuf, LinkerError> {
        let root = normalize_path(&self.library_root);
        let target = normalize_path(folder);

        if target == root {
            return Err(LinkerError::RefusedRoot(target));
        }
        if !target.starts_with(&root) {
            return Err(LinkerError::OutsideLibrary(target));
        }

        // Resolve symlinked parents so `root/link/..` style paths cannot escape.
        if let (Ok(real_root), Some(parent)) = (fs::canonicalize(&root).await, target.parent()) {
            if let Ok(real_parent) = fs::canonicalize(parent).await {
                if !real_parent.starts_with(&real_root) {
                    return Err(LinkerError::OutsideLibrary(target));
                }
                if real_parent.join(target.file_name().unwrap_or_default()) == real_root {
                    return Err(LinkerError::RefusedRoot(target));
                }
            }
        }

        Ok(target)
    }
}

#[cfg(unix)]
pub(crate) async fn create_symlink(source: &Path, target: &Path) -> std::io::Result<()> {
    fs::symlink(source, target).await
}

#[cfg(windows)]
pub(crate) async fn create_symlink(source: &Path, target: &Path) -> std::io::Result<()> {
    fs::symlink_file(source, target).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{PlannedFile, PlannedFolder, TargetFolder};
    use crate::linker::PROVENANCE_FILE;
    use crate::store::JsonTorrentStore;
    use crate::testing::fixtures;
    use tempfile::TempDir;

    struct Fixture {
        downloads: TempDir,
        library: TempDir,
        store: Arc<JsonTorrentStore>,
        linker: LibraryLinker,
    }

    fn fixture() -> Fixture {
        let downloads = TempDir::new().unwrap();
        let library = TempDir::new().unwrap();
        let store = Arc::new(JsonTorrentStore::new(downloads.path().join("db.json")));
        let linker = LibraryLinker::new(library.path(), store.clone());
        Fixture {
            downloads,
            library,
            store,
            linker,
        }
    }

    fn plan_for(f: &Fixture, files: &[(&str, TargetFolder)]) -> LayoutPlan {
        let root = f.library.path().join("Example Show");
        let mut folders: Vec<PlannedFolder> = Vec::new();
        for (name, kind) in files {
            let source = f.downloads.path().join("Example.Show.S01").join(name);
            std::fs::create_dir_all(source.parent().unwrap()).unwrap();
            std::fs::write(&source, b"video").unwrap();
            let path = root.join(kind.folder_name());
            let planned = PlannedFile {
                target: path.join(source.file_name().unwrap()),
                source,
            };
            match folders.iter_mut().find(|p| p.kind == *kind) {
                Some(folder) => folder.files.push(planned),
                None => folders.push(PlannedFolder {
                    kind: *kind,
                    path,
                    files: vec![planned],
                }),
            }
        }
        LayoutPlan {
            library_root: root,
            folders,
        }
    }

    #[tokio::test]
    async fn test_apply_creates_links_and_provenance() {
        let f = fixture();
        let plan = plan_for(
            &f,
            &[
                ("ep01.mkv", TargetFolder::Season(1)),
                ("ep02.mkv", TargetFolder::Season(1)),
                ("omake.mkv", TargetFolder::Specials),
            ],
        );
        let torrent = fixtures::tracked_torrent(1, "ABCD", "Example Show");
        let source = f.downloads.path().join("Example.Show.S01");

        let report = f.linker.apply(&plan, &torrent, &source).await.unwrap();
        assert_eq!(report.linked, 3);
        assert_eq!(report.already_linked, 0);

        let link = f.library.path().join("Example Show/Season 01/ep01.mkv");
        assert!(std::fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
        assert_eq!(std::fs::read_link(&link).unwrap(), source.join("ep01.mkv"));
        assert!(f
            .library
            .path()
            .join("Example Show/Season 00/omake.mkv")
            .exists());

        let record = ProvenanceRecord::read(&plan.library_root).await.unwrap();
        assert_eq!(record.torrent.content_hash, "ABCD");
        assert_eq!(record.source_download_path, source.to_string_lossy());
        assert_eq!(record.library_path, plan.library_root.to_string_lossy());
    }

    #[tokio::test]
    async fn test_apply_is_idempotent() {
        let f = fixture();
        let plan = plan_for(&f, &[("ep01.mkv", TargetFolder::Season(1))]);
        let torrent = fixtures::tracked_torrent(1, "ABCD", "Example Show");
        let source = f.downloads.path().join("Example.Show.S01");

        let first = f.linker.apply(&plan, &torrent, &source).await.unwrap();
        let second = f.linker.apply(&plan, &torrent, &source).await.unwrap();

        assert_eq!(first.linked, 1);
        assert_eq!(second.linked, 0);
        assert_eq!(second.already_linked, 1);
        let entries: Vec<_> = std::fs::read_dir(plan.library_root.join("Season 01"))
            .unwrap()
            .collect();
        assert_eq!(entries.len(), 1);
    }

    #[tokio::test]
    async fn test_apply_counts_regular_file_as_present() {
        let f = fixture();
        let plan = plan_for(&f, &[("ep01.mkv", TargetFolder::Season(1))]);
        std::fs::create_dir_all(plan.folders[0].path.clone()).unwrap();
        std::fs::write(&plan.folders[0].files[0].target, b"user file").unwrap();

        let torrent = fixtures::tracked_torrent(1, "ABCD", "Example Show");
        let report = f
            .linker
            .apply(&plan, &torrent, f.downloads.path())
            .await
            .unwrap();
        assert_eq!(report.already_linked, 1);
        assert_eq!(
            std::fs::read(&plan.folders[0].files[0].target).unwrap(),
            b"user file"
        );
    }

    #[tokio::test]
    async fn test_apply_empty_plan_fails() {
        let f = fixture();
        let plan = LayoutPlan {
            library_root: f.library.path().join("Example Show"),
            folders: vec![],
        };
        let torrent = fixtures::tracked_torrent(1, "ABCD", "Example Show");

        let result = f.linker.apply(&plan, &torrent, f.downloads.path()).await;
        assert!(matches!(result, Err(LinkerError::NothingLinked { .. })));
        assert!(!plan.library_root.join(PROVENANCE_FILE).exists());
    }

    #[tokio::test]
    async fn test_apply_fails_when_folder_cannot_be_created() {
        let f = fixture();
        let mut plan = plan_for(&f, &[("ep01.mkv", TargetFolder::Season(1))]);
        // A regular file where the title folder should be.
        std::fs::write(f.library.path().join("Blocked"), b"").unwrap();
        plan.folders[0].path = f.library.path().join("Blocked/Season 01");

        let torrent = fixtures::tracked_torrent(1, "ABCD", "Example Show");
        let result = f.linker.apply(&plan, &torrent, f.downloads.path()).await;
        assert!(matches!(result, Err(LinkerError::CreateDir { .. })));
    }

    #[tokio::test]
    async fn test_remove_deletes_folder_and_record() {
        let f = fixture();
        let id = f.store.add(fixtures::new_tracked("ABCD", "Example Show")).unwrap();
        f.store.add(fixtures::new_tracked("EEEE", "Other")).unwrap();
        let torrent = f.store.get(id).unwrap().unwrap();

        let plan = plan_for(&f, &[("ep01.mkv", TargetFolder::Season(1))]);
        let source = f.downloads.path().join("Example.Show.S01");
        f.linker.apply(&plan, &torrent, &source).await.unwrap();

        let removed = f
            .linker
            .remove(&plan.library_root, Some(&torrent))
            .await
            .unwrap();

        assert_eq!(removed, 1);
        assert!(!plan.library_root.exists());
        // Original media is untouched.
        assert!(source.join("ep01.mkv").exists());
        let remaining = f.store.list().unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].content_hash, "EEEE");
    }

    #[tokio::test]
    async fn test_remove_refuses_library_root() {
        let f = fixture();
        std::fs::create_dir_all(f.library.path().join("Show")).unwrap();

        for root in [
            f.library.path().to_path_buf(),
            f.library.path().join("Show/.."),
            PathBuf::from(format!("{}/", f.library.path().display())),
        ] {
            let result = f.linker.remove(&root, None).await;
            assert!(matches!(result, Err(LinkerError::RefusedRoot(_))), "{root:?}");
        }
        assert!(f.library.path().join("Show").exists());
    }

    #[tokio::test]
    async fn test_remove_refuses_outside_library() {
        let f = fixture();
        let result = f.linker.remove(f.downloads.path(), None).await;
        assert!(matches!(result, Err(LinkerError::OutsideLibrary(_))));

        let escape = f.library.path().join("../elsewhere");
        let result = f.linker.remove(&escape, None).await;
        assert!(matches!(result, Err(LinkerError::OutsideLibrary(_))));
        assert!(f.downloads.path().exists());
    }

    #[tokio::test]
    async fn test_remove_missing_folder() {
        let f = fixture();
        let result = f.linker.remove(&f.library.path().join("Nope"), None).await;
        assert!(matches!(result, Err(LinkerError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_link_plan_writes_no_provenance() {
        let f = fixture();
        let plan = plan_for(&f, &[("ep01.mkv", TargetFolder::Season(1))]);

        let report = f.linker.link_plan(&plan).await.unwrap();

        assert_eq!(report.linked, 1);
        assert!(plan.library_root.join("Season 01/ep01.mkv").exists());
        assert!(!plan.library_root.join(PROVENANCE_FILE).exists());
    }

    #[tokio::test]
    async fn test_remove_season_keeps_other_folders() {
        let f = fixture();
        let plan = plan_for(
            &f,
            &[
                ("ep01.mkv", TargetFolder::Season(1)),
                ("s2e01.mkv", TargetFolder::Season(2)),
                ("Extras/omake.mkv", TargetFolder::Specials),
            ],
        );
        f.linker.link_plan(&plan).await.unwrap();

        let remaining = f
            .linker
            .remove_season(&plan.library_root, "Season 02")
            .await
            .unwrap();

        assert_eq!(remaining, vec!["Season 00", "Season 01"]);
        assert!(!plan.library_root.join("Season 02").exists());
        assert!(plan.library_root.join("Season 01/ep01.mkv").exists());
        assert!(f.downloads.path().join("Example.Show.S01/s2e01.mkv").exists());

        let missing = f.linker.remove_season(&plan.library_root, "Season 05").await;
        assert!(matches!(missing, Err(LinkerError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_remove_season_refuses_escape() {
        let f = fixture();
        std::fs::create_dir_all(f.library.path().join("Show/Season 01")).unwrap();
        let title = f.library.path().join("Show");

        let result = f.linker.remove_season(&title, "../../elsewhere").await;
        assert!(matches!(result, Err(LinkerError::OutsideLibrary(_))));

        let result = f.linker.remove_season(&title, "..").await;
        assert!(matches!(result, Err(LinkerError::RefusedRoot(_))));
        assert!(title.join("Season 01").exists());
    }

    #[tokio::test]
    async fn test_link_sources_lists_distinct_download_folders() {
        let f = fixture();
        let plan = plan_for(
            &f,
            &[
                ("ep01.mkv", TargetFolder::Season(1)),
                ("ep02.mkv", TargetFolder::Season(1)),
                ("Extras/omake.mkv", TargetFolder::Specials),
            ],
        );
        f.linker.link_plan(&plan).await.unwrap();

        let mut sources = f.linker.link_sources(&plan.library_root).await;
        sources.sort();

        let show = normalize_path(&f.downloads.path().join("Example.Show.S01"));
        assert_eq!(sources, vec![show.clone(), show.join("Extras")]);
    }

    #[tokio::test]
    async fn test_locate_torrent_prefers_provenance() {
        let f = fixture();
        let torrent = fixtures::tracked_torrent(4, "ABCD", "Example Show");
        let plan = plan_for(&f, &[("ep01.mkv", TargetFolder::Season(1))]);
        let source = f.downloads.path().join("Example.Show.S01");
        f.linker.apply(&plan, &torrent, &source).await.unwrap();

        let found = f
            .linker
            .locate_torrent(&plan.library_root, &[torrent.clone()])
            .await
            .unwrap();
        assert_eq!(found.id, 4);
    }

    #[tokio::test]
    async fn test_locate_torrent_falls_back_to_symlink_targets() {
        let f = fixture();
        let torrent = fixtures::tracked_torrent(4, "ABCD", "Example Show");
        let plan = plan_for(
            &f,
            &[
                ("ep01.mkv", TargetFolder::Season(1)),
                ("Extras/omake.mkv", TargetFolder::Specials),
            ],
        );
        let source = f.downloads.path().join("Example.Show.S01");
        f.linker.apply(&plan, &torrent, &source).await.unwrap();
        std::fs::remove_file(plan.library_root.join(PROVENANCE_FILE)).unwrap();

        let mut tracked = torrent.clone();
        tracked.content_hash = "something-else".to_string();
        tracked.download_path = source.to_string_lossy().into_owned();
        let unrelated = fixtures::tracked_torrent(5, "EEEE", "Other");

        let found = f
            .linker
            .locate_torrent(&plan.library_root, &[unrelated, tracked])
            .await
            .unwrap();
        assert_eq!(found.id, 4);
    }

    #[tokio::test]
    async fn test_locate_torrent_without_any_match() {
        let f = fixture();
        let folder = f.library.path().join("Manual Show/Season 01");
        std::fs::create_dir_all(&folder).unwrap();
        std::fs::write(folder.join("ep01.mkv"), b"").unwrap();

        let tracked = vec![fixtures::tracked_torrent(1, "ABCD", "Example Show")];
        assert!(f
            .linker
            .locate_torrent(&f.library.path().join("Manual Show"), &tracked)
            .await
            .is_none());
    }
}
