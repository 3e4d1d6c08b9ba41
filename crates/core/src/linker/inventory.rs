//! Library inventory: what each title folder under the library root holds.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tokio::fs;
use tracing::debug;

use super::provenance::PROVENANCE_FILE;
use super::LinkerError;

/// State of a single `Season NN` / `Movies` folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FolderStatus {
    /// Holds at least one symlink; `source_dir` is the download folder it
    /// points into.
    Linked { source_dir: PathBuf },
    Empty,
    /// Has entries but none of them are symlinks.
    NoSymlinks,
    AccessDenied,
    /// The title entry itself is a symlink (older library layout).
    DirectLink { target: PathBuf },
    BrokenLink,
}

#[derive(Debug, Clone, Serialize)]
pub struct LibraryFolder {
    pub name: String,
    pub path: PathBuf,
    #[serde(flatten)]
    pub status: FolderStatus,
}

/// A title folder directly under the library root.
#[derive(Debug, Clone, Serialize)]
pub struct LibraryTitle {
    pub name: String,
    pub path: PathBuf,
    pub folders: Vec<LibraryFolder>,
    /// Whether a `track.json` sits in the title folder.
    pub has_provenance: bool,
}

fn is_media_folder(name: &str) -> bool {
    name.starts_with("Season ") || name == "Movies"
}

/// List every title in the library, sorted case-insensitively.
///
/// A missing library root yields an empty list. Title folders without any
/// season or movie folders are left out.
pub async fn scan_library(root: &Path) -> Result<Vec<LibraryTitle>, LinkerError> {
    let mut entries = match fs::read_dir(root).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut titles = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        let path = entry.path();
        let file_type = entry.file_type().await?;

        if file_type.is_symlink() {
            let status = match fs::read_link(&path).await {
                Ok(target) => FolderStatus::DirectLink { target },
                Err(_) => FolderStatus::BrokenLink,
            };
            titles.push(LibraryTitle {
                folders: vec![LibraryFolder {
                    name: "Direct Link".to_string(),
                    path: path.clone(),
                    status,
                }],
                name,
                path,
                has_provenance: false,
            });
            continue;
        }
        if !file_type.is_dir() {
            continue;
        }

        let folders = scan_title(&path).await?;
        if folders.is_empty() {
            debug!(path = %path.display(), "Skipping folder without season folders");
            continue;
        }
        let has_provenance = fs::try_exists(path.join(PROVENANCE_FILE))
            .await
            .unwrap_or(false);

        titles.push(LibraryTitle {
            name,
            path,
            folders,
            has_provenance,
        });
    }

    titles.sort_by_key(|t| t.name.to_lowercase());
    Ok(titles)
}

async fn media_folders(title: &Path) -> std::io::Result<Vec<(String, PathBuf)>> {
    let mut entries = fs::read_dir(title).await?;
    let mut folders = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        if is_media_folder(&name) && entry.file_type().await?.is_dir() {
            folders.push((name, entry.path()));
        }
    }
    folders.sort();
    Ok(folders)
}

async fn scan_title(title: &Path) -> Result<Vec<LibraryFolder>, LinkerError> {
    let folders = match media_folders(title).await {
        Ok(folders) => folders,
        Err(e) if e.kind() == ErrorKind::PermissionDenied => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut out = Vec::with_capacity(folders.len());
    for (name, path) in folders {
        let status = folder_status(&name, &path).await;
        out.push(LibraryFolder { name, path, status });
    }
    Ok(out)
}

async fn folder_status(name: &str, path: &Path) -> FolderStatus {
    let mut entries = match fs::read_dir(path).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::PermissionDenied => return FolderStatus::AccessDenied,
        Err(_) => return FolderStatus::Empty,
    };

    let mut any = false;
    while let Ok(Some(entry)) = entries.next_entry().await {
        any = true;
        if let Ok(target) = fs::read_link(entry.path()).await {
            return FolderStatus::Linked {
                source_dir: source_dir(name, &target),
            };
        }
    }

    if any {
        FolderStatus::NoSymlinks
    } else {
        FolderStatus::Empty
    }
}

/// The download folder a link points into. Specials usually come from a
/// nested extras folder, so they go up one more level.
fn source_dir(folder_name: &str, target: &Path) -> PathBuf {
    let parent = target.parent().unwrap_or(target);
    if folder_name == "Season 00" {
        parent.parent().unwrap_or(parent).to_path_buf()
    } else {
        parent.to_path_buf()
    }
}

/// Raw targets of the first symlink in each media folder of `title`.
pub(super) async fn first_link_targets(title: &Path) -> Vec<PathBuf> {
    let Ok(folders) = media_folders(title).await else {
        return Vec::new();
    };

    let mut targets = Vec::new();
    for (_, path) in folders {
        let Ok(mut entries) = fs::read_dir(&path).await else {
            continue;
        };
        while let Ok(Some(entry)) = entries.next_entry().await {
            if let Ok(target) = fs::read_link(entry.path()).await {
                targets.push(target);
                break;
            }
        }
    }
    targets
}

/// Names of the media folders `title` still holds.
pub(super) async fn media_folder_names(title: &Path) -> Vec<String> {
    media_folders(title)
        .await
        .map(|folders| folders.into_iter().map(|(name, _)| name).collect())
        .unwrap_or_default()
}

/// Raw targets of every symlink in the media folders of `title`.
pub(super) async fn all_link_targets(title: &Path) -> Vec<PathBuf> {
    let Ok(folders) = media_folders(title).await else {
        return Vec::new();
    };

    let mut targets = Vec::new();
    for (_, path) in folders {
        let Ok(mut entries) = fs::read_dir(&path).await else {
            continue;
        };
        while let Ok(Some(entry)) = entries.next_entry().await {
            if let Ok(target) = fs::read_link(entry.path()).await {
                targets.push(target);
            }
        }
    }
    targets
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[cfg(unix)]
    fn link(source: &Path, target: &Path) {
        std::os::unix::fs::symlink(source, target).unwrap();
    }

    #[tokio::test]
    async fn test_missing_root_is_empty() {
        let dir = TempDir::new().unwrap();
        let titles = scan_library(&dir.path().join("missing")).await.unwrap();
        assert!(titles.is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_scan_reports_folder_statuses() {
        let downloads = TempDir::new().unwrap();
        let library = TempDir::new().unwrap();
        let source = downloads.path().join("Show.S01");
        std::fs::create_dir_all(source.join("Extras")).unwrap();
        std::fs::write(source.join("ep01.mkv"), b"").unwrap();
        std::fs::write(source.join("Extras/nc.mkv"), b"").unwrap();

        let show = library.path().join("b show");
        std::fs::create_dir_all(show.join("Season 01")).unwrap();
        std::fs::create_dir_all(show.join("Season 00")).unwrap();
        std::fs::create_dir_all(show.join("Season 02")).unwrap();
        std::fs::create_dir_all(show.join("Movies")).unwrap();
        std::fs::create_dir_all(show.join("Artwork")).unwrap();
        link(&source.join("ep01.mkv"), &show.join("Season 01/ep01.mkv"));
        link(&source.join("Extras/nc.mkv"), &show.join("Season 00/nc.mkv"));
        std::fs::write(show.join("Movies/readme.txt"), b"").unwrap();
        std::fs::write(show.join(PROVENANCE_FILE), b"{}").unwrap();

        let other = library.path().join("A Show");
        std::fs::create_dir_all(other.join("Season 01")).unwrap();
        // Not a title: no season folders.
        std::fs::create_dir_all(library.path().join("posters")).unwrap();

        let titles = scan_library(library.path()).await.unwrap();
        let names: Vec<_> = titles.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["A Show", "b show"]);

        let show = &titles[1];
        assert!(show.has_provenance);
        let statuses: Vec<_> = show
            .folders
            .iter()
            .map(|f| (f.name.as_str(), f.status.clone()))
            .collect();
        assert_eq!(
            statuses,
            vec![
                ("Movies", FolderStatus::NoSymlinks),
                (
                    "Season 00",
                    FolderStatus::Linked {
                        source_dir: source.clone()
                    }
                ),
                (
                    "Season 01",
                    FolderStatus::Linked {
                        source_dir: source.clone()
                    }
                ),
                ("Season 02", FolderStatus::Empty),
            ]
        );
        assert!(!titles[0].has_provenance);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_direct_link_titles() {
        let downloads = TempDir::new().unwrap();
        let library = TempDir::new().unwrap();
        link(downloads.path(), &library.path().join("Old Show"));
        link(
            &downloads.path().join("gone"),
            &library.path().join("Broken Show"),
        );

        let titles = scan_library(library.path()).await.unwrap();
        assert_eq!(titles.len(), 2);
        assert_eq!(titles[0].name, "Broken Show");
        // read_link succeeds even when the target is gone.
        assert!(matches!(
            titles[0].folders[0].status,
            FolderStatus::DirectLink { .. }
        ));
        assert_eq!(
            titles[1].folders[0].status,
            FolderStatus::DirectLink {
                target: downloads.path().to_path_buf()
            }
        );
    }

    #[test]
    fn test_status_serializes_with_tag() {
        let json = serde_json::to_value(FolderStatus::Linked {
            source_dir: PathBuf::from("/dl/show"),
        })
        .unwrap();
        assert_eq!(json["status"], "linked");
        assert_eq!(json["source_dir"], "/dl/show");
    }
}
