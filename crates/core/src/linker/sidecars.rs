//! Cleanup of metadata files Jellyfin writes next to linked media.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, warn};

/// Extensions of the `.nfo` and artwork files Jellyfin drops into source folders.
pub const JELLYFIN_SIDECAR_EXTENSIONS: &[&str] = &["nfo", "jpg", "jpeg"];

fn is_sidecar(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            JELLYFIN_SIDECAR_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}

/// Delete the sidecar files directly inside `dir`.
///
/// Does not recurse and leaves symlinks alone. A missing folder is not an
/// error. Returns the files that were removed.
pub async fn cleanup_jellyfin_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    let mut removed = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if !entry.file_type().await?.is_file() || !is_sidecar(&path) {
            continue;
        }
        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!(path = %path.display(), "Removed Jellyfin sidecar");
                removed.push(path);
            }
            Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove sidecar"),
        }
    }
    removed.sort();
    Ok(removed)
}
