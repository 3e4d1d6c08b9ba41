//! Library linking.
//!
//! Turns a `LayoutPlan` into symlinks under the library root, records a
//! `track.json` provenance file per title folder, and maps library folders
//! back to the tracked torrent that produced them for safe removal.
//! Jellyfin sidecar files left in source folders can be cleaned up afterwards.

mod inventory;
mod library_linker;
mod provenance;
mod sidecars;

pub use inventory::{scan_library, FolderStatus, LibraryFolder, LibraryTitle};
pub(crate) use library_linker::create_symlink;
pub use library_linker::LibraryLinker;
pub use provenance::{find_provenance, normalize_path, ProvenanceRecord, PROVENANCE_FILE};
pub use sidecars::{cleanup_jellyfin_files, JELLYFIN_SIDECAR_EXTENSIONS};

use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::store::StoreError;

/// Errors from linking and removal.
#[derive(Debug, Error)]
pub enum LinkerError {
    #[error("Failed to create library folder {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Nothing was linked into {path} ({failed} failures)")]
    NothingLinked { path: PathBuf, failed: usize },

    #[error("Refusing to remove the library root {0}")]
    RefusedRoot(PathBuf),

    #[error("Refusing to remove {0}: not inside the library root")]
    OutsideLibrary(PathBuf),

    #[error("Library folder not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to remove {path}: {source}")]
    Remove {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Per-file outcome counts of an apply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LinkReport {
    /// Links created by this apply.
    pub linked: usize,
    /// Targets that already existed.
    pub already_linked: usize,
    /// Links that could not be created.
    pub failed: usize,
}

impl LinkReport {
    /// Files present in the library after the apply.
    pub fn present(&self) -> usize {
        self.linked + self.already_linked
    }
}
