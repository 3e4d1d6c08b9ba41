//! Layout plan types.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from layout planning.
#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("Cannot read folder {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Torrent has no library title")]
    MissingTitle,

    #[error("Unknown layout strategy: {0}")]
    UnknownStrategy(String),

    #[error("Invalid library title: {0:?}")]
    InvalidTitle(String),

    #[error("Season must be at least 1, got {0}")]
    InvalidSeason(u32),

    #[error("No video files directly inside {0}")]
    NoVideos(PathBuf),
}

/// Library subfolder a file is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetFolder {
    Season(u32),
    /// `Season 00`.
    Specials,
    Movies,
}

impl TargetFolder {
    /// Season `n`, with season 0 folded into `Specials`.
    pub fn season(n: u32) -> Self {
        if n == 0 {
            TargetFolder::Specials
        } else {
            TargetFolder::Season(n)
        }
    }

    pub fn folder_name(&self) -> String {
        match self {
            TargetFolder::Season(n) => format!("Season {:02}", n),
            TargetFolder::Specials => "Season 00".to_string(),
            TargetFolder::Movies => "Movies".to_string(),
        }
    }
}

impl fmt::Display for TargetFolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.folder_name())
    }
}

/// What a layout strategy knows about one video file.
#[derive(Debug, Clone, PartialEq)]
pub struct FileFacts {
    /// Original file name, never altered.
    pub file_name: String,
    /// Enclosing directory names, nearest first, ending with the download
    /// folder's own name. Empty for single-file torrents.
    pub dir_components: Vec<String>,
    /// Probed duration; `None` if probing failed.
    pub duration_secs: Option<f64>,
    pub movie_min_duration_secs: u64,
}

impl FileFacts {
    /// Whether the probed duration marks this file as a feature-length movie.
    pub fn is_movie_length(&self) -> bool {
        self.duration_secs
            .is_some_and(|d| d > self.movie_min_duration_secs as f64)
    }

    /// Whether the file sits in a subfolder of the download folder.
    pub fn in_subfolder(&self) -> bool {
        self.dir_components.len() > 1
    }
}

/// One planned symlink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedFile {
    pub source: PathBuf,
    pub target: PathBuf,
}

/// A library subfolder and the links it will hold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedFolder {
    pub kind: TargetFolder,
    pub path: PathBuf,
    pub files: Vec<PlannedFile>,
}

/// Where every video file of a finished torrent goes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LayoutPlan {
    /// `<library root>/<sanitized title>`.
    pub library_root: PathBuf,
    pub folders: Vec<PlannedFolder>,
}

impl LayoutPlan {
    pub fn file_count(&self) -> usize {
        self.folders.iter().map(|f| f.files.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.file_count() == 0
    }
}
