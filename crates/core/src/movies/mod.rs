//! Stand-alone movie library.
//!
//! Each movie is a symlink to its video file, kept in a folder named after
//! the file's stem: `<root>/<stem>/<file>`.

mod library;

pub use library::MovieLibrary;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from movie library operations.
#[derive(Debug, Error)]
pub enum MovieError {
    #[error("Movie source must be an absolute path: {0}")]
    RelativeSource(PathBuf),

    #[error("Movie source is not a video file: {0}")]
    NotAVideo(PathBuf),

    #[error("Movie source not found: {0}")]
    SourceNotFound(PathBuf),

    #[error("Movie '{name}' already exists at {link}")]
    AlreadyExists { name: String, link: PathBuf },

    #[error("Movie not found: {0}")]
    NotFound(String),

    #[error("Invalid movie name: {0}")]
    InvalidName(String),

    #[error("Failed to link {path}: {source}")]
    Link {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A movie symlink found under the movie root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MovieEntry {
    /// File stem of the link.
    pub name: String,
    pub link: PathBuf,
    /// Where the link points. `None` when it cannot be read.
    pub target: Option<PathBuf>,
    /// The target no longer exists.
    pub broken: bool,
}

/// Request to link a movie file into the movie root.
#[derive(Debug, Clone, Deserialize)]
pub struct AddMovieRequest {
    pub source: PathBuf,
    /// Replace an existing movie with the same name.
    #[serde(default)]
    pub overwrite: bool,
}
