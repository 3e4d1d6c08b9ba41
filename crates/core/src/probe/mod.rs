//! Media duration probing.
//!
//! The layout planner asks a `DurationProbe` how long each video file runs to
//! tell feature-length movies apart from episodes. Any probe error means
//! "duration unknown", never a fatal failure.

mod ffprobe;

pub use ffprobe::FfprobeDurationProbe;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur while probing a media file.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// The probing tool is not installed or not on PATH.
    #[error("ffprobe not found at path: {path}")]
    NotInstalled { path: PathBuf },

    #[error("Probe of {path} timed out after {timeout_secs} seconds")]
    Timeout { path: PathBuf, timeout_secs: u64 },

    #[error("Probe of {path} failed: {reason}")]
    Failed { path: PathBuf, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProbeError {
    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ProbeError::NotInstalled { .. } => "not_installed",
            ProbeError::Timeout { .. } => "timeout",
            ProbeError::Failed { .. } => "failed",
            ProbeError::Io(_) => "io",
        }
    }
}

/// Trait for media duration probes.
#[async_trait]
pub trait DurationProbe: Send + Sync {
    /// Duration of the media file in seconds.
    async fn duration_secs(&self, path: &Path) -> Result<f64, ProbeError>;
}
