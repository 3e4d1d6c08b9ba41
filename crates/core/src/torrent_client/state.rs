//! Daemon torrent states and their classification.
//!
//! Every state the daemon can report is listed once in `STATE_TABLE`, together
//! with its wire name, display category, and whether a torrent in that state
//! is finished enough to be linked into the library.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// State of a torrent as reported by the daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DaemonState {
    Downloading,
    ForcedDownloading,
    FetchingMetadata,
    ForcedFetchingMetadata,
    Allocating,
    StalledDownloading,
    QueuedDownloading,
    PausedDownloading,
    StoppedDownloading,
    CheckingDownloading,
    CompletedDownloading,
    Uploading,
    ForcedUploading,
    StalledUploading,
    QueuedUploading,
    PausedUploading,
    StoppedUploading,
    CheckingUploading,
    CheckingResumeData,
    Moving,
    Error,
    MissingFiles,
    /// The daemon reported a state this table does not know.
    Unknown,
    /// The tracked torrent is absent from the daemon listing.
    NotFound,
}

/// Coarse grouping used for status overviews.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateCategory {
    Downloading,
    Seeding,
    Completed,
    Paused,
    Checking,
    Errored,
    Missing,
    Other,
}

struct StateRow {
    state: DaemonState,
    wire: &'static str,
    category: StateCategory,
    library_ready: bool,
}

const fn row(
    state: DaemonState,
    wire: &'static str,
    category: StateCategory,
    library_ready: bool,
) -> StateRow {
    StateRow {
        state,
        wire,
        category,
        library_ready,
    }
}

use DaemonState as S;
use StateCategory as C;

const STATE_TABLE: &[StateRow] = &[
    row(S::Downloading, "downloading", C::Downloading, false),
    row(S::ForcedDownloading, "forcedDL", C::Downloading, false),
    row(S::FetchingMetadata, "metaDL", C::Downloading, false),
    row(S::ForcedFetchingMetadata, "forcedMetaDL", C::Downloading, false),
    row(S::Allocating, "allocating", C::Downloading, false),
    row(S::StalledDownloading, "stalledDL", C::Downloading, false),
    row(S::QueuedDownloading, "queuedDL", C::Downloading, false),
    row(S::PausedDownloading, "pausedDL", C::Paused, false),
    row(S::StoppedDownloading, "stoppedDL", C::Paused, false),
    row(S::CheckingDownloading, "checkingDL", C::Checking, false),
    row(S::CompletedDownloading, "completedDL", C::Completed, true),
    row(S::Uploading, "uploading", C::Seeding, true),
    row(S::ForcedUploading, "forcedUP", C::Seeding, false),
    row(S::StalledUploading, "stalledUP", C::Seeding, true),
    row(S::QueuedUploading, "queuedUP", C::Seeding, true),
    row(S::PausedUploading, "pausedUP", C::Paused, false),
    row(S::StoppedUploading, "stoppedUP", C::Paused, false),
    row(S::CheckingUploading, "checkingUP", C::Checking, false),
    row(S::CheckingResumeData, "checkingResumeData", C::Checking, false),
    row(S::Moving, "moving", C::Checking, false),
    row(S::Error, "error", C::Errored, false),
    row(S::MissingFiles, "missingFiles", C::Errored, false),
    row(S::Unknown, "unknown", C::Other, false),
    row(S::NotFound, "not_found", C::Missing, false),
];

impl DaemonState {
    fn row(&self) -> &'static StateRow {
        STATE_TABLE
            .iter()
            .find(|r| r.state == *self)
            .unwrap_or(&STATE_TABLE[STATE_TABLE.len() - 2])
    }

    /// Parse the daemon's wire string. Unrecognized strings become `Unknown`.
    pub fn parse(wire: &str) -> Self {
        STATE_TABLE
            .iter()
            .find(|r| r.wire == wire)
            .map(|r| r.state)
            .unwrap_or(DaemonState::Unknown)
    }

    /// The daemon's wire string for this state.
    pub fn as_str(&self) -> &'static str {
        self.row().wire
    }

    pub fn category(&self) -> StateCategory {
        self.row().category
    }

    /// Whether the payload is complete on disk and may be linked.
    pub fn is_library_ready(&self) -> bool {
        self.row().library_ready
    }
}

impl fmt::Display for DaemonState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for DaemonState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for DaemonState {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let wire = String::deserialize(deserializer)?;
        Ok(DaemonState::parse(&wire))
    }
}
