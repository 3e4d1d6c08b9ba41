//! Reconciliation of tracked torrents against the live daemon.
//!
//! `ReconciliationEngine::sync` produces one `SyncedTorrentView` per tracked
//! torrent; `classify_completed` picks the ones that just finished and are
//! safe to link unattended.

mod engine;
mod types;

pub use engine::{classify_completed, merge, summarize, ReconciliationEngine};
pub use types::*;
