//! Torrent daemon abstraction.
//!
//! This module provides the `TorrentClient` trait used to query the download
//! daemon for live torrent status, and the qBittorrent Web API implementation.

mod magnet;
mod qbittorrent;
mod retry;
mod state;
mod types;

pub use magnet::MagnetLink;
pub use qbittorrent::QBittorrentClient;
pub use retry::with_retry;
pub use state::{DaemonState, StateCategory};
pub use types::*;
