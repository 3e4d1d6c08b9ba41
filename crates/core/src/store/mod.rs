//! Persistence for tracked torrents and completion notifications.
//!
//! Both stores are flat JSON files rewritten in full on every mutation. Each
//! write goes to a sibling temp file that is then renamed over the target, so
//! a reader never observes a half-written document.

mod json_store;
mod notifications;
mod timestamp;
mod types;

pub use json_store::JsonTorrentStore;
pub(crate) use json_store::write_json_atomic;
pub use notifications::{CompletionNotification, JsonNotificationStore, NotificationStore};
pub use types::*;
