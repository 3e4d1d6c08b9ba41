//! JSON-file tracked torrent store.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{NewTrackedTorrent, StoreError, TorrentStore, TrackedStatus, TrackedTorrent};

/// On-disk document shape.
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreDocument {
    #[serde(default)]
    torrents: Vec<TrackedTorrent>,
    #[serde(default, with = "super::timestamp::option")]
    last_updated: Option<DateTime<Utc>>,
    /// Next id to hand out. Older files lack it and start from max id + 1.
    #[serde(default)]
    next_id: u64,
}

impl StoreDocument {
    /// Ids are never reused, even after the highest one is removed.
    fn allocate_id(&mut self) -> u64 {
        let floor = self.torrents.iter().map(|t| t.id).max().unwrap_or(0) + 1;
        let id = self.next_id.max(floor);
        self.next_id = id + 1;
        id
    }
}

/// Tracked torrent store backed by a single JSON file.
///
/// Every mutation is a load-modify-save cycle. The in-process mutex
/// serializes mutations from this process; the temp-file rename keeps the
/// file intact when another process interleaves.
pub struct JsonTorrentStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonTorrentStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<StoreDocument, StoreError> {
        read_json_or_default(&self.path)
    }

    fn save(&self, mut doc: StoreDocument) -> Result<(), StoreError> {
        doc.last_updated = Some(Utc::now());
        write_json_atomic(&self.path, &doc)
    }

    /// Run a load-modify-save cycle under the process-local lock.
    fn mutate<T>(
        &self,
        f: impl FnOnce(&mut StoreDocument) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut doc = self.load()?;
        let result = f(&mut doc)?;
        self.save(doc)?;
        Ok(result)
    }

    fn find_mut(doc: &mut StoreDocument, id: u64) -> Result<&mut TrackedTorrent, StoreError> {
        doc.torrents
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(StoreError::NotFound(id))
    }
}

impl TorrentStore for JsonTorrentStore {
    fn list(&self) -> Result<Vec<TrackedTorrent>, StoreError> {
        Ok(self.load()?.torrents)
    }

    fn get(&self, id: u64) -> Result<Option<TrackedTorrent>, StoreError> {
        Ok(self.load()?.torrents.into_iter().find(|t| t.id == id))
    }

    fn add(&self, entry: NewTrackedTorrent) -> Result<u64, StoreError> {
        self.mutate(|doc| {
            let id = doc.allocate_id();
            doc.torrents.push(entry.into_tracked(id, Utc::now()));
            debug!(id, "Tracked torrent added");
            Ok(id)
        })
    }

    fn update_status(&self, id: u64, status: TrackedStatus) -> Result<(), StoreError> {
        self.mutate(|doc| {
            let torrent = Self::find_mut(doc, id)?;
            torrent.status = status;
            torrent.status_updated = Some(Utc::now());
            Ok(())
        })
    }

    fn update_paths(
        &self,
        id: u64,
        source_path: &str,
        library_path: &str,
    ) -> Result<(), StoreError> {
        self.mutate(|doc| {
            let torrent = Self::find_mut(doc, id)?;
            torrent.download_path = source_path.to_string();
            torrent.library_path = Some(library_path.to_string());
            Ok(())
        })
    }

    fn remove_by_content_hash(&self, hash: &str) -> Result<usize, StoreError> {
        self.mutate(|doc| {
            let before = doc.torrents.len();
            doc.torrents.retain(|t| !t.has_content_hash(hash));
            Ok(before - doc.torrents.len())
        })
    }
}

/// Read a JSON document, treating a missing file as the default value.
pub(crate) fn read_json_or_default<T: DeserializeOwned + Default>(
    path: &Path,
) -> Result<T, StoreError> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(T::default()),
        Err(source) => {
            return Err(StoreError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    if raw.trim().is_empty() {
        return Ok(T::default());
    }

    serde_json::from_str(&raw).map_err(|e| StoreError::Corrupt {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Write `value` as pretty JSON to a sibling temp file, then rename it over `path`.
pub(crate) fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let io_err = |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err)?;
    }

    let json = serde_json::to_vec_pretty(value).map_err(|e| StoreError::Encode(e.to_string()))?;

    let mut tmp_name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    tmp_name.push(format!(".{}.tmp", std::process::id()));
    let tmp_path = path.with_file_name(tmp_name);

    let write = || -> std::io::Result<()> {
        let mut file = fs::File::create(&tmp_path)?;
        file.write_all(&json)?;
        file.sync_all()?;
        fs::rename(&tmp_path, path)
    };

    write().map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        io_err(e)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::LibraryInfo;
    use tempfile::TempDir;

    fn create_test_store() -> (TempDir, JsonTorrentStore) {
        let dir = TempDir::new().unwrap();
        let store = JsonTorrentStore::new(dir.path().join("torrent_database.json"));
        (dir, store)
    }

    fn entry(title: &str, hash: &str) -> NewTrackedTorrent {
        NewTrackedTorrent::new(title, hash).with_library_info(LibraryInfo::titled("Example Show"))
    }

    #[test]
    fn test_missing_file_is_empty() {
        let (_dir, store) = create_test_store();
        assert!(store.list().unwrap().is_empty());
        assert!(!store.path().exists());
    }

    #[test]
    fn test_add_assigns_monotonic_ids() {
        let (_dir, store) = create_test_store();
        assert_eq!(store.add(entry("a", "AAAA")).unwrap(), 1);
        assert_eq!(store.add(entry("b", "BBBB")).unwrap(), 2);
        assert_eq!(store.add(entry("c", "CCCC")).unwrap(), 3);

        // Removing a middle record must not cause id reuse.
        assert_eq!(store.remove_by_content_hash("bbbb").unwrap(), 1);
        assert_eq!(store.add(entry("d", "DDDD")).unwrap(), 4);

        let titles: Vec<String> = store.list().unwrap().into_iter().map(|t| t.title).collect();
        assert_eq!(titles, vec!["a", "c", "d"]);
    }

    #[test]
    fn test_removed_highest_id_is_not_reused() {
        let (_dir, store) = create_test_store();
        assert_eq!(store.add(entry("a", "AAAA")).unwrap(), 1);
        assert_eq!(store.add(entry("b", "BBBB")).unwrap(), 2);

        assert_eq!(store.remove_by_content_hash("BBBB").unwrap(), 1);
        assert_eq!(store.add(entry("c", "CCCC")).unwrap(), 3);

        // Even when the store is emptied.
        store.remove_by_content_hash("aaaa").unwrap();
        store.remove_by_content_hash("cccc").unwrap();
        assert_eq!(store.add(entry("d", "DDDD")).unwrap(), 4);
    }

    #[test]
    fn test_legacy_file_without_counter() {
        let (_dir, store) = create_test_store();
        store.add(entry("a", "AAAA")).unwrap();

        // Files written by older versions carry no `next_id`.
        let raw = fs::read_to_string(store.path()).unwrap();
        let mut doc: serde_json::Value = serde_json::from_str(&raw).unwrap();
        doc.as_object_mut().unwrap().remove("next_id");
        doc["torrents"][0]["id"] = serde_json::json!(7);
        fs::write(store.path(), doc.to_string()).unwrap();

        assert_eq!(store.add(entry("b", "BBBB")).unwrap(), 8);
    }

    #[test]
    fn test_update_status_sets_timestamp() {
        let (_dir, store) = create_test_store();
        let id = store.add(entry("a", "AAAA")).unwrap();
        assert!(store.get(id).unwrap().unwrap().status_updated.is_none());

        store.update_status(id, TrackedStatus::AddedToLibrary).unwrap();

        let torrent = store.get(id).unwrap().unwrap();
        assert_eq!(torrent.status, TrackedStatus::AddedToLibrary);
        assert!(torrent.status_updated.is_some());
    }

    #[test]
    fn test_update_unknown_id() {
        let (_dir, store) = create_test_store();
        let result = store.update_status(99, TrackedStatus::AddedToLibrary);
        assert!(matches!(result, Err(StoreError::NotFound(99))));
    }

    #[test]
    fn test_update_paths() {
        let (_dir, store) = create_test_store();
        let id = store.add(entry("a", "AAAA").with_download_path("/dl")).unwrap();

        store
            .update_paths(id, "/dl/Example.Show.S01", "/anime/Example Show")
            .unwrap();

        let torrent = store.get(id).unwrap().unwrap();
        assert_eq!(torrent.download_path, "/dl/Example.Show.S01");
        assert_eq!(torrent.library_path.as_deref(), Some("/anime/Example Show"));
    }

    #[test]
    fn test_document_shape() {
        let (_dir, store) = create_test_store();
        store.add(entry("a", "AAAA")).unwrap();

        let raw = fs::read_to_string(store.path()).unwrap();
        let doc: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(doc["torrents"].as_array().unwrap().len(), 1);
        assert!(doc["last_updated"].is_string());
        assert_eq!(doc["torrents"][0]["status"], "added");
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let (_dir, store) = create_test_store();
        fs::write(store.path(), "{ not json").unwrap();

        assert!(matches!(store.list(), Err(StoreError::Corrupt { .. })));
        assert!(store.add(entry("a", "AAAA")).is_err());
        // The corrupt file is left for the operator to inspect.
        assert_eq!(fs::read_to_string(store.path()).unwrap(), "{ not json");
    }

    #[test]
    fn test_no_temp_files_left_behind() {
        let (dir, store) = create_test_store();
        store.add(entry("a", "AAAA")).unwrap();
        store.add(entry("b", "BBBB")).unwrap();

        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec!["torrent_database.json"]);
    }
}
