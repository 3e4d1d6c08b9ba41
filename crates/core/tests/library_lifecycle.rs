//! End-to-end library lifecycle tests.
//!
//! A mock daemon reports a finished torrent, the planner and linker file it
//! into a temp library, and removal maps the library folder back to the
//! tracked record.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;

use jellylink_core::{
    classify_completed,
    linker::PROVENANCE_FILE,
    testing::{fixtures, MockDurationProbe, MockTorrentClient},
    DaemonState, JsonNotificationStore, JsonTorrentStore, LibraryConfig, LibraryLayoutPlanner,
    LibraryLinker, LibraryMonitor, LinkerError, MonitorConfig, NotificationStore,
    ReconciliationEngine, StrategyRegistry, SyncError, TorrentStore, TrackedStatus,
};

struct TestHarness {
    downloads: PathBuf,
    library: PathBuf,
    client: Arc<MockTorrentClient>,
    store: Arc<JsonTorrentStore>,
    notifications: Arc<JsonNotificationStore>,
    _temp_dir: TempDir,
}

impl TestHarness {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let downloads = temp_dir.path().join("dl");
        let library = temp_dir.path().join("anime");
        std::fs::create_dir_all(&downloads).unwrap();
        std::fs::create_dir_all(&library).unwrap();

        Self {
            client: Arc::new(MockTorrentClient::new()),
            store: Arc::new(JsonTorrentStore::new(
                temp_dir.path().join("torrent_database.json"),
            )),
            notifications: Arc::new(JsonNotificationStore::new(
                temp_dir.path().join("torrent_notifications.json"),
                24,
            )),
            downloads,
            library,
            _temp_dir: temp_dir,
        }
    }

    fn engine(&self) -> ReconciliationEngine {
        ReconciliationEngine::new(
            Arc::clone(&self.client) as Arc<dyn jellylink_core::TorrentClient>,
            Arc::clone(&self.store) as Arc<dyn TorrentStore>,
        )
    }

    fn planner(&self, probe: MockDurationProbe) -> LibraryLayoutPlanner {
        let config = LibraryConfig::new(&self.library);
        let strategy = StrategyRegistry::with_builtins()
            .resolve(&config.strategy)
            .expect("default strategy is registered");
        LibraryLayoutPlanner::new(&config, strategy, Arc::new(probe))
    }

    fn linker(&self) -> LibraryLinker {
        LibraryLinker::new(&self.library, Arc::clone(&self.store) as Arc<dyn TorrentStore>)
    }

    fn monitor(&self, probe: MockDurationProbe) -> LibraryMonitor {
        LibraryMonitor::new(
            MonitorConfig::default(),
            Arc::new(self.engine()),
            Arc::new(self.planner(probe)),
            Arc::new(self.linker()),
            Arc::clone(&self.store) as Arc<dyn TorrentStore>,
            Arc::clone(&self.notifications) as Arc<dyn NotificationStore>,
        )
    }

    fn write_file(&self, relative: &str) -> PathBuf {
        let path = self.downloads.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"video").unwrap();
        path
    }

    /// Track "Example Show" (hash ABCD) and have the daemon report it seeding.
    async fn finished_example_show(&self) -> u64 {
        let id = self
            .store
            .add(fixtures::new_tracked("ABCD", "Example Show"))
            .unwrap();
        self.client
            .add_daemon_torrent(fixtures::daemon_torrent(
                "abcd",
                DaemonState::Uploading,
                &self.downloads.to_string_lossy(),
                "Example.Show.S01",
            ))
            .await;
        id
    }

    fn title_root(&self) -> PathBuf {
        self.library.join("Example Show")
    }
}

fn is_symlink(path: &Path) -> bool {
    std::fs::symlink_metadata(path)
        .map(|m| m.file_type().is_symlink())
        .unwrap_or(false)
}

#[tokio::test]
async fn test_finished_torrent_is_filed_under_season_01() {
    let harness = TestHarness::new();
    let episode = harness.write_file("Example.Show.S01/ep01.mkv");
    let id = harness.finished_example_show().await;
    let probe = MockDurationProbe::new().with_duration("ep01.mkv", 24.0 * 60.0);

    let report = harness.monitor(probe).run_cycle().await;
    assert_eq!(report.linked.len(), 1);

    let link = harness.title_root().join("Season 01/ep01.mkv");
    assert!(is_symlink(&link));
    assert_eq!(std::fs::read_link(&link).unwrap(), episode);
    assert!(harness.title_root().join(PROVENANCE_FILE).exists());

    let stored = harness.store.get(id).unwrap().unwrap();
    assert_eq!(stored.status, TrackedStatus::AddedToLibrary);
    assert!(stored.status_updated.is_some());
}

#[tokio::test]
async fn test_specials_subfolder_is_filed_under_season_00() {
    let harness = TestHarness::new();
    harness.write_file("Example.Show.S01/ep01.mkv");
    harness.write_file("Example.Show.S01/Specials/omake.mkv");
    harness.finished_example_show().await;

    let report = harness.monitor(MockDurationProbe::new()).run_cycle().await;
    assert_eq!(report.linked.len(), 1);

    // The download folder's own S01 token does not override the nearer match.
    assert!(is_symlink(&harness.title_root().join("Season 00/omake.mkv")));
    assert!(is_symlink(&harness.title_root().join("Season 01/ep01.mkv")));
    assert!(!harness.title_root().join("Season 01/omake.mkv").exists());
}

#[tokio::test]
async fn test_long_file_is_filed_under_movies() {
    let harness = TestHarness::new();
    harness.write_file("Example.Show.S01/Season 2/film.mkv");
    harness.finished_example_show().await;
    let probe = MockDurationProbe::new().with_duration("film.mkv", 2401.0);

    harness.monitor(probe).run_cycle().await;

    assert!(is_symlink(&harness.title_root().join("Movies/film.mkv")));
    assert!(!harness.title_root().join("Season 02").exists());
}

#[tokio::test]
async fn test_unreachable_daemon_leaves_store_untouched() {
    let harness = TestHarness::new();
    harness.write_file("Example.Show.S01/ep01.mkv");
    harness.finished_example_show().await;
    let before = std::fs::read(harness.store.path()).unwrap();
    harness.client.set_reachable(false).await;

    let result = harness.engine().sync().await;
    assert!(matches!(result, Err(SyncError::DaemonUnreachable)));
    assert_eq!(
        result.unwrap_err().to_string(),
        "daemon not accessible"
    );

    let report = harness.monitor(MockDurationProbe::new()).run_cycle().await;
    assert_eq!(report.skipped_reason.as_deref(), Some("daemon not accessible"));
    assert_eq!(std::fs::read(harness.store.path()).unwrap(), before);
    assert!(!harness.title_root().exists());
}

#[tokio::test]
async fn test_untitled_torrent_is_never_classified() {
    let harness = TestHarness::new();
    harness.write_file("Other/ep01.mkv");
    harness
        .store
        .add(fixtures::new_tracked("eeee", "   "))
        .unwrap();
    harness
        .client
        .add_daemon_torrent(fixtures::daemon_torrent(
            "EEEE",
            DaemonState::Uploading,
            &harness.downloads.to_string_lossy(),
            "Other",
        ))
        .await;

    let outcome = harness.engine().sync().await.unwrap();
    assert!(outcome.views()[0].found_in_daemon);
    assert!(classify_completed(outcome.views()).is_empty());
}

#[tokio::test]
async fn test_removal_uses_provenance_and_guards_root() {
    let harness = TestHarness::new();
    harness.write_file("Example.Show.S01/ep01.mkv");
    harness.finished_example_show().await;
    harness
        .store
        .add(fixtures::new_tracked("ffff", "Another Show"))
        .unwrap();
    harness.monitor(MockDurationProbe::new()).run_cycle().await;

    let linker = harness.linker();
    let tracked = harness.store.list().unwrap();
    let torrent = linker
        .locate_torrent(&harness.title_root(), &tracked)
        .await
        .expect("provenance should identify the torrent");
    assert_eq!(torrent.content_hash, "ABCD");

    let refused = linker.remove(&harness.library, Some(&torrent)).await;
    assert!(matches!(refused, Err(LinkerError::RefusedRoot(_))));
    assert!(harness.title_root().exists());
    assert_eq!(harness.store.list().unwrap().len(), 2);

    let removed = linker
        .remove(&harness.title_root(), Some(&torrent))
        .await
        .unwrap();
    assert_eq!(removed, 1);
    assert!(!harness.title_root().exists());
    assert!(harness.downloads.join("Example.Show.S01/ep01.mkv").exists());

    let remaining = harness.store.list().unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].content_hash, "ffff");
}

#[tokio::test]
async fn test_relinking_is_idempotent() {
    let harness = TestHarness::new();
    harness.write_file("Example.Show.S01/ep01.mkv");
    harness.write_file("Example.Show.S01/ep02.mkv");
    let id = harness.finished_example_show().await;

    let planner = harness.planner(MockDurationProbe::new());
    let linker = harness.linker();
    let torrent = harness.store.get(id).unwrap().unwrap();
    let source = harness.downloads.join("Example.Show.S01");
    let plan = planner.plan(&torrent, &source).await.unwrap();

    let first = linker.apply(&plan, &torrent, &source).await.unwrap();
    let second = linker.apply(&plan, &torrent, &source).await.unwrap();
    assert_eq!(first.linked, 2);
    assert_eq!(second.already_linked, 2);
    assert_eq!(second.linked, 0);

    let links: Vec<_> = std::fs::read_dir(harness.title_root().join("Season 01"))
        .unwrap()
        .collect();
    assert_eq!(links.len(), 2);
}
