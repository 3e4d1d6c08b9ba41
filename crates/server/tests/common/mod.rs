//! Common test utilities for API testing with mocks.
//!
//! This module provides a test fixture that creates an in-process router
//! with a mock daemon and a temp library, so every route can be exercised
//! without qBittorrent or ffprobe.

use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use jellylink_core::{
    load_config_from_str,
    testing::{MockDurationProbe, MockTorrentClient},
    JsonNotificationStore, JsonTorrentStore, LibraryLayoutPlanner, LibraryLinker, LibraryMonitor,
    LibraryService, MovieLibrary, NotificationStore, ReconciliationEngine, StrategyRegistry,
    TorrentClient, TorrentStore,
};

/// Re-export fixtures for test convenience
pub use jellylink_core::testing::fixtures;

/// Test fixture for API testing with mock dependencies.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_health() {
///     let fixture = TestFixture::new().await;
///     let response = fixture.get("/api/v1/health").await;
///     assert_eq!(response.status, 200);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Mock daemon - script listings and failures
    pub torrent_client: Arc<MockTorrentClient>,
    /// Tracked torrent store backing the service
    pub store: Arc<JsonTorrentStore>,
    /// Library root inside the temp dir
    pub library: PathBuf,
    /// Download directory inside the temp dir
    pub downloads: PathBuf,
    /// Movie library root inside the temp dir
    pub movies: PathBuf,
    /// Temporary directory for stores, downloads and the library
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
    pub text: String,
}

impl TestFixture {
    /// Create a new test fixture with an empty mock daemon.
    pub async fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let library = temp_dir.path().join("anime");
        let downloads = temp_dir.path().join("downloads");
        let movies = temp_dir.path().join("movies");
        std::fs::create_dir_all(&library).expect("Failed to create library dir");
        std::fs::create_dir_all(&downloads).expect("Failed to create downloads dir");

        let config = load_config_from_str(&format!(
            r#"
[server]
host = "127.0.0.1"
port = 0

[daemon]
password = "secret"

[library]
root = {:?}

[monitor]
enabled = false

[movies]
root = {:?}
"#,
            library.to_string_lossy(),
            movies.to_string_lossy()
        ))
        .expect("Failed to parse test config");

        let torrent_client = Arc::new(MockTorrentClient::new());
        let client = Arc::clone(&torrent_client) as Arc<dyn TorrentClient>;
        let store = Arc::new(JsonTorrentStore::new(config.database_path()));
        let store_dyn = Arc::clone(&store) as Arc<dyn TorrentStore>;
        let notifications: Arc<dyn NotificationStore> = Arc::new(JsonNotificationStore::new(
            config.notifications_path(),
            config.store.notification_retention_hours,
        ));

        let strategy = StrategyRegistry::with_builtins()
            .resolve(&config.library.strategy)
            .expect("Default strategy missing");
        let planner = Arc::new(LibraryLayoutPlanner::new(
            &config.library,
            strategy,
            Arc::new(MockDurationProbe::new()),
        ));
        let engine = Arc::new(ReconciliationEngine::new(
            Arc::clone(&client),
            Arc::clone(&store_dyn),
        ));
        let linker = Arc::new(LibraryLinker::new(&library, Arc::clone(&store_dyn)));
        let monitor = Arc::new(LibraryMonitor::new(
            config.monitor.clone(),
            Arc::clone(&engine),
            Arc::clone(&planner),
            Arc::clone(&linker),
            Arc::clone(&store_dyn),
            Arc::clone(&notifications),
        ));
        let movie_library = Arc::new(MovieLibrary::new(&movies, &config.library.video_extensions));
        let service = Arc::new(
            LibraryService::new(
                client,
                store_dyn,
                notifications,
                engine,
                planner,
                linker,
                monitor,
            )
            .with_movies(movie_library),
        );

        let state = Arc::new(jellylink_server::state::AppState::new(config, service));
        let router = jellylink_server::api::create_router(state);

        Self {
            router,
            torrent_client,
            store,
            library,
            downloads,
            movies,
            temp_dir,
        }
    }

    /// Write a file under the download directory.
    pub fn write_download(&self, relative: &str) {
        let path = self.downloads.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, b"video").unwrap();
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    /// Send a POST request without a body.
    pub async fn post_empty(&self, path: &str) -> TestResponse {
        self.request("POST", path, None).await
    }

    /// Send a DELETE request.
    pub async fn delete(&self, path: &str) -> TestResponse {
        self.request("DELETE", path, None).await
    }

    /// Send a request to the test server.
    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        let request = request_builder.body(body).unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let text = String::from_utf8_lossy(&body_bytes).into_owned();
        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body, text }
    }
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            $response.text
        );
    };
}
