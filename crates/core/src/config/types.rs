use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::monitor::MonitorConfig;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub daemon: QBittorrentConfig,
    pub library: LibraryConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub probe: ProbeConfig,
    #[serde(default)]
    pub movies: MoviesConfig,
}

impl Config {
    /// Location of the tracked torrent database.
    pub fn database_path(&self) -> PathBuf {
        self.store
            .database_path
            .clone()
            .unwrap_or_else(|| self.library.root.join("torrent_database.json"))
    }

    /// Location of the completion notifications file.
    pub fn notifications_path(&self) -> PathBuf {
        self.store
            .notifications_path
            .clone()
            .unwrap_or_else(|| self.library.root.join("torrent_notifications.json"))
    }
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    8080
}

/// qBittorrent Web API configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QBittorrentConfig {
    /// Web UI base URL (e.g., "http://localhost:1337")
    #[serde(default = "default_daemon_url")]
    pub url: String,
    #[serde(default = "default_username")]
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// Timeout for login and data calls in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
    /// Timeout for the reachability check in seconds
    #[serde(default = "default_health_timeout")]
    pub health_timeout_secs: u32,
    /// Save path sent with new torrents when the caller gives none
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_save_path: Option<String>,
    #[serde(default)]
    pub retry: RetryPolicy,
}

impl Default for QBittorrentConfig {
    fn default() -> Self {
        Self {
            url: default_daemon_url(),
            username: default_username(),
            password: String::new(),
            timeout_secs: default_timeout(),
            health_timeout_secs: default_health_timeout(),
            default_save_path: None,
            retry: RetryPolicy::default(),
        }
    }
}

fn default_daemon_url() -> String {
    "http://localhost:1337".to_string()
}

fn default_username() -> String {
    "admin".to_string()
}

fn default_timeout() -> u32 {
    10
}

fn default_health_timeout() -> u32 {
    5
}

/// Bounded retry with exponential backoff for daemon calls.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the second attempt in milliseconds.
    #[serde(default = "default_initial_delay")]
    pub initial_delay_ms: u64,

    /// Upper bound for any single delay in milliseconds.
    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,

    /// Exponential backoff multiplier.
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay() -> u64 {
    500
}

fn default_max_delay() -> u64 {
    5000
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay(),
            max_delay_ms: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Delay to wait after the given failed attempt (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        let delay = self.initial_delay_ms as f64 * self.backoff_multiplier.powi(exponent);
        let capped = delay.min(self.max_delay_ms as f64).max(0.0);
        Duration::from_millis(capped as u64)
    }
}

/// Library layout configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LibraryConfig {
    /// Root of the anime library (one folder per title lives here)
    pub root: PathBuf,
    /// Extensions (without the dot, case-insensitive) treated as video files
    #[serde(default = "default_video_extensions")]
    pub video_extensions: Vec<String>,
    /// Files strictly longer than this are routed to `Movies`
    #[serde(default = "default_movie_min_duration")]
    pub movie_min_duration_secs: u64,
    /// Name of the registered layout strategy
    #[serde(default = "default_strategy")]
    pub strategy: String,
}

impl LibraryConfig {
    /// Library config rooted at `root` with every other field defaulted.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            video_extensions: default_video_extensions(),
            movie_min_duration_secs: default_movie_min_duration(),
            strategy: default_strategy(),
        }
    }
}

fn default_video_extensions() -> Vec<String> {
    vec!["mkv".to_string(), "mp4".to_string(), "avi".to_string()]
}

fn default_movie_min_duration() -> u64 {
    40 * 60
}

fn default_strategy() -> String {
    "jellyfin".to_string()
}

/// Stand-alone movie library configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MoviesConfig {
    /// Folder holding one subfolder per linked movie. Movie operations are
    /// unavailable when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,
}

/// Persistence configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StoreConfig {
    /// Defaults to `<library.root>/torrent_database.json`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_path: Option<PathBuf>,
    /// Defaults to `<library.root>/torrent_notifications.json`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notifications_path: Option<PathBuf>,
    #[serde(default = "default_retention_hours")]
    pub notification_retention_hours: u32,
}

fn default_retention_hours() -> u32 {
    24
}

/// Duration probe configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProbeConfig {
    #[serde(default = "default_ffprobe_path")]
    pub ffprobe_path: PathBuf,
    #[serde(default = "default_probe_timeout")]
    pub timeout_secs: u64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            ffprobe_path: default_ffprobe_path(),
            timeout_secs: default_probe_timeout(),
        }
    }
}

fn default_ffprobe_path() -> PathBuf {
    PathBuf::from("ffprobe")
}

fn default_probe_timeout() -> u64 {
    30
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub daemon: SanitizedDaemonConfig,
    pub library: LibraryConfig,
    pub database_path: PathBuf,
    pub notifications_path: PathBuf,
    pub monitor: MonitorConfig,
    pub probe: ProbeConfig,
    pub movies: MoviesConfig,
}

/// Sanitized daemon config (password hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedDaemonConfig {
    pub url: String,
    pub username: String,
    pub password_configured: bool,
    pub timeout_secs: u32,
    pub health_timeout_secs: u32,
    pub retry: RetryPolicy,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            daemon: SanitizedDaemonConfig {
                url: config.daemon.url.clone(),
                username: config.daemon.username.clone(),
                password_configured: !config.daemon.password.is_empty(),
                timeout_secs: config.daemon.timeout_secs,
                health_timeout_secs: config.daemon.health_timeout_secs,
                retry: config.daemon.retry.clone(),
            },
            library: config.library.clone(),
            database_path: config.database_path(),
            notifications_path: config.notifications_path(),
            monitor: config.monitor.clone(),
            probe: config.probe.clone(),
            movies: config.movies.clone(),
        }
    }
}
