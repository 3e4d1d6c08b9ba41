pub mod config;
pub mod layout;
pub mod linker;
pub mod metrics;
pub mod monitor;
pub mod movies;
pub mod probe;
pub mod reconcile;
pub mod service;
pub mod store;
pub mod testing;
pub mod torrent_client;

pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, LibraryConfig,
    SanitizedConfig,
};
pub use layout::{
    LayoutError, LayoutPlan, LayoutStrategy, LibraryLayoutPlanner, StrategyRegistry, TargetFolder,
};
pub use linker::{
    cleanup_jellyfin_files, find_provenance, scan_library, LibraryLinker, LibraryTitle,
    LinkReport, LinkerError, ProvenanceRecord,
};
pub use monitor::{CycleReport, LibraryMonitor, MonitorConfig};
pub use movies::{AddMovieRequest, MovieEntry, MovieError, MovieLibrary};
pub use probe::{DurationProbe, FfprobeDurationProbe, ProbeError};
pub use reconcile::{
    classify_completed, ReconciliationEngine, SyncError, SyncOutcome, SyncedTorrentView,
};
pub use service::{
    AddTrackedTorrent, DaemonRemoval, LibraryService, LocalLink, LocalLinkRequest, SeasonRemoval,
    ServiceError, TitleRemoval, TrackedView,
};
pub use store::{
    JsonNotificationStore, JsonTorrentStore, NotificationStore, StoreError, TorrentStore,
    TrackedStatus, TrackedTorrent,
};
pub use torrent_client::{DaemonState, QBittorrentClient, TorrentClient, TorrentClientError};
