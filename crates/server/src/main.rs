use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use jellylink_core::{
    load_config, validate_config, DurationProbe, FfprobeDurationProbe, JsonNotificationStore,
    JsonTorrentStore, LayoutStrategy, LibraryLayoutPlanner, LibraryLinker, LibraryMonitor,
    LibraryService, MovieLibrary, NotificationStore, QBittorrentClient, ReconciliationEngine,
    StrategyRegistry, TorrentClient, TorrentStore,
};

use jellylink_server::{api::create_router, state::AppState};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = std::env::var("JELLYLINK_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!("Library root: {:?}", config.library.root);
    info!("Database path: {:?}", config.database_path());

    // Torrent daemon
    info!("Initializing qBittorrent client at {}", config.daemon.url);
    let client: Arc<dyn TorrentClient> = Arc::new(
        QBittorrentClient::new(config.daemon.clone())
            .context("Failed to create qBittorrent client")?,
    );

    // Stores
    let store: Arc<dyn TorrentStore> = Arc::new(JsonTorrentStore::new(config.database_path()));
    let notifications: Arc<dyn NotificationStore> = Arc::new(JsonNotificationStore::new(
        config.notifications_path(),
        config.store.notification_retention_hours,
    ));
    info!("Torrent store initialized");

    // Layout planning
    let probe: Arc<dyn DurationProbe> = Arc::new(FfprobeDurationProbe::new(config.probe.clone()));
    let strategy = StrategyRegistry::with_builtins()
        .resolve(&config.library.strategy)
        .context("Failed to resolve layout strategy")?;
    info!("Using layout strategy: {}", strategy.name());
    let planner = Arc::new(LibraryLayoutPlanner::new(&config.library, strategy, probe));

    let engine = Arc::new(ReconciliationEngine::new(
        Arc::clone(&client),
        Arc::clone(&store),
    ));
    let linker = Arc::new(LibraryLinker::new(
        config.library.root.clone(),
        Arc::clone(&store),
    ));

    let monitor = Arc::new(LibraryMonitor::new(
        config.monitor.clone(),
        Arc::clone(&engine),
        Arc::clone(&planner),
        Arc::clone(&linker),
        Arc::clone(&store),
        Arc::clone(&notifications),
    ));

    if config.monitor.enabled {
        monitor.start().await;
        info!("Library monitor started");
    } else {
        info!("Library monitor disabled in config");
    }

    let mut service = LibraryService::new(
        client,
        store,
        notifications,
        engine,
        planner,
        linker,
        Arc::clone(&monitor),
    );
    match &config.movies.root {
        Some(root) => {
            info!("Movie library root: {:?}", root);
            service = service.with_movies(Arc::new(MovieLibrary::new(
                root.clone(),
                &config.library.video_extensions,
            )));
        }
        None => info!("Movie library not configured"),
    }
    let service = Arc::new(service);

    // Create app state
    let state = Arc::new(AppState::new(config.clone(), service));

    // Create router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutting down...");
    if monitor.is_running() {
        monitor.stop().await;
    }

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
