use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::{handlers, library, middleware::metrics_middleware, monitor, movies, torrents};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // API routes
    let api_routes = Router::new()
        // Health and config
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        // Tracked torrents
        .route("/torrents", get(torrents::list_tracked))
        .route("/torrents", post(torrents::add_torrent))
        // Background monitor
        .route("/monitor", get(monitor::get_status))
        .route("/monitor/run", post(monitor::run_cycle))
        .route("/notifications", get(monitor::take_notifications))
        // Library
        .route("/library", get(library::list_library))
        .route("/library", post(library::link_local_folder))
        .route("/library/{title}", delete(library::remove_title))
        .route(
            "/library/{title}/seasons/{season}",
            delete(library::remove_season),
        )
        // Movies
        .route("/movies", get(movies::list_movies))
        .route("/movies", post(movies::add_movie))
        .route("/movies/{name}", delete(movies::remove_movie));

    Router::new()
        .route("/metrics", get(handlers::metrics))
        .nest("/api/v1", api_routes)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
