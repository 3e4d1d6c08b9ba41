//! Tracked torrent API handlers.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use jellylink_core::{AddTrackedTorrent, TrackedTorrent, TrackedView};

use super::error::{service_error, ApiError};
use crate::state::AppState;

/// GET /api/v1/torrents
///
/// Tracked torrents merged with live daemon status. A daemon that cannot be
/// reached is reported in `reason`, next to the stored torrents.
pub async fn list_tracked(
    State(state): State<Arc<AppState>>,
) -> Result<Json<TrackedView>, ApiError> {
    state
        .service()
        .tracked_view()
        .await
        .map(Json)
        .map_err(service_error)
}

/// POST /api/v1/torrents
///
/// Add a torrent to the daemon and start tracking it.
pub async fn add_torrent(
    State(state): State<Arc<AppState>>,
    Json(body): Json<AddTrackedTorrent>,
) -> Result<(StatusCode, Json<TrackedTorrent>), ApiError> {
    let torrent = state
        .service()
        .add_torrent(body)
        .await
        .map_err(service_error)?;
    Ok((StatusCode::CREATED, Json(torrent)))
}
