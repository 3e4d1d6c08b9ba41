//! Library API handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use jellylink_core::{
    linker::LibraryTitle, DaemonRemoval, LocalLink, LocalLinkRequest, SeasonRemoval, TitleRemoval,
};
use serde::{Deserialize, Serialize};

use super::error::{service_error, ApiError};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct LibraryListResponse {
    pub titles: Vec<LibraryTitle>,
    pub count: usize,
}

#[derive(Debug, Default, Deserialize)]
pub struct RemoveTitleParams {
    /// Also remove the torrent from the daemon.
    #[serde(default)]
    pub remove_torrent: bool,
    /// With `remove_torrent`, delete the downloaded files too.
    #[serde(default)]
    pub delete_files: bool,
}

/// GET /api/v1/library
pub async fn list_library(
    State(state): State<Arc<AppState>>,
) -> Result<Json<LibraryListResponse>, ApiError> {
    let titles = state.service().library().await.map_err(service_error)?;
    let count = titles.len();
    Ok(Json(LibraryListResponse { titles, count }))
}

/// POST /api/v1/library
///
/// Link a local folder into the library as one season.
pub async fn link_local_folder(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LocalLinkRequest>,
) -> Result<(StatusCode, Json<LocalLink>), ApiError> {
    let link = state
        .service()
        .link_local_folder(request)
        .await
        .map_err(service_error)?;
    Ok((StatusCode::CREATED, Json(link)))
}

/// DELETE /api/v1/library/{title}
///
/// Remove a title folder and its tracked record.
pub async fn remove_title(
    State(state): State<Arc<AppState>>,
    Path(title): Path<String>,
    Query(params): Query<RemoveTitleParams>,
) -> Result<Json<TitleRemoval>, ApiError> {
    let daemon = DaemonRemoval::from_flags(params.remove_torrent, params.delete_files);
    state
        .service()
        .remove_title(&title, daemon)
        .await
        .map(Json)
        .map_err(service_error)
}

/// DELETE /api/v1/library/{title}/seasons/{season}
///
/// Remove one season folder; the title goes too once no seasons remain.
pub async fn remove_season(
    State(state): State<Arc<AppState>>,
    Path((title, season)): Path<(String, u32)>,
) -> Result<Json<SeasonRemoval>, ApiError> {
    state
        .service()
        .remove_season(&title, season)
        .await
        .map(Json)
        .map_err(service_error)
}
