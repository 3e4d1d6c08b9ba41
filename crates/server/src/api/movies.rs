//! Movie library API handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use jellylink_core::{AddMovieRequest, MovieEntry};
use serde::Serialize;

use super::error::{service_error, ApiError};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct MovieListResponse {
    pub movies: Vec<MovieEntry>,
    pub count: usize,
}

/// GET /api/v1/movies
pub async fn list_movies(
    State(state): State<Arc<AppState>>,
) -> Result<Json<MovieListResponse>, ApiError> {
    let movies = state.service().list_movies().await.map_err(service_error)?;
    let count = movies.len();
    Ok(Json(MovieListResponse { movies, count }))
}

/// POST /api/v1/movies
pub async fn add_movie(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AddMovieRequest>,
) -> Result<(StatusCode, Json<MovieEntry>), ApiError> {
    let movie = state
        .service()
        .add_movie(request)
        .await
        .map_err(service_error)?;
    Ok((StatusCode::CREATED, Json(movie)))
}

/// DELETE /api/v1/movies/{name}
///
/// Remove the movie link. The movie file stays where it is.
pub async fn remove_movie(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<MovieEntry>, ApiError> {
    state
        .service()
        .remove_movie(&name)
        .await
        .map(Json)
        .map_err(service_error)
}
