//! Mapping of service errors to HTTP responses.

use axum::{http::StatusCode, Json};
use jellylink_core::{LayoutError, LinkerError, MovieError, ServiceError, TorrentClientError};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

impl From<ServiceError> for ErrorResponse {
    fn from(e: ServiceError) -> Self {
        Self {
            error: e.to_string(),
        }
    }
}

pub fn status_for(e: &ServiceError) -> StatusCode {
    match e {
        ServiceError::DaemonUnreachable => StatusCode::SERVICE_UNAVAILABLE,
        ServiceError::Daemon(TorrentClientError::Timeout) => StatusCode::GATEWAY_TIMEOUT,
        ServiceError::Daemon(_) => StatusCode::BAD_GATEWAY,
        ServiceError::MissingContentHash
        | ServiceError::InvalidTitle(_)
        | ServiceError::Layout(
            LayoutError::InvalidTitle(_)
            | LayoutError::InvalidSeason(_)
            | LayoutError::NoVideos(_)
            | LayoutError::Unreadable { .. },
        )
        | ServiceError::Movie(
            MovieError::RelativeSource(_)
            | MovieError::NotAVideo(_)
            | MovieError::SourceNotFound(_)
            | MovieError::InvalidName(_),
        ) => StatusCode::BAD_REQUEST,
        ServiceError::TitleNotFound(_)
        | ServiceError::SeasonNotFound { .. }
        | ServiceError::Linker(LinkerError::NotFound(_))
        | ServiceError::Movie(MovieError::NotFound(_))
        | ServiceError::MoviesDisabled => StatusCode::NOT_FOUND,
        ServiceError::TorrentNotLocated(_)
        | ServiceError::SeasonExists(_)
        | ServiceError::Movie(MovieError::AlreadyExists { .. }) => StatusCode::CONFLICT,
        ServiceError::Linker(LinkerError::RefusedRoot(_) | LinkerError::OutsideLibrary(_)) => {
            StatusCode::FORBIDDEN
        }
        ServiceError::Linker(_)
        | ServiceError::Store(_)
        | ServiceError::Layout(_)
        | ServiceError::Movie(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub fn service_error(e: ServiceError) -> ApiError {
    (status_for(&e), Json(ErrorResponse::from(e)))
}
