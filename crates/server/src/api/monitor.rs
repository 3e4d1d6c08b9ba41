//! Monitor API handlers.

use axum::{extract::State, http::StatusCode, Json};
use jellylink_core::{store::CompletionNotification, CycleReport};
use serde::Serialize;
use std::sync::Arc;

use super::error::{service_error, ApiError};
use crate::state::AppState;

/// Monitor status response
#[derive(Debug, Serialize)]
pub struct MonitorStatusResponse {
    /// Whether the monitor is configured to start with the server
    pub enabled: bool,
    /// Whether the background loop is currently running
    pub running: bool,
    pub interval_secs: u64,
}

#[derive(Debug, Serialize)]
pub struct NotificationsResponse {
    pub notifications: Vec<CompletionNotification>,
    pub count: usize,
}

/// GET /api/v1/monitor
pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<MonitorStatusResponse> {
    let monitor = state.monitor();
    Json(MonitorStatusResponse {
        enabled: monitor.config().enabled,
        running: monitor.is_running(),
        interval_secs: monitor.config().interval_secs,
    })
}

/// POST /api/v1/monitor/run
///
/// Run one cycle now and report what it linked.
pub async fn run_cycle(State(state): State<Arc<AppState>>) -> (StatusCode, Json<CycleReport>) {
    let report = state.service().run_cycle_now().await;
    (StatusCode::OK, Json(report))
}

/// GET /api/v1/notifications
///
/// Pending "added to library" notifications. Reading clears them.
pub async fn take_notifications(
    State(state): State<Arc<AppState>>,
) -> Result<Json<NotificationsResponse>, ApiError> {
    let notifications = state.service().take_notifications().map_err(service_error)?;
    let count = notifications.len();
    Ok(Json(NotificationsResponse {
        notifications,
        count,
    }))
}
