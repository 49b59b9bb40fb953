//! Dashboard counters: GET /api/dashboard/stats, POST /api/dashboard/track.

use axum::{Json, extract::State, http::StatusCode, response::Response};
use serde::Deserialize;

use crate::{
    core::{
        app_state::AppState,
        dashboard::{DashboardSnapshot, Interaction},
        http::response_envelope::ApiResponse,
    },
    error_handler::{AppError, AppResult},
};

/// Request payload for /api/dashboard/track.
#[derive(Debug, Deserialize)]
pub struct TrackRequest {
    #[serde(rename = "type", alias = "interaction")]
    pub kind: String,
}

pub async fn dashboard_stats_route(State(state): State<AppState>) -> Json<DashboardSnapshot> {
    Json(state.dashboard.snapshot())
}

pub async fn dashboard_track_route(
    State(state): State<AppState>,
    Json(body): Json<TrackRequest>,
) -> AppResult<Response> {
    let kind: Interaction = body.kind.parse().map_err(AppError::BadRequest)?;
    state.dashboard.record(kind);
    Ok(ApiResponse::success(state.dashboard.snapshot()).into_response_with_status(StatusCode::OK))
}
