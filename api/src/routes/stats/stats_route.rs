//! GET /api/stats: index totals and taxonomy counts.

use axum::{Json, extract::State};
use contextor::StatsReport;

use crate::{core::app_state::AppState, error_handler::AppResult};

pub async fn stats_route(State(state): State<AppState>) -> AppResult<Json<StatsReport>> {
    Ok(Json(state.pipeline.stats().await?))
}
