//! Previous-year question routes.
//!
//! - POST /api/pyq/search: filtered semantic search
//! - POST /api/pyq/random: random quiz
//! - GET  /api/pyq/filters: distinct exams, subjects and years
//! - GET  /api/pyq/catalog: namespace → exam → year → term counts

use axum::{Json, extract::State};
use contextor::{Catalog, FilterOptions, PyqSearchOptions, QuestionList, RandomOptions};
use tracing::debug;

use crate::{core::app_state::AppState, error_handler::AppResult};

pub async fn pyq_search_route(
    State(state): State<AppState>,
    Json(body): Json<PyqSearchOptions>,
) -> AppResult<Json<QuestionList>> {
    let list = state.pipeline.search_pyq(body).await?;
    debug!(total = list.total, "pyq search served");
    Ok(Json(list))
}

/// An empty body is treated as `{}`.
pub async fn pyq_random_route(
    State(state): State<AppState>,
    body: Option<Json<RandomOptions>>,
) -> AppResult<Json<QuestionList>> {
    let opts = body.map(|Json(o)| o).unwrap_or_default();
    let list = state.pipeline.random_pyq(opts).await?;
    debug!(total = list.total, "random quiz served");
    Ok(Json(list))
}

pub async fn pyq_filters_route(State(state): State<AppState>) -> AppResult<Json<FilterOptions>> {
    Ok(Json(state.pipeline.filters().await?))
}

pub async fn pyq_catalog_route(State(state): State<AppState>) -> AppResult<Json<Catalog>> {
    Ok(Json(state.pipeline.catalog().await?))
}
