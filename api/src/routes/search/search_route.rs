//! POST /api/search: study answer with curriculum sources and related MCQs.

use axum::{Json, extract::State};
use contextor::{SearchAnswer, SearchOptions};
use tracing::info;

use crate::{
    core::{app_state::AppState, dashboard::Interaction},
    error_handler::AppResult,
};

/// Handler: POST /api/search
///
/// # Example
/// ```bash
/// curl -X POST http://127.0.0.1:5000/api/search \
///   -H 'content-type: application/json' \
///   -d '{"query":"What is photosynthesis?","n_results":5,"namespace":"biology"}'
/// ```
pub async fn search_route(
    State(state): State<AppState>,
    Json(body): Json<SearchOptions>,
) -> AppResult<Json<SearchAnswer>> {
    let answer = state.pipeline.search(body).await?;
    state.dashboard.record(Interaction::Search);

    info!(
        sources = answer.sources.len(),
        mcqs = answer.mcqs.len(),
        escalated = answer.escalated,
        "search served"
    );
    Ok(Json(answer))
}
