//! GET /api/health: liveness, component availability and provider probes.

use axum::{Json, extract::State};
use chrono::Utc;
use tracing::debug;

use crate::{core::app_state::AppState, routes::health::health_response::HealthResponse};

/// Handler: GET /api/health
///
/// Always answers 200; `status` is `degraded` when a component is missing or
/// a provider probe failed.
pub async fn health_route(State(state): State<AppState>) -> Json<HealthResponse> {
    let components = state.pipeline.availability();
    let providers = state.llm.health_all().await;
    let healthy = components.all() && providers.iter().all(|p| p.ok);

    debug!(healthy, providers = providers.len(), "health checked");

    Json(HealthResponse {
        status: if healthy { "healthy" } else { "degraded" },
        initialized: components.rag_store || components.mcq_store,
        components,
        providers,
        uptime_secs: state.started_at.elapsed().as_secs(),
        timestamp: Utc::now().to_rfc3339(),
    })
}
