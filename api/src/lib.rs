//! Axum HTTP surface for the study backend.
//!
//! Thin glue only: handlers decode requests, call [`contextor::StudyPipeline`]
//! and encode responses. Errors go through [`error_handler::AppError`].

use std::env;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

pub mod error_handler;

pub mod core {
    pub mod app_state;
    pub mod dashboard;
    pub mod http {
        pub mod response_envelope;
    }
}

mod middleware_layer {
    pub mod cors;
    pub mod json_extractor;
}

mod routes {
    pub mod dashboard {
        pub mod dashboard_routes;
    }
    pub mod health {
        pub mod health_response;
        pub mod health_route;
    }
    pub mod pyq {
        pub mod pyq_routes;
    }
    pub mod search {
        pub mod search_route;
    }
    pub mod stats {
        pub mod stats_route;
    }
}

use crate::{
    core::app_state::AppState,
    error_handler::AppError,
    middleware_layer::{cors::build_cors_layer, json_extractor::json_error_mapper},
    routes::{
        dashboard::dashboard_routes::{dashboard_stats_route, dashboard_track_route},
        health::health_route::health_route,
        pyq::pyq_routes::{pyq_catalog_route, pyq_filters_route, pyq_random_route, pyq_search_route},
        search::search_route::search_route,
        stats::stats_route::stats_route,
    },
};

const DEFAULT_ADDRESS: &str = "0.0.0.0:5000";

/// Builds state from the environment, binds `API_ADDRESS` (or `0.0.0.0:$PORT`)
/// and serves until Ctrl+C.
pub async fn start() -> Result<(), AppError> {
    let host_url = env::var("API_ADDRESS")
        .ok()
        .or_else(|| env::var("PORT").ok().map(|p| format!("0.0.0.0:{}", p.trim())))
        .unwrap_or_else(|| DEFAULT_ADDRESS.to_string());

    let state = AppState::from_env().map_err(|e| AppError::Startup(e.to_string()))?;
    let availability = state.pipeline.availability();
    if !availability.all() {
        warn!(?availability, "starting with missing components; affected routes will answer 503");
    }

    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&host_url)
        .await
        .map_err(AppError::Bind)?;
    info!(address = %host_url, "study API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(AppError::Server)?;

    info!("study API stopped");
    Ok(())
}

/// All routes with CORS, request tracing and JSON rejection mapping.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health_route))
        .route("/api/search", post(search_route))
        .route("/api/stats", get(stats_route))
        .route("/api/pyq/search", post(pyq_search_route))
        .route("/api/pyq/random", post(pyq_random_route))
        .route("/api/pyq/filters", get(pyq_filters_route))
        .route("/api/filters", get(pyq_filters_route))
        .route("/api/pyq/catalog", get(pyq_catalog_route))
        .route("/api/dashboard/stats", get(dashboard_stats_route))
        .route("/api/dashboard/track", post(dashboard_track_route))
        .fallback(|| async { AppError::NotFound })
        .with_state(state)
        .layer(middleware::from_fn(json_error_mapper))
        .layer(build_cors_layer())
        .layer(TraceLayer::new_for_http())
}

/// Resolves when Ctrl+C is pressed.
async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
