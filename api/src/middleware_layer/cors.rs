use axum::http::{HeaderValue, Method, header};
use std::time::Duration;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::info;

const DEFAULT_ORIGINS: &str = "http://localhost:3002,http://localhost:5173";
/// Preview deployments always allowed next to `ALLOWED_ORIGINS`.
const HOSTED_PATTERNS: [&str; 2] = ["https://*.vercel.app", "https://*.railway.app"];

/// CORS layer from `ALLOWED_ORIGINS` (comma separated). Entries may use one
/// leading `*.` wildcard in the host, e.g. `https://*.vercel.app`.
pub fn build_cors_layer() -> CorsLayer {
    let raw = std::env::var("ALLOWED_ORIGINS").unwrap_or_else(|_| DEFAULT_ORIGINS.to_string());
    let patterns = parse_origins(&raw);
    info!(origins = ?patterns, "CORS origins configured");

    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(move |origin: &HeaderValue, _| {
            origin.to_str().is_ok_and(|o| origin_allowed(&patterns, o))
        }))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::HeaderName::from_static("x-requested-with"),
        ])
        .allow_credentials(true)
        .max_age(Duration::from_secs(3600))
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|o| o.trim().trim_end_matches('/'))
        .filter(|o| !o.is_empty())
        .map(str::to_string)
        .chain(HOSTED_PATTERNS.iter().map(|p| p.to_string()))
        .collect()
}

fn origin_allowed(patterns: &[String], origin: &str) -> bool {
    patterns.iter().any(|p| match p.split_once("*.") {
        Some((scheme, suffix)) => origin
            .strip_prefix(scheme)
            .and_then(|host| host.strip_suffix(suffix))
            .is_some_and(|sub| sub.ends_with('.') && sub.len() > 1 && !sub.contains('/')),
        None => p == origin,
    })
}
