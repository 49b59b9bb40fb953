use ai_llm_service::health_service::HealthStatus;
use contextor::Availability;
use serde::Serialize;

/// Response payload for /api/health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    /// At least one vector index is reachable.
    pub initialized: bool,
    pub components: Availability,
    pub providers: Vec<HealthStatus>,
    pub uptime_secs: u64,
    pub timestamp: String,
}
