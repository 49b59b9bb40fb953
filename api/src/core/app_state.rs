use std::sync::Arc;
use std::time::Instant;

use ai_llm_service::LlmServiceProfiles;
use contextor::StudyPipeline;

use crate::core::dashboard::DashboardCounters;

/// Shared state for all HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<StudyPipeline>,
    /// Kept for `/api/health` provider probes.
    pub llm: Arc<LlmServiceProfiles>,
    pub dashboard: Arc<DashboardCounters>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(pipeline: Arc<StudyPipeline>, llm: Arc<LlmServiceProfiles>) -> Self {
        Self {
            pipeline,
            llm,
            dashboard: Arc::new(DashboardCounters::default()),
            started_at: Instant::now(),
        }
    }

    /// Builds LLM profiles and the pipeline from environment variables.
    pub fn from_env() -> Result<Self, ai_llm_service::AiLlmError> {
        let llm = Arc::new(LlmServiceProfiles::from_env()?);
        let pipeline = Arc::new(StudyPipeline::from_env(llm.clone()));
        Ok(Self::new(pipeline, llm))
    }
}
