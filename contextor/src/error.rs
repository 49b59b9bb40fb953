//! Typed error for the contextor crate.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ContextorError {
    /// A component needed by this operation was not configured or failed at startup.
    #[error("{0} is not available")]
    Unavailable(&'static str),

    /// Every namespace of a fan-out failed.
    #[error("all {attempted} namespace queries failed; last error: {last}")]
    AllNamespacesFailed { attempted: usize, last: String },

    /// The LLM call behind answer generation failed. Not retried.
    #[error("answer generation failed: {0}")]
    Generation(#[source] ai_llm_service::AiLlmError),

    /// The request exceeded its wall-clock budget.
    #[error("request exceeded its {0:?} deadline")]
    Timeout(Duration),

    /// Errors from the underlying rag-store crate.
    #[error("RAG error: {0}")]
    Rag(#[from] rag_store::RagError),

    /// LLM service errors outside generation (configuration, health).
    #[error("LLM service error: {0}")]
    Llm(#[from] ai_llm_service::AiLlmError),

    /// The caller sent something unusable.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl ContextorError {
    /// Stable machine-readable code for API payloads.
    pub fn code(&self) -> &'static str {
        match self {
            ContextorError::Unavailable(_) => "SERVICE_UNAVAILABLE",
            ContextorError::AllNamespacesFailed { .. } => "RETRIEVAL_FAILED",
            ContextorError::Generation(_) => "GENERATION_FAILED",
            ContextorError::Timeout(_) => "TIMEOUT",
            ContextorError::Rag(_) => "VECTOR_STORE_ERROR",
            ContextorError::Llm(_) => "LLM_ERROR",
            ContextorError::InvalidRequest(_) => "INVALID_REQUEST",
        }
    }
}
