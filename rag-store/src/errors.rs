//! Unified error types for the crate.

use thiserror::Error;

/// Top-level error for rag-store operations.
#[derive(Debug, Error)]
pub enum RagError {
    /// Invalid or unsupported configuration.
    #[error("config error: {0}")]
    Config(String),

    /// JSON parsing / serialization errors.
    #[error("parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Qdrant client errors (wrapped).
    #[error("qdrant error: {0}")]
    Qdrant(String),

    /// Transport failure talking to a REST vector store.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-2xx answer from a REST vector store.
    #[error("upstream {url} returned {status}: {snippet}")]
    Upstream {
        status: u16,
        url: String,
        snippet: String,
    },

    /// Query embedding has a different size than the index.
    #[error("vector size mismatch: got {got}, want {want}")]
    VectorSizeMismatch { got: usize, want: usize },

    /// Embedding provider failed.
    #[error("embedding error: {0}")]
    Embedding(#[from] ai_llm_service::AiLlmError),
}
