//! Query embedding abstraction and the LLM-service backed implementation.

use std::{future::Future, pin::Pin, sync::Arc};

use ai_llm_service::service_profiles::LlmServiceProfiles;
use tracing::{debug, warn};

use crate::errors::RagError;

/// Asynchronous embedding provider.
///
/// Implement this trait to plug in another embedding backend; the pipeline
/// only ever needs `text → fixed-length vector`.
pub trait EmbeddingsProvider: Send + Sync {
    fn embed<'a>(
        &'a self,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<f32>, RagError>> + Send + 'a>>;
}

/// Embeds through the `embedding` profile of [`LlmServiceProfiles`]
/// (Ollama `/api/embeddings` or OpenAI-compatible `/v1/embeddings`).
#[derive(Clone)]
pub struct LlmEmbedder {
    svc: Arc<LlmServiceProfiles>,
    dim: usize,
}

impl LlmEmbedder {
    pub fn new(svc: Arc<LlmServiceProfiles>, dim: usize) -> Self {
        Self { svc, dim }
    }
}

impl EmbeddingsProvider for LlmEmbedder {
    fn embed<'a>(
        &'a self,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<f32>, RagError>> + Send + 'a>> {
        Box::pin(async move {
            let vector = self.svc.embed(text).await?;

            if vector.len() != self.dim {
                warn!(got = vector.len(), want = self.dim, "embedding dimension mismatch");
                return Err(RagError::VectorSizeMismatch {
                    got: vector.len(),
                    want: self.dim,
                });
            }

            debug!(dim = vector.len(), text_len = text.len(), "query embedded");
            Ok(vector)
        })
    }
}
