use crate::config::llm_provider::LlmProvider;

/// Configuration for an LLM model invocation.
///
/// # Fields
///
/// - `provider`: which backend to call (Ollama or an OpenAI-compatible API).
/// - `model`: model identifier (e.g. `"llama-3.1-70b-versatile"`, `"all-minilm"`).
/// - `endpoint`: API base URL without the `/v1/...` suffix.
/// - `api_key`: optional bearer token.
/// - `max_tokens`: upper bound on generated tokens.
/// - `temperature`: sampling temperature (low values favour faithfulness).
/// - `top_p`: nucleus sampling cutoff.
/// - `timeout_secs`: per-request HTTP timeout.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmModelConfig {
    pub provider: LlmProvider,
    pub model: String,
    pub endpoint: String,
    pub api_key: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub timeout_secs: Option<u64>,
}

impl LlmModelConfig {
    /// Endpoint with trailing slashes removed, ready for path concatenation.
    pub fn base_url(&self) -> &str {
        self.endpoint.trim().trim_end_matches('/')
    }
}
