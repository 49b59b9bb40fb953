//! Default LLM configs loaded strictly from environment variables.
//!
//! Two roles are used by the study backend:
//!
//! - **Chat**      → answer generation (Groq / any OpenAI-compatible API, or Ollama)
//! - **Embedding** → query embeddings (dimension must match the vector index)
//!
//! # Environment variables
//!
//! Chat:
//! - `LLM_PROVIDER`    = `openai` | `groq` | `ollama` (default `groq`)
//! - `LLM_API_KEY` or `GROQ_API_KEY` = bearer token (required for OpenAI-compatible)
//! - `LLM_ENDPOINT`    = base URL (default `https://api.groq.com/openai`)
//! - `LLM_MODEL`       = model id (default `llama-3.1-8b-instant`)
//! - `LLM_MAX_TOKENS`  = optional (default 1024)
//! - `LLM_TEMPERATURE` = optional (default 0.3)
//!
//! Embedding:
//! - `EMBEDDING_PROVIDER` = `ollama` | `openai` (default `ollama`)
//! - `EMBEDDING_MODEL`    = model id (default `all-minilm`)
//! - `EMBEDDING_ENDPOINT` = base URL (falls back to `OLLAMA_URL`, then `http://localhost:11434`)
//! - `EMBEDDING_API_KEY`  = bearer token for OpenAI-compatible embeddings

use crate::{
    config::{llm_model_config::LlmModelConfig, llm_provider::LlmProvider},
    error_handler::{
        AiLlmError, ConfigError, env_opt_f32, env_opt_u32, opt_env, validate_http_endpoint,
        validate_range_f32,
    },
};

const DEFAULT_CHAT_ENDPOINT: &str = "https://api.groq.com/openai";
const DEFAULT_CHAT_MODEL: &str = "llama-3.1-8b-instant";
const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
const DEFAULT_EMBEDDING_MODEL: &str = "all-minilm";

fn provider_from_env(var: &'static str, default: LlmProvider) -> Result<LlmProvider, AiLlmError> {
    match opt_env(var) {
        Some(raw) => Ok(raw.parse::<LlmProvider>()?),
        None => Ok(default),
    }
}

fn ollama_endpoint() -> String {
    opt_env("OLLAMA_URL").unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string())
}

/// Constructs the config for the answer-generation model.
///
/// # Defaults
/// - `max_tokens = Some(1024)`
/// - `temperature = Some(0.3)`
/// - `timeout_secs = Some(25)` (stays inside the request deadline)
///
/// # Errors
/// - [`ConfigError::MissingVar`] if an OpenAI-compatible provider has no API key
/// - [`ConfigError::InvalidNumber`] / [`ConfigError::OutOfRange`] for bad numerics
pub fn config_chat() -> Result<LlmModelConfig, AiLlmError> {
    let provider = provider_from_env("LLM_PROVIDER", LlmProvider::OpenAI)?;

    let (endpoint, api_key) = match provider {
        LlmProvider::OpenAI => {
            let key = opt_env("LLM_API_KEY")
                .or_else(|| opt_env("GROQ_API_KEY"))
                .ok_or(ConfigError::MissingVar("LLM_API_KEY or GROQ_API_KEY"))?;
            let endpoint =
                opt_env("LLM_ENDPOINT").unwrap_or_else(|| DEFAULT_CHAT_ENDPOINT.to_string());
            (endpoint, Some(key))
        }
        LlmProvider::Ollama => (
            opt_env("LLM_ENDPOINT").unwrap_or_else(ollama_endpoint),
            None,
        ),
    };
    validate_http_endpoint("LLM_ENDPOINT", &endpoint)?;

    let model = opt_env("LLM_MODEL").unwrap_or_else(|| DEFAULT_CHAT_MODEL.to_string());
    let max_tokens = env_opt_u32("LLM_MAX_TOKENS")?.unwrap_or(1024);
    let temperature = env_opt_f32("LLM_TEMPERATURE")?.unwrap_or(0.3);
    validate_range_f32("LLM_TEMPERATURE", temperature, 0.0, 2.0)?;

    Ok(LlmModelConfig {
        provider,
        model,
        endpoint,
        api_key,
        max_tokens: Some(max_tokens),
        temperature: Some(temperature),
        top_p: None,
        timeout_secs: Some(25),
    })
}

/// Constructs the config for the query-embedding model.
///
/// # Defaults
/// - provider Ollama, model `all-minilm` (384 dimensions)
/// - `temperature = Some(0.0)` (deterministic)
/// - `timeout_secs = Some(15)`
pub fn config_embedding() -> Result<LlmModelConfig, AiLlmError> {
    let provider = provider_from_env("EMBEDDING_PROVIDER", LlmProvider::Ollama)?;

    let endpoint = match provider {
        LlmProvider::Ollama => opt_env("EMBEDDING_ENDPOINT").unwrap_or_else(ollama_endpoint),
        LlmProvider::OpenAI => opt_env("EMBEDDING_ENDPOINT")
            .ok_or(ConfigError::MissingVar("EMBEDDING_ENDPOINT"))?,
    };
    validate_http_endpoint("EMBEDDING_ENDPOINT", &endpoint)?;

    let api_key = match provider {
        LlmProvider::Ollama => None,
        LlmProvider::OpenAI => Some(
            opt_env("EMBEDDING_API_KEY")
                .or_else(|| opt_env("LLM_API_KEY"))
                .ok_or(ConfigError::MissingVar("EMBEDDING_API_KEY"))?,
        ),
    };

    let model = opt_env("EMBEDDING_MODEL").unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string());
    if model.trim().is_empty() {
        return Err(ConfigError::EmptyModel.into());
    }

    Ok(LlmModelConfig {
        provider,
        model,
        endpoint,
        api_key,
        max_tokens: None,
        temperature: Some(0.0),
        top_p: None,
        timeout_secs: Some(15),
    })
}
