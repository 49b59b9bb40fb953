//! Shared LLM service for the study backend.
//!
//! - `config`: provider/model configs loaded from environment variables
//! - `services`: thin HTTP clients (OpenAI-compatible, Ollama)
//! - `service_profiles`: the `chat` + `embedding` profiles used by the pipeline
//! - `health_service`: best-effort provider probes for `/api/health`
//! - `telemetry`: tracing layer and subscriber bootstrap

pub mod chat;
pub mod error_handler;
pub mod health_service;
pub mod service_profiles;
pub mod telemetry;

pub mod config {
    pub mod default_config;
    pub mod llm_model_config;
    pub mod llm_provider;
}

pub mod services {
    pub mod ollama_service;
    pub mod open_ai_service;
}

pub use chat::{ChatMessage, ChatOptions, ChatRole};
pub use config::llm_model_config::LlmModelConfig;
pub use config::llm_provider::LlmProvider;
pub use error_handler::AiLlmError;
pub use service_profiles::LlmServiceProfiles;
