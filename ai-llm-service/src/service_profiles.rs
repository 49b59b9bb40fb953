//! Shared LLM service with two profiles: `chat` and `embedding`.
//!
//! - Lives in the same Tokio runtime as the application.
//! - Construct once, wrap in `Arc`, and pass clones to dependents.
//! - Provider clients are built eagerly so configuration errors surface at startup.
//! - Each profile is optional: a missing one fails only the calls that need it.

use tracing::{error, info};

use crate::{
    chat::{ChatMessage, ChatOptions},
    config::{default_config, llm_model_config::LlmModelConfig, llm_provider::LlmProvider},
    error_handler::{AiLlmError, ConfigError},
    health_service::{HealthService, HealthStatus},
    services::{ollama_service::OllamaService, open_ai_service::OpenAiService},
};

/// One ready-to-use provider client.
#[derive(Debug)]
enum Backend {
    Ollama(OllamaService),
    OpenAI(OpenAiService),
}

impl Backend {
    fn build(cfg: LlmModelConfig) -> Result<Self, AiLlmError> {
        Ok(match cfg.provider {
            LlmProvider::Ollama => Backend::Ollama(OllamaService::new(cfg)?),
            LlmProvider::OpenAI => Backend::OpenAI(OpenAiService::new(cfg)?),
        })
    }

    fn config(&self) -> &LlmModelConfig {
        match self {
            Backend::Ollama(s) => s.config(),
            Backend::OpenAI(s) => s.config(),
        }
    }
}

/// Chat + embedding profiles behind one handle.
pub struct LlmServiceProfiles {
    chat: Option<Backend>,
    embedding: Option<Backend>,
    health: HealthService,
}

impl LlmServiceProfiles {
    /// Builds both clients from explicit configs.
    pub fn new(
        chat: LlmModelConfig,
        embedding: LlmModelConfig,
        health_timeout_secs: Option<u64>,
    ) -> Result<Self, AiLlmError> {
        Ok(Self {
            chat: Some(Backend::build(chat)?),
            embedding: Some(Backend::build(embedding)?),
            health: HealthService::new(health_timeout_secs)?,
        })
    }

    /// Builds each profile from environment variables independently.
    ///
    /// A profile whose configuration is missing or invalid is logged and left
    /// out; only building the shared HTTP client can fail here.
    pub fn from_env() -> Result<Self, AiLlmError> {
        let chat = load_profile("chat", default_config::config_chat());
        let embedding = load_profile("embedding", default_config::config_embedding());
        Ok(Self {
            chat,
            embedding,
            health: HealthService::new(Some(5))?,
        })
    }

    pub fn has_chat(&self) -> bool {
        self.chat.is_some()
    }

    pub fn has_embedding(&self) -> bool {
        self.embedding.is_some()
    }

    /// Runs a chat completion on the **chat** profile.
    pub async fn chat(
        &self,
        messages: &[ChatMessage],
        opts: ChatOptions,
    ) -> Result<String, AiLlmError> {
        match &self.chat {
            Some(Backend::Ollama(s)) => s.chat(messages, opts).await,
            Some(Backend::OpenAI(s)) => s.chat(messages, opts).await,
            None => Err(ConfigError::ProfileUnavailable("chat").into()),
        }
    }

    /// Computes one embedding on the **embedding** profile.
    pub async fn embed(&self, input: &str) -> Result<Vec<f32>, AiLlmError> {
        match &self.embedding {
            Some(Backend::Ollama(s)) => s.embeddings(input).await,
            Some(Backend::OpenAI(s)) => s.embeddings(input).await,
            None => Err(ConfigError::ProfileUnavailable("embedding").into()),
        }
    }

    /// Probes the configured profiles concurrently.
    pub async fn health_all(&self) -> Vec<HealthStatus> {
        let (chat, embedding) = tokio::join!(
            self.probe("chat", self.chat.as_ref()),
            self.probe("embedding", self.embedding.as_ref()),
        );
        chat.into_iter().chain(embedding).collect()
    }

    async fn probe(&self, role: &'static str, backend: Option<&Backend>) -> Option<HealthStatus> {
        match backend {
            Some(b) => Some(self.health.check(role, b.config()).await),
            None => None,
        }
    }

    /// Returns `(chat, embedding)` configs when present.
    pub fn profiles(&self) -> (Option<&LlmModelConfig>, Option<&LlmModelConfig>) {
        (
            self.chat.as_ref().map(Backend::config),
            self.embedding.as_ref().map(Backend::config),
        )
    }
}

fn load_profile(role: &'static str, cfg: Result<LlmModelConfig, AiLlmError>) -> Option<Backend> {
    match cfg.and_then(Backend::build) {
        Ok(backend) => {
            let cfg = backend.config();
            info!(role, provider = ?cfg.provider, model = %cfg.model, "LLM profile ready");
            Some(backend)
        }
        Err(e) => {
            error!(role, error = %e, "LLM profile unavailable");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ollama(model: &str) -> LlmModelConfig {
        LlmModelConfig {
            provider: LlmProvider::Ollama,
            model: model.into(),
            endpoint: "http://localhost:11434".into(),
            api_key: None,
            max_tokens: None,
            temperature: None,
            top_p: None,
            timeout_secs: Some(1),
        }
    }

    #[test]
    fn builds_mixed_profiles() {
        let chat = LlmModelConfig {
            provider: LlmProvider::OpenAI,
            endpoint: "https://api.groq.com/openai".into(),
            api_key: Some("k".into()),
            ..ollama("llama-3.1-8b-instant")
        };
        let svc = LlmServiceProfiles::new(chat, ollama("all-minilm"), Some(1)).unwrap();
        let (c, e) = svc.profiles();
        assert_eq!(c.map(|c| c.provider), Some(LlmProvider::OpenAI));
        assert_eq!(e.map(|e| e.model.as_str()), Some("all-minilm"));
        assert!(svc.has_chat() && svc.has_embedding());
    }

    #[test]
    fn openai_chat_without_key_fails_at_startup() {
        let chat = LlmModelConfig {
            provider: LlmProvider::OpenAI,
            ..ollama("m")
        };
        assert!(LlmServiceProfiles::new(chat, ollama("e"), None).is_err());
    }

    #[tokio::test]
    async fn missing_profile_fails_only_its_calls() {
        let svc = LlmServiceProfiles {
            chat: None,
            embedding: Some(Backend::build(ollama("all-minilm")).unwrap()),
            health: HealthService::new(Some(1)).unwrap(),
        };
        let err = svc.chat(&[ChatMessage::user("hi")], ChatOptions::default()).await.unwrap_err();
        assert!(err.to_string().contains("chat"));
        assert!(svc.has_embedding());
    }
}
