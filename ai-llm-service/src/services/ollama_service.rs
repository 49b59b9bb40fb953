//! Lightweight Ollama client for chat and embeddings.
//!
//! - `POST {endpoint}/api/chat`: non-streaming chat (`stream=false`)
//! - `POST {endpoint}/api/embeddings`: single embedding (`prompt` field)

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::{
    chat::{ChatMessage, ChatOptions},
    config::{llm_model_config::LlmModelConfig, llm_provider::LlmProvider},
    error_handler::{
        AiLlmError, HttpError, Provider, ProviderError, ProviderErrorKind, make_snippet,
    },
};

/// Thin client for Ollama. Reuses one HTTP client per config.
#[derive(Debug)]
pub struct OllamaService {
    client: reqwest::Client,
    cfg: LlmModelConfig,
    url_chat: String,
    url_embeddings: String,
}

impl OllamaService {
    /// Creates a new [`OllamaService`].
    ///
    /// # Errors
    /// - `InvalidProvider` if `cfg.provider` is not `Ollama`
    /// - `InvalidEndpoint` if `cfg.endpoint` is not http(s)
    /// - [`AiLlmError::HttpTransport`] if the HTTP client cannot be built
    pub fn new(cfg: LlmModelConfig) -> Result<Self, AiLlmError> {
        if cfg.provider != LlmProvider::Ollama {
            return Err(
                ProviderError::new(Provider::Ollama, ProviderErrorKind::InvalidProvider).into(),
            );
        }

        let base = cfg.base_url().to_string();
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(ProviderError::new(
                Provider::Ollama,
                ProviderErrorKind::InvalidEndpoint(cfg.endpoint.clone()),
            )
            .into());
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs.unwrap_or(60)))
            .gzip(true)
            .brotli(true)
            .build()?;

        Ok(Self {
            client,
            url_chat: format!("{base}/api/chat"),
            url_embeddings: format!("{base}/api/embeddings"),
            cfg,
        })
    }

    pub fn config(&self) -> &LlmModelConfig {
        &self.cfg
    }

    /// Non-streaming chat via `/api/chat`.
    ///
    /// Maps `max_tokens` to `num_predict`; `opts` win over the config.
    #[instrument(skip_all, fields(model = %self.cfg.model, turns = messages.len()))]
    pub async fn chat(
        &self,
        messages: &[ChatMessage],
        opts: ChatOptions,
    ) -> Result<String, AiLlmError> {
        let started = Instant::now();
        let body = ChatRequest {
            model: &self.cfg.model,
            messages,
            stream: false,
            options: RuntimeOptions {
                temperature: opts.temperature.or(self.cfg.temperature),
                top_p: self.cfg.top_p,
                num_predict: opts.max_tokens.or(self.cfg.max_tokens),
            },
        };

        debug!("POST {}", self.url_chat);
        let resp = self.client.post(&self.url_chat).json(&body).send().await?;
        let resp = check_status(resp, &self.url_chat).await?;

        let out: ChatResponse = resp.json().await.map_err(|e| {
            ProviderError::new(
                Provider::Ollama,
                ProviderErrorKind::Decode(format!(
                    "serde error: {e}; expected `message.content` with stream=false"
                )),
            )
        })?;

        if out.message.content.trim().is_empty() {
            return Err(ProviderError::new(Provider::Ollama, ProviderErrorKind::EmptyChoices).into());
        }

        debug!(latency_ms = started.elapsed().as_millis(), "ollama chat completed");
        Ok(out.message.content)
    }

    /// Retrieves one embedding vector via `/api/embeddings`.
    #[instrument(skip_all, fields(model = %self.cfg.model))]
    pub async fn embeddings(&self, input: &str) -> Result<Vec<f32>, AiLlmError> {
        let body = EmbeddingsRequest {
            model: &self.cfg.model,
            prompt: input,
        };

        debug!("POST {}", self.url_embeddings);
        let resp = self
            .client
            .post(&self.url_embeddings)
            .json(&body)
            .send()
            .await?;
        let resp = check_status(resp, &self.url_embeddings).await?;

        let out: EmbeddingsResponse = resp.json().await.map_err(|e| {
            ProviderError::new(
                Provider::Ollama,
                ProviderErrorKind::Decode(format!(
                    "serde error: {e}; expected `{{ embedding: number[] }}`"
                )),
            )
        })?;

        Ok(out.embedding)
    }
}

async fn check_status(resp: reqwest::Response, url: &str) -> Result<reqwest::Response, AiLlmError> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status();
    let text = resp.text().await.unwrap_or_default();
    let snippet = make_snippet(&text);
    warn!(%status, %url, %snippet, "ollama returned non-success status");
    Err(ProviderError::new(
        Provider::Ollama,
        ProviderErrorKind::HttpStatus(HttpError {
            status,
            url: url.to_string(),
            snippet,
        }),
    )
    .into())
}

/* ==========================
HTTP payloads
========================== */

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    options: RuntimeOptions,
}

/// Subset of Ollama `options`.
#[derive(Debug, Default, Serialize)]
struct RuntimeOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ChatMessage,
}

#[derive(Debug, Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    embedding: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> LlmModelConfig {
        LlmModelConfig {
            provider: LlmProvider::Ollama,
            model: "all-minilm".into(),
            endpoint: "http://localhost:11434//".into(),
            api_key: None,
            max_tokens: None,
            temperature: Some(0.0),
            top_p: None,
            timeout_secs: Some(5),
        }
    }

    #[test]
    fn urls_and_provider_check() {
        let svc = OllamaService::new(cfg()).unwrap();
        assert_eq!(svc.url_embeddings, "http://localhost:11434/api/embeddings");
        assert_eq!(svc.url_chat, "http://localhost:11434/api/chat");

        let mut bad = cfg();
        bad.endpoint = "localhost:11434".into();
        assert!(OllamaService::new(bad).is_err());
    }

    #[test]
    fn embeddings_body_uses_prompt_field() {
        let body = EmbeddingsRequest {
            model: "all-minilm",
            prompt: "photosynthesis",
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["prompt"], "photosynthesis");
        assert!(json.get("input").is_none());
    }
}
