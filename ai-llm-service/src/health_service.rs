//! Health probes for the configured LLM backends.
//!
//! - Ollama: `GET {endpoint}/api/tags` (model must appear in `models[].name`)
//! - OpenAI-compatible: `GET {endpoint}/v1/models` with Bearer auth (model in `data[].id`)
//!
//! [`HealthService::check`] never fails: every error becomes `ok = false`,
//! which is what `/api/health` wants to report.

use std::time::{Duration, Instant};

use reqwest::header;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::llm_model_config::LlmModelConfig;
use crate::config::llm_provider::LlmProvider;
use crate::error_handler::{AiLlmError, HealthError, HttpError, make_snippet};

/// A serializable health snapshot for one profile.
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    /// Logical role (`chat`, `embedding`).
    pub role: String,
    pub provider: String,
    pub model: String,
    pub ok: bool,
    pub latency_ms: u128,
    pub message: String,
}

/// Reuses a single HTTP client for all probes.
pub struct HealthService {
    client: reqwest::Client,
    timeout: Duration,
}

impl HealthService {
    /// # Errors
    /// Returns [`AiLlmError::HttpTransport`] if the HTTP client cannot be built.
    pub fn new(timeout_secs: Option<u64>) -> Result<Self, AiLlmError> {
        let timeout = Duration::from_secs(timeout_secs.unwrap_or(5));
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, timeout })
    }

    /// Probes one profile. Failures are folded into the returned status.
    pub async fn check(&self, role: &str, cfg: &LlmModelConfig) -> HealthStatus {
        let started = Instant::now();
        let outcome = self.probe(cfg).await;
        let latency_ms = started.elapsed().as_millis();

        let (ok, message) = match outcome {
            Ok(true) => (true, "reachable; model is available".to_string()),
            Ok(false) => (false, "reachable, but model is not listed".to_string()),
            Err(e) => (false, e.to_string()),
        };

        if ok {
            info!(role, model = %cfg.model, latency_ms, "health probe completed");
        } else {
            warn!(role, model = %cfg.model, latency_ms, %message, "health probe failed");
        }

        HealthStatus {
            role: role.to_string(),
            provider: format!("{:?}", cfg.provider),
            model: cfg.model.clone(),
            ok,
            latency_ms,
            message,
        }
    }

    /// `Ok(true)` if the server answered and lists the model.
    async fn probe(&self, cfg: &LlmModelConfig) -> Result<bool, AiLlmError> {
        let base = cfg.base_url();
        let url = match cfg.provider {
            LlmProvider::Ollama => format!("{base}/api/tags"),
            LlmProvider::OpenAI => format!("{base}/v1/models"),
        };

        let mut req = self.client.get(&url).timeout(self.timeout);
        if let Some(key) = cfg.api_key.as_deref() {
            let value = header::HeaderValue::from_str(&format!("Bearer {key}"))
                .map_err(|e| HealthError::Decode(format!("invalid API key header: {e}")))?;
            req = req.header(header::AUTHORIZATION, value);
        }

        debug!(provider = ?cfg.provider, "GET {}", url);
        let resp = req.send().await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(HealthError::HttpStatus(HttpError {
                status,
                url,
                snippet: make_snippet(&text),
            })
            .into());
        }

        let listing: ModelListing = resp
            .json()
            .await
            .map_err(|e| HealthError::Decode(format!("model listing: {e}")))?;
        Ok(listing.contains(&cfg.model))
    }
}

/// Union of the Ollama `/api/tags` and OpenAI `/v1/models` shapes.
#[derive(Debug, Default, Deserialize)]
struct ModelListing {
    #[serde(default)]
    models: Vec<NamedModel>,
    #[serde(default)]
    data: Vec<NamedModel>,
}

#[derive(Debug, Deserialize)]
struct NamedModel {
    #[serde(alias = "id")]
    name: String,
}

impl ModelListing {
    /// Ollama tags carry a `:latest` suffix when the config omits one.
    fn contains(&self, model: &str) -> bool {
        self.models.iter().chain(self.data.iter()).any(|m| {
            m.name == model || m.name.strip_suffix(":latest") == Some(model)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_matches_both_shapes() {
        let ollama: ModelListing =
            serde_json::from_str(r#"{"models":[{"name":"all-minilm:latest"}]}"#).unwrap();
        assert!(ollama.contains("all-minilm"));
        assert!(!ollama.contains("nomic-embed-text"));

        let openai: ModelListing =
            serde_json::from_str(r#"{"object":"list","data":[{"id":"llama-3.1-8b-instant"}]}"#)
                .unwrap();
        assert!(openai.contains("llama-3.1-8b-instant"));
    }

    #[tokio::test]
    async fn unreachable_backend_reports_not_ok() {
        let svc = HealthService::new(Some(1)).unwrap();
        let cfg = LlmModelConfig {
            provider: LlmProvider::Ollama,
            model: "all-minilm".into(),
            endpoint: "http://127.0.0.1:9".into(),
            api_key: None,
            max_tokens: None,
            temperature: None,
            top_p: None,
            timeout_secs: None,
        };
        let status = svc.check("embedding", &cfg).await;
        assert!(!status.ok);
        assert_eq!(status.role, "embedding");
    }
}
