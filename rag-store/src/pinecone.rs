//! Pinecone adapter over the data-plane REST API.
//!
//! - `POST {host}/query`: vector query with metadata
//! - `POST {host}/describe_index_stats`: totals and namespace counts

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use futures::future::BoxFuture;
use reqwest::header;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::config::PineconeConfig;
use crate::errors::RagError;
use crate::record::{IndexStats, Match, Metadata, NamespaceStats};
use crate::store::VectorStore;

pub struct PineconeStore {
    client: reqwest::Client,
    url_query: String,
    url_stats: String,
}

impl PineconeStore {
    pub fn new(cfg: &PineconeConfig) -> Result<Self, RagError> {
        let host = cfg.host.trim().trim_end_matches('/');
        let base = if host.starts_with("http://") || host.starts_with("https://") {
            host.to_string()
        } else {
            format!("https://{host}")
        };

        let mut headers = header::HeaderMap::new();
        headers.insert(
            "api-key",
            header::HeaderValue::from_str(&cfg.api_key)
                .map_err(|e| RagError::Config(format!("invalid pinecone api key: {e}")))?,
        );
        headers.insert(
            "x-pinecone-api-version",
            header::HeaderValue::from_str(&cfg.api_version)
                .map_err(|e| RagError::Config(format!("invalid pinecone api version: {e}")))?,
        );

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            url_query: format!("{base}/query"),
            url_stats: format!("{base}/describe_index_stats"),
        })
    }

    async fn post<B: Serialize, T: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<T, RagError> {
        let started = Instant::now();
        let resp = self.client.post(url).json(body).send().await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            let snippet: String = text.trim().chars().take(240).collect();
            error!(%status, %url, %snippet, latency_ms = started.elapsed().as_millis(), "pinecone returned non-success status");
            return Err(RagError::Upstream {
                status: status.as_u16(),
                url: url.to_string(),
                snippet,
            });
        }

        let bytes = resp.bytes().await?;
        debug!(%url, latency_ms = started.elapsed().as_millis(), "pinecone call completed");
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn search(
        &self,
        vector: &[f32],
        top_k: u64,
        namespace: Option<&str>,
    ) -> Result<Vec<Match>, RagError> {
        let body = QueryRequest {
            vector,
            top_k,
            include_metadata: true,
            include_values: false,
            namespace,
        };
        let out: QueryResponse = self.post(&self.url_query, &body).await?;

        Ok(out
            .matches
            .into_iter()
            .map(|m| Match {
                id: m.id,
                score: m.score,
                namespace: namespace.map(str::to_string),
                metadata: m.metadata.unwrap_or_default(),
            })
            .collect())
    }

    async fn stats(&self) -> Result<IndexStats, RagError> {
        let out: StatsResponse = self.post(&self.url_stats, &serde_json::json!({})).await?;
        Ok(IndexStats {
            total_vector_count: out.total_vector_count,
            dimension: out.dimension,
            namespaces: out
                .namespaces
                .into_iter()
                .map(|(name, ns)| (name, NamespaceStats { vector_count: ns.vector_count }))
                .collect(),
        })
    }
}

impl VectorStore for PineconeStore {
    fn backend(&self) -> &'static str {
        "pinecone"
    }

    fn query<'a>(
        &'a self,
        vector: &'a [f32],
        top_k: u64,
        namespace: Option<&'a str>,
    ) -> BoxFuture<'a, Result<Vec<Match>, RagError>> {
        Box::pin(self.search(vector, top_k, namespace))
    }

    fn describe_stats(&self) -> BoxFuture<'_, Result<IndexStats, RagError>> {
        Box::pin(self.stats())
    }
}

/* ==========================
HTTP payloads
========================== */

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: u64,
    include_metadata: bool,
    include_values: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<PineconeMatch>,
}

#[derive(Debug, Deserialize)]
struct PineconeMatch {
    id: String,
    #[serde(default)]
    score: f32,
    #[serde(default)]
    metadata: Option<Metadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatsResponse {
    #[serde(default)]
    namespaces: BTreeMap<String, NamespaceSummary>,
    #[serde(default)]
    dimension: Option<usize>,
    #[serde(default)]
    total_vector_count: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NamespaceSummary {
    #[serde(default)]
    vector_count: u64,
}
