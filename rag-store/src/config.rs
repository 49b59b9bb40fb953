//! Vector-store configuration loaded from environment variables.
//!
//! Two independent indexes are configured: the document-chunk index (`rag`)
//! and the question index (`mcq`). An index whose settings are missing is
//! reported as `None`, so the process can start in a degraded mode.
//!
//! # Environment variables
//! - `VECTOR_BACKEND` = `pinecone` (default) | `qdrant`
//! - Pinecone: `PINECONE_API_KEY`, `PINECONE_RAG_HOST`, `PINECONE_MCQ_HOST`,
//!   `PINECONE_API_VERSION` (default `2024-07`)
//! - Qdrant: `QDRANT_URL` (default `http://localhost:6334`), `QDRANT_API_KEY`,
//!   `QDRANT_RAG_COLLECTION` (default `ncert`), `QDRANT_MCQ_COLLECTION`
//!   (default `pyq-1`), `QDRANT_NAMESPACE_KEY` (default `namespace`)

use std::str::FromStr;
use std::sync::Arc;

use tracing::{info, warn};

use crate::errors::RagError;
use crate::pinecone::PineconeStore;
use crate::qdrant_facade::QdrantStore;
use crate::store::VectorStore;

/// Which vector database backs both indexes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VectorBackend {
    Pinecone,
    Qdrant,
}

impl FromStr for VectorBackend {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pinecone" => Ok(Self::Pinecone),
            "qdrant" => Ok(Self::Qdrant),
            other => Err(RagError::Config(format!("unsupported VECTOR_BACKEND: {other}"))),
        }
    }
}

/// Qdrant collection settings. Namespaces live in a keyword payload field.
#[derive(Clone, Debug)]
pub struct QdrantConfig {
    pub url: String,
    pub api_key: Option<String>,
    pub collection: String,
    pub namespace_key: String,
    /// Exact search flag (false = HNSW ANN).
    pub exact_search: bool,
}

/// Pinecone index settings (data-plane host of one index).
#[derive(Clone, Debug)]
pub struct PineconeConfig {
    pub host: String,
    pub api_key: String,
    pub api_version: String,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub enum IndexConfig {
    Qdrant(QdrantConfig),
    Pinecone(PineconeConfig),
}

impl IndexConfig {
    pub fn validate(&self) -> Result<(), RagError> {
        match self {
            IndexConfig::Qdrant(c) => {
                if c.url.trim().is_empty() {
                    return Err(RagError::Config("qdrant url is empty".into()));
                }
                if c.collection.trim().is_empty() {
                    return Err(RagError::Config("collection is empty".into()));
                }
                if c.namespace_key.trim().is_empty() {
                    return Err(RagError::Config("namespace key is empty".into()));
                }
            }
            IndexConfig::Pinecone(c) => {
                if c.host.trim().is_empty() {
                    return Err(RagError::Config("pinecone host is empty".into()));
                }
                if c.api_key.trim().is_empty() {
                    return Err(RagError::Config("pinecone api key is empty".into()));
                }
            }
        }
        Ok(())
    }

    /// Builds the adapter for this index.
    pub fn connect(&self) -> Result<Arc<dyn VectorStore>, RagError> {
        self.validate()?;
        Ok(match self {
            IndexConfig::Qdrant(c) => Arc::new(QdrantStore::new(c)?),
            IndexConfig::Pinecone(c) => Arc::new(PineconeStore::new(c)?),
        })
    }
}

/// Both indexes; `None` means "not configured".
#[derive(Clone, Debug)]
pub struct StoreConfig {
    pub backend: VectorBackend,
    pub rag: Option<IndexConfig>,
    pub mcq: Option<IndexConfig>,
}

fn env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_or(name: &str, default: &str) -> String {
    env(name).unwrap_or_else(|| default.to_string())
}

impl StoreConfig {
    /// Reads the configuration for both indexes.
    ///
    /// # Errors
    /// Only an unknown `VECTOR_BACKEND` is an error; missing credentials leave
    /// the corresponding index unconfigured.
    pub fn from_env() -> Result<Self, RagError> {
        let backend = match env("VECTOR_BACKEND") {
            Some(raw) => raw.parse()?,
            None => VectorBackend::Pinecone,
        };

        let (rag, mcq) = match backend {
            VectorBackend::Qdrant => {
                let base = QdrantConfig {
                    url: env_or("QDRANT_URL", "http://localhost:6334"),
                    api_key: env("QDRANT_API_KEY"),
                    collection: String::new(),
                    namespace_key: env_or("QDRANT_NAMESPACE_KEY", "namespace"),
                    exact_search: false,
                };
                let rag = QdrantConfig {
                    collection: env_or("QDRANT_RAG_COLLECTION", "ncert"),
                    ..base.clone()
                };
                let mcq = QdrantConfig {
                    collection: env_or("QDRANT_MCQ_COLLECTION", "pyq-1"),
                    ..base
                };
                (Some(IndexConfig::Qdrant(rag)), Some(IndexConfig::Qdrant(mcq)))
            }
            VectorBackend::Pinecone => match env("PINECONE_API_KEY") {
                None => {
                    warn!("PINECONE_API_KEY is not set; vector indexes are unavailable");
                    (None, None)
                }
                Some(api_key) => {
                    let api_version = env_or("PINECONE_API_VERSION", "2024-07");
                    let index = |host_var: &str| {
                        let host = env(host_var);
                        if host.is_none() {
                            warn!(var = host_var, "pinecone host is not set; index unavailable");
                        }
                        host.map(|host| {
                            IndexConfig::Pinecone(PineconeConfig {
                                host,
                                api_key: api_key.clone(),
                                api_version: api_version.clone(),
                                timeout_secs: 10,
                            })
                        })
                    };
                    (index("PINECONE_RAG_HOST"), index("PINECONE_MCQ_HOST"))
                }
            },
        };

        info!(
            ?backend,
            rag = rag.is_some(),
            mcq = mcq.is_some(),
            "vector store config loaded"
        );
        Ok(Self { backend, rag, mcq })
    }
}
