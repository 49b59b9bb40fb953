//! Core data models shared by the adapters and the pipeline.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::errors::RagError;

/// Raw metadata attached to a vector (string keys → arbitrary JSON).
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// One ranked candidate returned by a vector query.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub id: String,
    pub score: f32,
    /// Assigned by the caller that fanned the query out; adapters leave it as
    /// the namespace they were asked to search.
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub metadata: Metadata,
}

/// Per-namespace statistics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceStats {
    pub vector_count: u64,
}

/// Index-wide statistics as reported by the store itself.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexStats {
    pub total_vector_count: u64,
    pub dimension: Option<usize>,
    pub namespaces: BTreeMap<String, NamespaceStats>,
}

impl IndexStats {
    /// Namespace names in stable (lexicographic) order.
    pub fn namespace_names(&self) -> Vec<String> {
        self.namespaces.keys().cloned().collect()
    }
}

/// Outcome of one namespace query inside a fan-out.
#[derive(Debug)]
pub struct NamespaceResult {
    pub namespace: String,
    pub result: Result<Vec<Match>, RagError>,
}
