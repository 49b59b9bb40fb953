//! Qdrant adapter behind the [`VectorStore`] boundary.
//!
//! Qdrant has no namespaces, so a namespace is modelled as a keyword payload
//! field (`QdrantConfig::namespace_key`): queries filter on it and statistics
//! enumerate it with a facet count.

use std::collections::{BTreeMap, HashMap};

use futures::future::BoxFuture;
use qdrant_client::Qdrant;
use qdrant_client::qdrant::{
    Condition, CountPointsBuilder, FacetCountsBuilder, Filter, SearchParamsBuilder,
    SearchPointsBuilder, Value as QValue, facet_value, point_id::PointIdOptions, value::Kind,
    vectors_config,
};
use tracing::{debug, info, warn};

use crate::config::QdrantConfig;
use crate::errors::RagError;
use crate::record::{IndexStats, Match, NamespaceStats};
use crate::store::VectorStore;

/// Upper bound on distinct namespaces read from the facet.
const FACET_LIMIT: u64 = 1_000;

pub struct QdrantStore {
    client: Qdrant,
    collection: String,
    namespace_key: String,
    exact: bool,
}

impl QdrantStore {
    pub fn new(cfg: &QdrantConfig) -> Result<Self, RagError> {
        let mut builder = Qdrant::from_url(&cfg.url);
        if let Some(key) = &cfg.api_key {
            builder = builder.api_key(key.clone());
        }
        let client = builder
            .build()
            .map_err(|e| RagError::Qdrant(e.to_string()))?;

        info!(collection = %cfg.collection, namespace_key = %cfg.namespace_key, "QdrantStore initialized");

        Ok(Self {
            client,
            collection: cfg.collection.clone(),
            namespace_key: cfg.namespace_key.clone(),
            exact: cfg.exact_search,
        })
    }

    async fn search(
        &self,
        vector: &[f32],
        top_k: u64,
        namespace: Option<&str>,
    ) -> Result<Vec<Match>, RagError> {
        let mut builder = SearchPointsBuilder::new(&self.collection, vector.to_vec(), top_k)
            .with_payload(true);
        if let Some(ns) = namespace {
            builder = builder.filter(Filter::must([Condition::matches(
                self.namespace_key.clone(),
                ns.to_string(),
            )]));
        }
        if self.exact {
            builder = builder.params(SearchParamsBuilder::default().exact(true));
        }

        let res = self
            .client
            .search_points(builder)
            .await
            .map_err(|e| RagError::Qdrant(e.to_string()))?;

        let out: Vec<Match> = res
            .result
            .into_iter()
            .map(|p| Match {
                id: p
                    .id
                    .and_then(|id| id.point_id_options)
                    .map(|opt| match opt {
                        PointIdOptions::Num(n) => n.to_string(),
                        PointIdOptions::Uuid(u) => u,
                    })
                    .unwrap_or_default(),
                score: p.score,
                namespace: namespace.map(str::to_string),
                metadata: payload_to_metadata(p.payload),
            })
            .collect();

        debug!(collection = %self.collection, namespace = ?namespace, hits = out.len(), "qdrant search completed");
        Ok(out)
    }

    async fn stats(&self) -> Result<IndexStats, RagError> {
        let total = self
            .client
            .count(CountPointsBuilder::new(&self.collection).exact(true))
            .await
            .map_err(|e| RagError::Qdrant(e.to_string()))?
            .result
            .map(|r| r.count)
            .unwrap_or(0);

        let dimension = match self.client.collection_info(&self.collection).await {
            Ok(info) => info
                .result
                .and_then(|c| c.config)
                .and_then(|c| c.params)
                .and_then(|p| p.vectors_config)
                .and_then(|v| v.config)
                .and_then(|c| match c {
                    vectors_config::Config::Params(p) => Some(p.size as usize),
                    vectors_config::Config::ParamsMap(_) => None,
                }),
            Err(e) => {
                warn!(collection = %self.collection, error = %e, "collection_info failed");
                None
            }
        };

        // A missing payload index on the namespace key is not fatal: the
        // collection is then reported as un-namespaced.
        let mut namespaces = BTreeMap::new();
        match self
            .client
            .facet(
                FacetCountsBuilder::new(&self.collection, self.namespace_key.clone())
                    .limit(FACET_LIMIT)
                    .exact(true),
            )
            .await
        {
            Ok(resp) => {
                for hit in resp.hits {
                    let name = match hit.value.and_then(|v| v.variant) {
                        Some(facet_value::Variant::StringValue(s)) => s,
                        Some(facet_value::Variant::IntegerValue(i)) => i.to_string(),
                        Some(facet_value::Variant::BoolValue(b)) => b.to_string(),
                        None => continue,
                    };
                    namespaces.insert(name, NamespaceStats { vector_count: hit.count });
                }
            }
            Err(e) => {
                warn!(
                    collection = %self.collection,
                    key = %self.namespace_key,
                    error = %e,
                    "namespace facet failed; treating collection as un-namespaced"
                );
            }
        }

        Ok(IndexStats {
            total_vector_count: total,
            dimension,
            namespaces,
        })
    }
}

impl VectorStore for QdrantStore {
    fn backend(&self) -> &'static str {
        "qdrant"
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

/// Converts a Qdrant payload into JSON metadata, nested structures included.
fn payload_to_metadata(payload: HashMap<String, QValue>) -> serde_json::Map<String, serde_json::Value> {
    payload
        .into_iter()
        .map(|(k, v)| (k, qvalue_to_json(v)))
        .collect()
}

fn qvalue_to_json(v: QValue) -> serde_json::Value {
    use serde_json::Value as J;
    match v.kind {
        Some(Kind::StringValue(s)) => J::String(s),
        Some(Kind::IntegerValue(i)) => J::Number(i.into()),
        Some(Kind::DoubleValue(f)) => serde_json::Number::from_f64(f).map(J::Number).unwrap_or(J::Null),
        Some(Kind::BoolValue(b)) => J::Bool(b),
        Some(Kind::StructValue(s)) => J::Object(payload_to_metadata(s.fields)),
        Some(Kind::ListValue(l)) => J::Array(l.values.into_iter().map(qvalue_to_json).collect()),
        Some(Kind::NullValue(_)) | None => J::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_payload_converts() {
        let mut inner = HashMap::new();
        inner.insert("a".to_string(), QValue::from("Lok Sabha"));
        let mut payload = HashMap::new();
        payload.insert("year".to_string(), QValue::from(2019_i64));
        payload.insert("score".to_string(), QValue::from(0.5_f64));
        payload.insert(
            "options".to_string(),
            QValue {
                kind: Some(Kind::StructValue(qdrant_client::qdrant::Struct { fields: inner })),
            },
        );

        let md = payload_to_metadata(payload);
        assert_eq!(md["year"], serde_json::json!(2019));
        assert_eq!(md["score"], serde_json::json!(0.5));
        assert_eq!(md["options"]["a"], "Lok Sabha");
    }

    #[test]
    fn store_builds_without_connecting() {
        let store = QdrantStore::new(&QdrantConfig {
            url: "http://localhost:6334".into(),
            api_key: None,
            collection: "ncert".into(),
            namespace_key: "namespace".into(),
            exact_search: false,
        })
        .unwrap();
        assert_eq!(store.backend(), "qdrant");
    }
}
