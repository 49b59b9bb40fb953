//! The vector-store boundary.
//!
//! Adapters implement [`VectorStore::query`] and [`VectorStore::describe_stats`];
//! multi-namespace fan-out comes for free through [`VectorStore::query_many`],
//! which an adapter may override when its backend has a native batch call.

use futures::future::{BoxFuture, join_all};
use tracing::{debug, warn};

use crate::errors::RagError;
use crate::record::{IndexStats, Match, NamespaceResult};

pub trait VectorStore: Send + Sync {
    /// Short backend name for logs and health output.
    fn backend(&self) -> &'static str;

    /// Ranked top-`top_k` matches (score descending), optionally restricted to
    /// one namespace. Metadata is always included.
    fn query<'a>(
        &'a self,
        vector: &'a [f32],
        top_k: u64,
        namespace: Option<&'a str>,
    ) -> BoxFuture<'a, Result<Vec<Match>, RagError>>;

    /// Totals and per-namespace counts.
    fn describe_stats(&self) -> BoxFuture<'_, Result<IndexStats, RagError>>;

    /// Queries every namespace concurrently. Results come back in the order of
    /// `namespaces`, each match tagged with the namespace it came from.
    /// Individual failures are reported per entry, never short-circuited.
    fn query_many<'a>(
        &'a self,
        namespaces: &'a [String],
        vector: &'a [f32],
        top_k: u64,
    ) -> BoxFuture<'a, Vec<NamespaceResult>> {
        Box::pin(async move {
            debug!(backend = self.backend(), namespaces = namespaces.len(), top_k, "fan-out query");

            let calls = namespaces.iter().map(|ns| async move {
                let result = self.query(vector, top_k, Some(ns.as_str())).await.map(|mut matches| {
                    for m in &mut matches {
                        m.namespace = Some(ns.clone());
                    }
                    matches
                });
                if let Err(e) = &result {
                    warn!(backend = self.backend(), namespace = %ns, error = %e, "namespace query failed");
                }
                NamespaceResult {
                    namespace: ns.clone(),
                    result,
                }
            });

            join_all(calls).await
        })
    }
}
