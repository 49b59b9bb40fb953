//! Namespace fan-out, ranked merge and single-namespace escalation.

use rag_store::{Match, NamespaceResult, VectorStore};
use tracing::{debug, info, warn};

use crate::api_types::{ComposedContext, ContextQuality};
use crate::compose::{QualityBar, compose};
use crate::error::ContextorError;

/// Where a query should look.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Target {
    Single(String),
    All,
}

impl Target {
    /// `None`, blank and `"all"` mean every namespace.
    pub fn parse(namespace: Option<&str>) -> Self {
        match namespace.map(str::trim) {
            None | Some("") => Target::All,
            Some(ns) if ns.eq_ignore_ascii_case("all") => Target::All,
            Some(ns) => Target::Single(ns.to_string()),
        }
    }

    pub fn as_namespace(&self) -> Option<&str> {
        match self {
            Target::Single(ns) => Some(ns),
            Target::All => None,
        }
    }
}

/// Namespace names from index statistics.
///
/// An empty list means the index is not namespaced. A stats failure is
/// treated the same way so that retrieval still has a chance.
pub async fn resolve_namespaces(store: &dyn VectorStore) -> Vec<String> {
    match store.describe_stats().await {
        Ok(stats) => stats.namespace_names(),
        Err(e) => {
            warn!(backend = store.backend(), error = %e, "stats unavailable, querying without namespace");
            Vec::new()
        }
    }
}

/// Queries `namespaces` concurrently and merges into one ranked list.
/// An empty list issues a single un-namespaced query.
pub async fn fan_out(
    store: &dyn VectorStore,
    namespaces: &[String],
    vector: &[f32],
    top_k: u64,
) -> Result<Vec<Match>, ContextorError> {
    if namespaces.is_empty() {
        return Ok(store.query(vector, top_k, None).await?);
    }
    let results = store.query_many(namespaces, vector, top_k).await;
    merge_ranked(results, top_k as usize)
}

/// Concatenates successful namespace results (in input order), stable-sorts by
/// score descending and truncates. Errors only when every namespace failed.
pub fn merge_ranked(results: Vec<NamespaceResult>, top_k: usize) -> Result<Vec<Match>, ContextorError> {
    let attempted = results.len();
    let mut succeeded = 0usize;
    let mut last_error = None;
    let mut merged = Vec::new();

    for r in results {
        match r.result {
            Ok(matches) => {
                succeeded += 1;
                merged.extend(matches);
            }
            Err(e) => last_error = Some(format!("{}: {e}", r.namespace)),
        }
    }

    if succeeded == 0 {
        if let Some(last) = last_error {
            return Err(ContextorError::AllNamespacesFailed { attempted, last });
        }
    }

    merged.sort_by(|a, b| b.score.total_cmp(&a.score));
    merged.truncate(top_k);
    Ok(merged)
}

/// Runs one query against the resolved target.
pub async fn retrieve(
    store: &dyn VectorStore,
    target: &Target,
    vector: &[f32],
    top_k: u64,
) -> Result<Vec<Match>, ContextorError> {
    match target {
        Target::Single(ns) => {
            let mut matches = store.query(vector, top_k, Some(ns)).await?;
            for m in &mut matches {
                m.namespace = Some(ns.clone());
            }
            Ok(matches)
        }
        Target::All => {
            let namespaces = resolve_namespaces(store).await;
            fan_out(store, &namespaces, vector, top_k).await
        }
    }
}

/// Composed context plus whether it came from a broadened search.
#[derive(Clone, Debug)]
pub struct Retrieval {
    pub context: ComposedContext,
    pub escalated: bool,
}

/// Escalation knobs.
#[derive(Clone, Copy, Debug)]
pub struct Escalation {
    pub bar: QualityBar,
    pub multiplier: u64,
}

/// Retrieves and composes context; a `Limited` result from a single namespace
/// is retried across all namespaces with a larger `top_k`. The broadened
/// context replaces the original only if its text is strictly longer.
pub async fn retrieve_with_escalation(
    store: &dyn VectorStore,
    target: &Target,
    vector: &[f32],
    top_k: u64,
    esc: Escalation,
) -> Result<Retrieval, ContextorError> {
    let matches = retrieve(store, target, vector, top_k).await?;
    let context = compose(&matches, esc.bar);
    debug!(matches = matches.len(), quality = ?context.quality, top_score = context.top_score, "context composed");

    let Target::Single(ns) = target else {
        return Ok(Retrieval { context, escalated: false });
    };
    if context.quality != ContextQuality::Limited {
        return Ok(Retrieval { context, escalated: false });
    }

    let broadened_k = top_k.saturating_mul(esc.multiplier.max(1));
    info!(namespace = %ns, top_k = broadened_k, "limited context, broadening to all namespaces");

    let broadened = match retrieve(store, &Target::All, vector, broadened_k).await {
        Ok(m) => compose(&m, esc.bar),
        Err(e) => {
            warn!(namespace = %ns, error = %e, "escalation failed, keeping original context");
            return Ok(Retrieval { context, escalated: false });
        }
    };

    if broadened.text.chars().count() > context.text.chars().count() {
        Ok(Retrieval {
            context: broadened,
            escalated: true,
        })
    } else {
        debug!(namespace = %ns, "broadened context not longer, keeping original");
        Ok(Retrieval { context, escalated: false })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::{FakeStore, chunk};
    use rag_store::RagError;

    const ESC: Escalation = Escalation {
        bar: QualityBar {
            min_chars: 100,
            relevance_floor: 0.3,
        },
        multiplier: 2,
    };

    fn ok(ns: &str, ids: &[(&str, f32)]) -> NamespaceResult {
        NamespaceResult {
            namespace: ns.into(),
            result: Ok(ids.iter().map(|(id, s)| chunk(id, *s, id)).collect()),
        }
    }

    fn failed(ns: &str) -> NamespaceResult {
        NamespaceResult {
            namespace: ns.into(),
            result: Err(RagError::Qdrant("down".into())),
        }
    }

    #[test]
    fn target_parsing() {
        assert_eq!(Target::parse(None), Target::All);
        assert_eq!(Target::parse(Some(" ")), Target::All);
        assert_eq!(Target::parse(Some("ALL")), Target::All);
        assert_eq!(Target::parse(Some("physics")), Target::Single("physics".into()));
    }

    #[test]
    fn merge_is_score_descending_and_stable_on_ties() {
        let merged = merge_ranked(
            vec![ok("a", &[("a1", 0.5), ("a2", 0.9)]), ok("b", &[("b1", 0.5), ("b2", 0.7)])],
            10,
        )
        .unwrap();
        let ids: Vec<_> = merged.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, ["a2", "b2", "a1", "b1"]);
    }

    #[test]
    fn merge_truncates_to_top_k() {
        let merged = merge_ranked(vec![ok("a", &[("a1", 0.1), ("a2", 0.2), ("a3", 0.3)])], 2).unwrap();
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].id, "a3");
    }

    #[test]
    fn failed_namespaces_are_dropped() {
        let merged = merge_ranked(vec![failed("a"), ok("b", &[("b1", 0.4)])], 5).unwrap();
        assert_eq!(merged.len(), 1);
    }

    #[test]
    fn all_failed_is_an_error() {
        let err = merge_ranked(vec![failed("a"), failed("b")], 5).unwrap_err();
        match err {
            ContextorError::AllNamespacesFailed { attempted, last } => {
                assert_eq!(attempted, 2);
                assert!(last.starts_with("b:"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn successful_but_empty_namespaces_are_not_failures() {
        let merged = merge_ranked(vec![ok("a", &[]), failed("b")], 5).unwrap();
        assert!(merged.is_empty());
    }

    #[tokio::test]
    async fn all_target_without_namespaces_queries_once_unnamespaced() {
        let store = FakeStore::default().with("", vec![chunk("x", 0.5, "body")]);
        let store = FakeStore {
            stats_fail: true,
            ..store
        };
        let out = retrieve(&store, &Target::All, &[0.0], 5).await.unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(store.query_count(), 1);
    }

    #[tokio::test]
    async fn fan_out_tags_namespaces() {
        let store = FakeStore::default()
            .with("physics", vec![chunk("p", 0.6, "p")])
            .with("chemistry", vec![chunk("c", 0.8, "c")]);
        let out = retrieve(&store, &Target::All, &[0.0], 5).await.unwrap();
        assert_eq!(out[0].namespace.as_deref(), Some("chemistry"));
        assert_eq!(out[1].namespace.as_deref(), Some("physics"));
    }

    #[tokio::test]
    async fn limited_single_namespace_escalates_when_broader_text_is_longer() {
        let store = FakeStore::default()
            .with("physics", vec![chunk("p", 0.9, &"p".repeat(50))])
            .with("chemistry", vec![chunk("c", 0.8, &"c".repeat(200))]);

        let r = retrieve_with_escalation(&store, &Target::Single("physics".into()), &[0.0], 3, ESC)
            .await
            .unwrap();
        assert!(r.escalated);
        assert_eq!(r.context.sources.len(), 2);
        assert!(store.seen_top_k.lock().unwrap().contains(&6));
    }

    #[tokio::test]
    async fn escalation_keeps_original_when_not_longer() {
        // Broadened search returns the same single chunk.
        let store = FakeStore::default().with("physics", vec![chunk("p", 0.9, &"p".repeat(40))]);
        let r = retrieve_with_escalation(&store, &Target::Single("physics".into()), &[0.0], 3, ESC)
            .await
            .unwrap();
        assert!(!r.escalated);
        assert_eq!(r.context.sources[0].id, "p");
        assert_eq!(r.context.quality, ContextQuality::Limited);
    }

    #[tokio::test]
    async fn escalation_failure_keeps_original() {
        let store = FakeStore {
            fail_after: Some(1),
            ..FakeStore::default()
                .with("physics", vec![chunk("p", 0.9, "short")])
                .with("chemistry", vec![chunk("c", 0.8, &"c".repeat(300))])
        };
        let r = retrieve_with_escalation(&store, &Target::Single("physics".into()), &[0.0], 3, ESC)
            .await
            .unwrap();
        assert!(!r.escalated);
        assert_eq!(r.context.sources.len(), 1);
        assert_eq!(r.context.sources[0].id, "p");
    }

    #[tokio::test]
    async fn single_namespace_failure_is_an_error() {
        let store = FakeStore::default().failing("physics");
        let err = retrieve(&store, &Target::Single("physics".into()), &[0.0], 3).await.unwrap_err();
        assert!(matches!(err, ContextorError::Rag(_)));
    }

    #[tokio::test]
    async fn high_quality_or_all_target_never_escalates() {
        let long = "x".repeat(150);
        let store = FakeStore::default()
            .with("physics", vec![chunk("p", 0.9, &long)])
            .with("chemistry", vec![chunk("c", 0.8, &long)]);
        let r = retrieve_with_escalation(&store, &Target::Single("physics".into()), &[0.0], 3, ESC)
            .await
            .unwrap();
        assert!(!r.escalated);
        assert_eq!(store.query_count(), 1);

        let weak = FakeStore::default().with("physics", vec![chunk("p", 0.1, "tiny")]);
        let r = retrieve_with_escalation(&weak, &Target::All, &[0.0], 3, ESC).await.unwrap();
        assert!(!r.escalated);
        assert_eq!(weak.query_count(), 1);
    }
}
