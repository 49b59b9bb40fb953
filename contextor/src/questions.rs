//! MCQ retrieval: related questions, filtered PYQ search and random quizzes.

use std::collections::HashSet;

use rag_store::normalize::normalize_match;
use rag_store::{EmbeddingsProvider, Match, OptionIndexPolicy, QuestionFilter, VectorStore};
use rand::Rng;
use tracing::{debug, warn};

use crate::aggregate::{fan_out, resolve_namespaces};
use crate::api_types::QuestionHit;
use crate::error::ContextorError;

/// Upper bound of the random number in a quiz probe text.
const PROBE_SPACE: u32 = 10_000;
/// Probe queries issued per requested question.
const PROBES_PER_QUESTION: usize = 3;

pub fn to_hit(m: &Match, policy: OptionIndexPolicy) -> QuestionHit {
    QuestionHit {
        id: m.id.clone(),
        score: m.score,
        namespace: m.namespace.clone(),
        record: normalize_match(m, policy),
    }
}

/// MCQs related to an already embedded query, weakest matches dropped.
pub async fn related_mcqs(
    store: &dyn VectorStore,
    vector: &[f32],
    limit: usize,
    threshold: f32,
    policy: OptionIndexPolicy,
) -> Result<Vec<QuestionHit>, ContextorError> {
    if limit == 0 {
        return Ok(Vec::new());
    }
    let namespaces = resolve_namespaces(store).await;
    let matches = fan_out(store, &namespaces, vector, limit as u64).await?;

    let hits: Vec<QuestionHit> = matches
        .iter()
        .filter(|m| m.score >= threshold)
        .take(limit)
        .map(|m| to_hit(m, policy))
        .collect();
    debug!(candidates = matches.len(), kept = hits.len(), threshold, "related MCQs selected");
    Ok(hits)
}

/// Semantic search with exam/subject/year filters and offset pagination.
///
/// Over-fetches `(offset + limit) * 2` candidates so filtering has room to work.
pub async fn search_pyq(
    store: &dyn VectorStore,
    vector: &[f32],
    filter: &QuestionFilter,
    limit: usize,
    offset: usize,
    policy: OptionIndexPolicy,
) -> Result<Vec<QuestionHit>, ContextorError> {
    if limit == 0 {
        return Ok(Vec::new());
    }
    let top_k = (offset.saturating_add(limit)).saturating_mul(2) as u64;
    let namespaces = resolve_namespaces(store).await;
    let matches = fan_out(store, &namespaces, vector, top_k).await?;

    let hits: Vec<QuestionHit> = matches
        .iter()
        .map(|m| to_hit(m, policy))
        .filter(|h| filter.matches(&h.record))
        .skip(offset)
        .take(limit)
        .collect();
    debug!(candidates = matches.len(), kept = hits.len(), filtered = !filter.is_empty(), offset, "PYQ search");
    Ok(hits)
}

/// Quiz knobs.
#[derive(Clone, Copy, Debug)]
pub struct RandomDraw {
    pub count: usize,
    pub probe_top_k: u64,
    pub policy: OptionIndexPolicy,
}

/// Random questions gathered by probing with random texts.
///
/// Issues up to `count * 3` probes, each against a randomly chosen
/// namespace, keeps unseen ids that pass the filter and stops once `count`
/// questions are collected. A failed probe is skipped.
pub async fn random_pyq(
    store: &dyn VectorStore,
    embedder: &dyn EmbeddingsProvider,
    filter: &QuestionFilter,
    draw: RandomDraw,
) -> Result<Vec<QuestionHit>, ContextorError> {
    if draw.count == 0 {
        return Ok(Vec::new());
    }
    let namespaces = resolve_namespaces(store).await;
    let probes = plan_probes(draw.count * PROBES_PER_QUESTION, namespaces.len());

    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(draw.count);
    let mut failures = 0usize;

    for (text, ns_idx) in &probes {
        if out.len() >= draw.count {
            break;
        }
        let namespace = ns_idx.and_then(|i| namespaces.get(i)).map(String::as_str);
        let matches = match probe(store, embedder, text, namespace, draw.probe_top_k).await {
            Ok(m) => m,
            Err(e) => {
                failures += 1;
                warn!(probe = %text, namespace = ?namespace, error = %e, "quiz probe failed");
                continue;
            }
        };

        for mut m in matches {
            if out.len() >= draw.count {
                break;
            }
            if !seen.insert(m.id.clone()) {
                continue;
            }
            if m.namespace.is_none() {
                m.namespace = namespace.map(str::to_string);
            }
            let hit = to_hit(&m, draw.policy);
            if filter.matches(&hit.record) {
                out.push(hit);
            }
        }
    }

    if out.is_empty() && failures == probes.len() {
        return Err(ContextorError::AllNamespacesFailed {
            attempted: failures,
            last: "every quiz probe failed".to_string(),
        });
    }
    debug!(
        wanted = draw.count,
        got = out.len(),
        probes = probes.len(),
        failures,
        filtered = !filter.is_empty(),
        "random quiz drawn"
    );
    Ok(out)
}

async fn probe(
    store: &dyn VectorStore,
    embedder: &dyn EmbeddingsProvider,
    text: &str,
    namespace: Option<&str>,
    top_k: u64,
) -> Result<Vec<Match>, ContextorError> {
    let vector = embedder.embed(text).await?;
    Ok(store.query(&vector, top_k, namespace).await?)
}

/// Probe texts and namespace picks, generated up front.
fn plan_probes(n: usize, namespaces: usize) -> Vec<(String, Option<usize>)> {
    let mut rng = rand::rng();
    (0..n)
        .map(|_| {
            let text = format!("question {}", rng.random_range(1..=PROBE_SPACE));
            let ns = (namespaces > 0).then(|| rng.random_range(0..namespaces));
            (text, ns)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::{FakeEmbedder, FakeStore, mcq};

    fn store() -> FakeStore {
        FakeStore::default()
            .with(
                "medical",
                vec![
                    mcq("m1", 0.9, "NEET", "Biology", "2021"),
                    mcq("m2", 0.1, "NEET", "Physics", "2019"),
                    mcq("m3", 0.6, "AIIMS", "Biology", "2021"),
                ],
            )
            .with("engineering", vec![mcq("e1", 0.7, "JEE Main", "Physics", "2023")])
    }

    fn filter(exam: Option<&str>, subject: Option<&str>, year: Option<&str>) -> QuestionFilter {
        QuestionFilter::new(
            exam.map(str::to_string),
            subject.map(str::to_string),
            year.map(str::to_string),
        )
    }

    #[tokio::test]
    async fn related_mcqs_drop_low_scores() {
        let hits = related_mcqs(&store(), &[0.0], 10, 0.25, OptionIndexPolicy::Emitted).await.unwrap();
        let ids: Vec<_> = hits.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, ["m1", "e1", "m3"]);
        assert_eq!(hits[0].record.correct_answer_index, Some(1));
        assert_eq!(hits[1].namespace.as_deref(), Some("engineering"));
    }

    #[tokio::test]
    async fn related_mcqs_cap_at_limit() {
        let hits = related_mcqs(&store(), &[0.0], 1, 0.25, OptionIndexPolicy::Emitted).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "m1");
    }

    #[tokio::test]
    async fn pyq_search_filters_and_paginates() {
        let s = store();
        let biology = filter(None, Some("biology"), None);
        let page = search_pyq(&s, &[0.0], &biology, 10, 0, OptionIndexPolicy::Emitted).await.unwrap();
        assert_eq!(page.iter().map(|h| h.id.as_str()).collect::<Vec<_>>(), ["m1", "m3"]);

        let second = search_pyq(&s, &[0.0], &biology, 1, 1, OptionIndexPolicy::Emitted).await.unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].id, "m3");
        assert!(s.seen_top_k.lock().unwrap().contains(&4));

        let by_year = search_pyq(&s, &[0.0], &filter(Some("NEET"), None, Some("2019")), 5, 0, OptionIndexPolicy::Emitted)
            .await
            .unwrap();
        assert_eq!(by_year.len(), 1);
        assert_eq!(by_year[0].id, "m2");
    }

    #[tokio::test]
    async fn random_quiz_dedupes_and_respects_filters() {
        let s = store();
        let draw = RandomDraw {
            count: 10,
            probe_top_k: 5,
            policy: OptionIndexPolicy::Emitted,
        };
        let hits = random_pyq(&s, &FakeEmbedder, &filter(None, Some("Biology"), None), draw).await.unwrap();

        let ids: HashSet<_> = hits.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids.len(), hits.len());
        assert!(hits.iter().all(|h| h.record.subject == "Biology"));
        assert!(hits.len() <= 2);
        assert!(s.query_count() <= 30);
    }

    #[tokio::test]
    async fn random_quiz_stops_when_full() {
        let s = store();
        let draw = RandomDraw {
            count: 1,
            probe_top_k: 5,
            policy: OptionIndexPolicy::Emitted,
        };
        let hits = random_pyq(&s, &FakeEmbedder, &QuestionFilter::default(), draw).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(s.query_count(), 1);
    }

    #[tokio::test]
    async fn random_quiz_errors_when_every_probe_fails() {
        let s = FakeStore::default().failing("a");
        let draw = RandomDraw {
            count: 2,
            probe_top_k: 5,
            policy: OptionIndexPolicy::Emitted,
        };
        let err = random_pyq(&s, &FakeEmbedder, &QuestionFilter::default(), draw).await.unwrap_err();
        assert!(matches!(err, ContextorError::AllNamespacesFailed { attempted: 6, .. }));
    }

    #[test]
    fn probes_are_planned_within_range() {
        let probes = plan_probes(30, 3);
        assert_eq!(probes.len(), 30);
        for (text, ns) in &probes {
            let n: u32 = text.trim_start_matches("question ").parse().unwrap();
            assert!((1..=PROBE_SPACE).contains(&n));
            assert!(ns.is_some_and(|i| i < 3));
        }
        assert!(plan_probes(2, 0).iter().all(|(_, ns)| ns.is_none()));
    }
}
