//! In-memory fakes shared by the pipeline tests.

use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use ai_llm_service::{AiLlmError, ChatMessage};
use futures::future::BoxFuture;
use rag_store::{EmbeddingsProvider, IndexStats, Match, Metadata, NamespaceStats, RagError, VectorStore};
use serde_json::{Value, json};

use crate::generate::Generator;

pub fn meta(v: Value) -> Metadata {
    v.as_object().cloned().unwrap_or_default()
}

pub fn hit(id: &str, score: f32, metadata: Value) -> Match {
    Match {
        id: id.into(),
        score,
        namespace: None,
        metadata: meta(metadata),
    }
}

pub fn chunk(id: &str, score: f32, text: &str) -> Match {
    hit(id, score, json!({ "text": text, "source": format!("{id}.pdf") }))
}

pub fn mcq(id: &str, score: f32, exam: &str, subject: &str, year: &str) -> Match {
    hit(
        id,
        score,
        json!({
            "question": format!("Question {id}?"),
            "option_a": "one", "option_b": "two", "option_c": "three", "option_d": "four",
            "correct_answer": "b",
            "exam_name": exam, "subject": subject, "year": year, "term": "Main",
        }),
    )
}

/// Namespaced in-memory index. Un-namespaced queries see every record.
#[derive(Default)]
pub struct FakeStore {
    pub data: BTreeMap<String, Vec<Match>>,
    pub failing: BTreeSet<String>,
    pub stats_fail: bool,
    /// Overrides the reported vector count per namespace.
    pub reported: BTreeMap<String, u64>,
    pub delay: Option<Duration>,
    /// Every query after this many calls fails.
    pub fail_after: Option<usize>,
    pub queries: AtomicUsize,
    pub seen_top_k: Mutex<Vec<u64>>,
}

impl FakeStore {
    pub fn with(mut self, ns: &str, matches: Vec<Match>) -> Self {
        self.data.insert(ns.into(), matches);
        self
    }

    pub fn failing(mut self, ns: &str) -> Self {
        self.failing.insert(ns.into());
        self.data.entry(ns.into()).or_default();
        self
    }

    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    fn ranked(&self, namespace: Option<&str>, top_k: u64) -> Vec<Match> {
        let mut out: Vec<Match> = match namespace {
            Some(ns) => self.data.get(ns).cloned().unwrap_or_default(),
            None => self.data.values().flatten().cloned().collect(),
        };
        out.sort_by(|a, b| b.score.total_cmp(&a.score));
        out.truncate(top_k as usize);
        out
    }
}

impl VectorStore for FakeStore {
    fn backend(&self) -> &'static str {
        "fake"
    }

    fn query<'a>(
        &'a self,
        _vector: &'a [f32],
        top_k: u64,
        namespace: Option<&'a str>,
    ) -> BoxFuture<'a, Result<Vec<Match>, RagError>> {
        Box::pin(async move {
            let n = self.queries.fetch_add(1, Ordering::SeqCst);
            if let Ok(mut seen) = self.seen_top_k.lock() {
                seen.push(top_k);
            }
            if let Some(d) = self.delay {
                tokio::time::sleep(d).await;
            }
            let exhausted = self.fail_after.is_some_and(|limit| n >= limit);
            if exhausted || namespace.is_some_and(|ns| self.failing.contains(ns)) {
                return Err(RagError::Qdrant(format!("{namespace:?} is down")));
            }
            Ok(self.ranked(namespace, top_k))
        })
    }

    fn describe_stats(&self) -> BoxFuture<'_, Result<IndexStats, RagError>> {
        Box::pin(async move {
            if self.stats_fail {
                return Err(RagError::Qdrant("stats unavailable".into()));
            }
            let namespaces: BTreeMap<String, NamespaceStats> = self
                .data
                .iter()
                .map(|(ns, rows)| {
                    let count = self.reported.get(ns).copied().unwrap_or(rows.len() as u64);
                    (ns.clone(), NamespaceStats { vector_count: count })
                })
                .collect();
            Ok(IndexStats {
                total_vector_count: namespaces.values().map(|n| n.vector_count).sum(),
                dimension: Some(3),
                namespaces,
            })
        })
    }
}

pub struct FakeEmbedder;

impl EmbeddingsProvider for FakeEmbedder {
    fn embed<'a>(
        &'a self,
        _text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<f32>, RagError>> + Send + 'a>> {
        Box::pin(async { Ok(vec![0.1, 0.2, 0.3]) })
    }
}

/// Records the last call and answers with a fixed reply, or fails.
#[derive(Default)]
pub struct FakeGenerator {
    pub fail: bool,
    pub last_system: Mutex<String>,
    pub last_messages: Mutex<Vec<ChatMessage>>,
}

impl Generator for FakeGenerator {
    fn complete<'a>(
        &'a self,
        system: &'a str,
        messages: &'a [ChatMessage],
        _max_tokens: u32,
        _temperature: f32,
    ) -> BoxFuture<'a, Result<String, AiLlmError>> {
        Box::pin(async move {
            if let Ok(mut s) = self.last_system.lock() {
                *s = system.to_string();
            }
            if let Ok(mut m) = self.last_messages.lock() {
                *m = messages.to_vec();
            }
            if self.fail {
                return Err(AiLlmError::Timeout(Duration::from_secs(1)));
            }
            Ok("Plants make food from light.".to_string())
        })
    }
}
