//! Public API types re-used by external crates (e.g., the HTTP API layer).

use std::collections::BTreeMap;

use ai_llm_service::ChatMessage;
use rag_store::CanonicalRecord;
use serde::{Deserialize, Serialize};

/// One prior conversation turn supplied by the client.
pub type ChatTurn = ChatMessage;

/// Whether retrieved material is strong enough for strictly grounded answers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextQuality {
    High,
    Limited,
}

/// A retrieved curriculum chunk as reported back to the client.
#[derive(Clone, Debug, Serialize)]
pub struct Source {
    pub id: String,
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    pub score: f32,
    /// First 200 characters, with `...` appended when longer.
    pub text: String,
    pub full_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chapter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
}

/// Context block handed to the generator plus the sources behind it.
#[derive(Clone, Debug)]
pub struct ComposedContext {
    pub text: String,
    pub sources: Vec<Source>,
    /// Score of the first match; `0.0` when nothing was retrieved.
    pub top_score: f32,
    pub quality: ContextQuality,
}

/// A normalized MCQ with its retrieval score.
///
/// # Example
/// ```
/// use contextor::QuestionHit;
/// use rag_store::CanonicalRecord;
/// let hit = QuestionHit {
///     id: "q1".into(),
///     score: 0.8,
///     namespace: Some("neet".into()),
///     record: CanonicalRecord { question: "What is ATP?".into(), ..Default::default() },
/// };
/// let json = serde_json::to_value(&hit).unwrap();
/// assert_eq!(json["question"], "What is ATP?");
/// ```
#[derive(Clone, Debug, Serialize)]
pub struct QuestionHit {
    pub id: String,
    pub score: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(flatten)]
    pub record: CanonicalRecord,
}

/// Input of the main study search.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct SearchOptions {
    pub query: String,
    /// Number of context chunks. `None` uses the configured default.
    pub n_results: Option<u64>,
    /// `None`, `""` or `"all"` searches every namespace.
    pub namespace: Option<String>,
    pub conversation_history: Vec<ChatTurn>,
    /// Defaults to `true` when absent.
    pub include_mcqs: Option<bool>,
    pub mcq_limit: Option<usize>,
}

/// Result of the main study search.
#[derive(Clone, Debug, Serialize)]
pub struct SearchAnswer {
    pub response: String,
    pub sources: Vec<Source>,
    pub mcqs: Vec<QuestionHit>,
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    pub escalated: bool,
    pub context_quality: ContextQuality,
}

/// Filtered semantic search over previous-year questions.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct PyqSearchOptions {
    pub query: String,
    #[serde(alias = "exam_name")]
    pub exam: Option<String>,
    pub subject: Option<String>,
    #[serde(deserialize_with = "string_or_number")]
    pub year: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

/// Random quiz request.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct RandomOptions {
    #[serde(alias = "exam_name")]
    pub exam: Option<String>,
    pub subject: Option<String>,
    #[serde(deserialize_with = "string_or_number")]
    pub year: Option<String>,
    pub count: Option<usize>,
}

#[derive(Clone, Debug, Serialize)]
pub struct QuestionList {
    pub questions: Vec<QuestionHit>,
    /// Number of questions returned, not the number that exist.
    pub total: usize,
}

/// Distinct filter values, derived from sampling.
#[derive(Clone, Debug, Default, Serialize)]
pub struct FilterOptions {
    pub exams: Vec<String>,
    pub subjects: Vec<String>,
    pub years: Vec<i32>,
    pub total_exams: usize,
    pub total_subjects: usize,
    /// `true` only when every namespace was sampled in full.
    pub complete: bool,
    /// Number of records the values were derived from.
    pub sampled: usize,
}

/// namespace → exam name → year → term → question count.
pub type CatalogTree = BTreeMap<String, BTreeMap<String, BTreeMap<String, BTreeMap<String, usize>>>>;

#[derive(Clone, Debug, Default, Serialize)]
pub struct Catalog {
    pub tree: CatalogTree,
    pub complete: bool,
    pub sampled: usize,
}

/// Totals for one index.
#[derive(Clone, Debug, Serialize)]
pub struct IndexSummary {
    pub backend: &'static str,
    pub total_vectors: u64,
    pub dimension: Option<usize>,
    pub namespaces: BTreeMap<String, u64>,
}

#[derive(Clone, Debug, Serialize)]
pub struct StatsReport {
    pub rag: Option<IndexSummary>,
    pub mcq: Option<IndexSummary>,
    pub distinct_exams: usize,
    pub distinct_subjects: usize,
    pub taxonomy_complete: bool,
}

/// Which pipeline components were configured at startup.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct Availability {
    pub rag_store: bool,
    pub mcq_store: bool,
    pub embedder: bool,
    pub generator: bool,
}

impl Availability {
    pub fn all(&self) -> bool {
        self.rag_store && self.mcq_store && self.embedder && self.generator
    }
}

fn string_or_number<'de, D>(de: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let v = Option::<serde_json::Value>::deserialize(de)?;
    Ok(match v {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}
