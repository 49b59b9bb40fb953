//! Retrieval and context composition for NCERT study answers and PYQ practice.
//!
//! Public API: [`StudyPipeline`]. It embeds the question, retrieves context from
//! the curriculum index (one namespace or all of them, broadening when the
//! material is thin), composes a labelled context block, frames the prompt by
//! context quality and asks the chat model. Alongside it serves MCQ retrieval,
//! filtered and random PYQ queries, and filter/catalog/statistics views of the
//! MCQ index.
//!
//! Every component is optional: a pipeline without a generator still serves
//! PYQ routes, and a missing component fails only the operations that need it.
//! Each public operation runs under one wall-clock deadline.

pub mod aggregate;
mod api_types;
mod cfg;
pub mod compose;
mod error;
pub mod generate;
pub mod prompt;
pub mod questions;
pub mod taxonomy;

#[cfg(test)]
mod testkit;

use std::future::Future;
use std::sync::Arc;

use ai_llm_service::LlmServiceProfiles;
use rag_store::{EmbeddingsProvider, IndexConfig, LlmEmbedder, QuestionFilter, StoreConfig, VectorStore};
use tracing::{error, info, warn};

pub use api_types::{
    Availability, Catalog, CatalogTree, ChatTurn, ComposedContext, ContextQuality, FilterOptions,
    IndexSummary, PyqSearchOptions, QuestionHit, QuestionList, RandomOptions, SearchAnswer,
    SearchOptions, Source, StatsReport,
};
pub use cfg::ContextorConfig;
pub use error::ContextorError;
pub use generate::{Generator, LlmGenerator};

use aggregate::{Escalation, Target};
use compose::QualityBar;
use generate::AnswerParams;
use questions::RandomDraw;
use taxonomy::Taxonomy;

const DEFAULT_PYQ_LIMIT: usize = 20;
const MAX_PYQ_LIMIT: usize = 100;
const DEFAULT_EMBEDDING_DIM: usize = 384;

/// Long-lived pipeline shared read-only across requests.
pub struct StudyPipeline {
    rag: Option<Arc<dyn VectorStore>>,
    mcq: Option<Arc<dyn VectorStore>>,
    embedder: Option<Arc<dyn EmbeddingsProvider>>,
    generator: Option<Arc<dyn Generator>>,
    cfg: ContextorConfig,
}

impl StudyPipeline {
    /// Empty pipeline; attach components with the `with_*` methods.
    pub fn new(cfg: ContextorConfig) -> Self {
        Self {
            rag: None,
            mcq: None,
            embedder: None,
            generator: None,
            cfg,
        }
    }

    pub fn with_rag_store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.rag = Some(store);
        self
    }

    pub fn with_mcq_store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.mcq = Some(store);
        self
    }

    pub fn with_embedder(mut self, embedder: Arc<dyn EmbeddingsProvider>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn with_generator(mut self, generator: Arc<dyn Generator>) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Wires every component from environment variables. Components that
    /// fail to configure are logged and left out.
    pub fn from_env(llm: Arc<LlmServiceProfiles>) -> Self {
        let mut pipeline = Self::new(ContextorConfig::from_env());

        match StoreConfig::from_env() {
            Ok(stores) => {
                info!(backend = ?stores.backend, "vector backend selected");
                pipeline.rag = connect("rag", stores.rag.as_ref());
                pipeline.mcq = connect("mcq", stores.mcq.as_ref());
            }
            Err(e) => error!(error = %e, "vector store configuration invalid"),
        }

        if llm.has_embedding() {
            let dim = std::env::var("EMBEDDING_DIM")
                .ok()
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(DEFAULT_EMBEDDING_DIM);
            pipeline.embedder = Some(Arc::new(LlmEmbedder::new(llm.clone(), dim)));
        }
        if llm.has_chat() {
            pipeline.generator = Some(Arc::new(LlmGenerator::new(llm)));
        }

        let a = pipeline.availability();
        info!(
            rag = a.rag_store,
            mcq = a.mcq_store,
            embedder = a.embedder,
            generator = a.generator,
            "study pipeline ready"
        );
        pipeline
    }

    pub fn config(&self) -> &ContextorConfig {
        &self.cfg
    }

    pub fn availability(&self) -> Availability {
        Availability {
            rag_store: self.rag.is_some(),
            mcq_store: self.mcq.is_some(),
            embedder: self.embedder.is_some(),
            generator: self.generator.is_some(),
        }
    }

    /// Answers a study question with curriculum context and related MCQs.
    ///
    /// MCQ retrieval runs concurrently with generation; its failure leaves
    /// `mcqs` empty instead of failing the request.
    pub async fn search(&self, opts: SearchOptions) -> Result<SearchAnswer, ContextorError> {
        self.within("search", self.search_inner(opts)).await
    }

    async fn search_inner(&self, opts: SearchOptions) -> Result<SearchAnswer, ContextorError> {
        let query = non_empty(&opts.query)?;
        let rag = require(&self.rag, "rag store")?;
        let embedder = require(&self.embedder, "embedder")?;
        let generator = require(&self.generator, "generator")?;

        let vector = embedder.embed(query).await?;
        let top_k = opts
            .n_results
            .unwrap_or(self.cfg.default_n_results)
            .clamp(1, self.cfg.max_n_results);
        let target = Target::parse(opts.namespace.as_deref());

        let retrieval =
            aggregate::retrieve_with_escalation(rag.as_ref(), &target, &vector, top_k, self.escalation()).await?;
        let context = retrieval.context;

        let mcq_limit = opts.mcq_limit.unwrap_or(self.cfg.default_mcq_limit);
        let mcq_store = self.mcq.as_deref().filter(|_| opts.include_mcqs.unwrap_or(true) && mcq_limit > 0);

        let params = AnswerParams {
            history_turns: self.cfg.history_turns,
            max_tokens: self.cfg.max_tokens,
            temperature: self.cfg.temperature,
        };
        let (response, mcqs) = tokio::join!(
            generate::answer(
                generator.as_ref(),
                query,
                &context.text,
                context.quality,
                &opts.conversation_history,
                params,
            ),
            async {
                let Some(store) = mcq_store else {
                    return Vec::new();
                };
                questions::related_mcqs(
                    store,
                    &vector,
                    mcq_limit,
                    self.cfg.mcq_score_threshold,
                    self.cfg.option_index_policy,
                )
                .await
                .unwrap_or_else(|e| {
                    warn!(error = %e, "MCQ retrieval failed, answering without MCQs");
                    Vec::new()
                })
            },
        );

        info!(
            namespace = ?target.as_namespace(),
            sources = context.sources.len(),
            mcqs = mcqs.len(),
            escalated = retrieval.escalated,
            quality = ?context.quality,
            "search answered"
        );

        Ok(SearchAnswer {
            response: response?,
            sources: context.sources,
            mcqs,
            query: query.to_string(),
            namespace: target.as_namespace().map(str::to_string),
            escalated: retrieval.escalated,
            context_quality: context.quality,
        })
    }

    /// MCQs related to free text, without generating an answer.
    pub async fn related_mcqs(&self, query: &str, limit: Option<usize>) -> Result<Vec<QuestionHit>, ContextorError> {
        self.within("related_mcqs", async {
            let query = non_empty(query)?;
            let store = require(&self.mcq, "mcq store")?;
            let embedder = require(&self.embedder, "embedder")?;
            let vector = embedder.embed(query).await?;
            questions::related_mcqs(
                store.as_ref(),
                &vector,
                limit.unwrap_or(self.cfg.default_mcq_limit),
                self.cfg.mcq_score_threshold,
                self.cfg.option_index_policy,
            )
            .await
        })
        .await
    }

    pub async fn search_pyq(&self, opts: PyqSearchOptions) -> Result<QuestionList, ContextorError> {
        self.within("search_pyq", async {
            let query = non_empty(&opts.query)?;
            let store = require(&self.mcq, "mcq store")?;
            let embedder = require(&self.embedder, "embedder")?;

            let vector = embedder.embed(query).await?;
            let filter = QuestionFilter::new(opts.exam.clone(), opts.subject.clone(), opts.year.clone());
            let limit = opts.limit.unwrap_or(DEFAULT_PYQ_LIMIT).min(MAX_PYQ_LIMIT);
            let questions = questions::search_pyq(
                store.as_ref(),
                &vector,
                &filter,
                limit,
                opts.offset.unwrap_or(0),
                self.cfg.option_index_policy,
            )
            .await?;
            Ok(QuestionList {
                total: questions.len(),
                questions,
            })
        })
        .await
    }

    pub async fn random_pyq(&self, opts: RandomOptions) -> Result<QuestionList, ContextorError> {
        self.within("random_pyq", async {
            let store = require(&self.mcq, "mcq store")?;
            let embedder = require(&self.embedder, "embedder")?;

            let filter = QuestionFilter::new(opts.exam.clone(), opts.subject.clone(), opts.year.clone());
            let draw = RandomDraw {
                count: self.quiz_size(opts.count),
                probe_top_k: self.cfg.random_probe_top_k,
                policy: self.cfg.option_index_policy,
            };
            let questions = questions::random_pyq(store.as_ref(), embedder.as_ref(), &filter, draw).await?;
            Ok(QuestionList {
                total: questions.len(),
                questions,
            })
        })
        .await
    }

    pub async fn filters(&self) -> Result<FilterOptions, ContextorError> {
        self.within("filters", async { Ok(self.taxonomy().await?.filters()) }).await
    }

    pub async fn catalog(&self) -> Result<Catalog, ContextorError> {
        self.within("catalog", async { Ok(self.taxonomy().await?.catalog()) }).await
    }

    /// Index totals plus distinct exam/subject counts. Taxonomy failures are
    /// logged and reported as zero counts.
    pub async fn stats(&self) -> Result<StatsReport, ContextorError> {
        self.within("stats", async {
            if self.rag.is_none() && self.mcq.is_none() {
                return Err(ContextorError::Unavailable("vector store"));
            }
            let (rag, mcq, taxonomy) = tokio::join!(
                summarize(self.rag.as_deref()),
                summarize(self.mcq.as_deref()),
                async {
                    if self.mcq.is_none() || self.embedder.is_none() {
                        return None;
                    }
                    self.taxonomy()
                        .await
                        .inspect_err(|e| warn!(error = %e, "taxonomy unavailable for stats"))
                        .ok()
                },
            );
            let filters = taxonomy.map(|t| t.filters()).unwrap_or_default();
            Ok(StatsReport {
                rag: rag?,
                mcq: mcq?,
                distinct_exams: filters.total_exams,
                distinct_subjects: filters.total_subjects,
                taxonomy_complete: filters.complete,
            })
        })
        .await
    }

    async fn taxonomy(&self) -> Result<Taxonomy, ContextorError> {
        let store = require(&self.mcq, "mcq store")?;
        let embedder = require(&self.embedder, "embedder")?;
        let probe = embedder.embed(&self.cfg.taxonomy_probe_text).await?;
        taxonomy::sample(
            store.as_ref(),
            &probe,
            self.cfg.taxonomy_sample_cap,
            self.cfg.option_index_policy,
        )
        .await
    }

    fn escalation(&self) -> Escalation {
        Escalation {
            bar: QualityBar {
                min_chars: self.cfg.context_min_chars,
                relevance_floor: self.cfg.relevance_floor,
            },
            multiplier: self.cfg.escalation_multiplier,
        }
    }

    fn quiz_size(&self, requested: Option<usize>) -> usize {
        match requested {
            None | Some(0) => self.cfg.random_default_count,
            Some(n) => n,
        }
        .min(self.cfg.random_max_count)
    }

    async fn within<T>(
        &self,
        op: &'static str,
        fut: impl Future<Output = Result<T, ContextorError>>,
    ) -> Result<T, ContextorError> {
        let deadline = self.cfg.request_deadline;
        match tokio::time::timeout(deadline, fut).await {
            Ok(result) => result,
            Err(_) => {
                warn!(op, ?deadline, "operation exceeded deadline");
                Err(ContextorError::Timeout(deadline))
            }
        }
    }
}

fn connect(role: &'static str, cfg: Option<&IndexConfig>) -> Option<Arc<dyn VectorStore>> {
    let cfg = cfg?;
    match cfg.connect() {
        Ok(store) => {
            info!(role, backend = store.backend(), "vector store connected");
            Some(store)
        }
        Err(e) => {
            error!(role, error = %e, "vector store unavailable");
            None
        }
    }
}

async fn summarize(store: Option<&dyn VectorStore>) -> Result<Option<IndexSummary>, ContextorError> {
    let Some(store) = store else {
        return Ok(None);
    };
    let stats = store.describe_stats().await?;
    Ok(Some(IndexSummary {
        backend: store.backend(),
        total_vectors: stats.total_vector_count,
        dimension: stats.dimension,
        namespaces: stats
            .namespaces
            .into_iter()
            .map(|(name, ns)| (name, ns.vector_count))
            .collect(),
    }))
}

fn require<'a, T: ?Sized>(slot: &'a Option<Arc<T>>, what: &'static str) -> Result<&'a Arc<T>, ContextorError> {
    slot.as_ref().ok_or(ContextorError::Unavailable(what))
}

fn non_empty(query: &str) -> Result<&str, ContextorError> {
    let q = query.trim();
    if q.is_empty() {
        Err(ContextorError::InvalidRequest("query required".into()))
    } else {
        Ok(q)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::{FakeEmbedder, FakeGenerator, FakeStore, chunk, mcq};
    use std::time::Duration;

    const PHOTOSYNTHESIS: &str = "Photosynthesis is the process by which green plants use sunlight, \
                                  water and carbon dioxide to make glucose and release oxygen.";

    fn rag() -> FakeStore {
        FakeStore::default().with(
            "biology",
            vec![
                chunk("bio-1", 0.82, PHOTOSYNTHESIS),
                chunk("bio-2", 0.77, PHOTOSYNTHESIS),
                chunk("bio-3", 0.64, PHOTOSYNTHESIS),
            ],
        )
    }

    fn mcqs() -> FakeStore {
        FakeStore::default().with(
            "medical",
            vec![
                mcq("q1", 0.7, "NEET", "Biology", "2021"),
                mcq("q2", 0.1, "NEET", "Biology", "2020"),
                mcq("q3", 0.5, "AIIMS", "Botany", "Unknown"),
            ],
        )
    }

    fn pipeline(rag: FakeStore, mcq: FakeStore, generator: FakeGenerator) -> StudyPipeline {
        StudyPipeline::new(ContextorConfig::default())
            .with_rag_store(Arc::new(rag))
            .with_mcq_store(Arc::new(mcq))
            .with_embedder(Arc::new(FakeEmbedder))
            .with_generator(Arc::new(generator))
    }

    fn ask(query: &str) -> SearchOptions {
        SearchOptions {
            query: query.into(),
            n_results: Some(3),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn photosynthesis_search_answers_with_three_sources() {
        let p = pipeline(rag(), mcqs(), FakeGenerator::default());
        let out = p.search(ask("What is photosynthesis?")).await.unwrap();

        assert_eq!(out.sources.len(), 3);
        assert_eq!(out.sources[0].id, "bio-1");
        assert_eq!(out.context_quality, ContextQuality::High);
        assert!(!out.escalated);
        assert_eq!(out.response, "Plants make food from light.");
        assert_eq!(out.query, "What is photosynthesis?");
        assert!(out.namespace.is_none());
    }

    #[tokio::test]
    async fn low_scoring_mcqs_are_excluded() {
        let p = pipeline(rag(), mcqs(), FakeGenerator::default());
        let out = p.search(ask("photosynthesis")).await.unwrap();
        let ids: Vec<_> = out.mcqs.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, ["q1", "q3"]);
    }

    #[tokio::test]
    async fn mcqs_can_be_skipped() {
        let p = pipeline(rag(), mcqs(), FakeGenerator::default());
        let out = p
            .search(SearchOptions {
                include_mcqs: Some(false),
                ..ask("photosynthesis")
            })
            .await
            .unwrap();
        assert!(out.mcqs.is_empty());
    }

    #[tokio::test]
    async fn mcq_failure_does_not_fail_search() {
        let broken = FakeStore::default().failing("medical");
        let p = pipeline(rag(), broken, FakeGenerator::default());
        let out = p.search(ask("photosynthesis")).await.unwrap();
        assert!(out.mcqs.is_empty());
        assert_eq!(out.sources.len(), 3);
    }

    #[tokio::test]
    async fn generation_failure_surfaces() {
        let g = FakeGenerator {
            fail: true,
            ..Default::default()
        };
        let err = pipeline(rag(), mcqs(), g).search(ask("photosynthesis")).await.unwrap_err();
        assert_eq!(err.code(), "GENERATION_FAILED");
    }

    #[tokio::test]
    async fn thin_namespace_escalates() {
        let store = FakeStore::default()
            .with("physics", vec![chunk("p", 0.9, &"p".repeat(50))])
            .with("chemistry", vec![chunk("c", 0.8, &"c".repeat(200))]);
        let p = pipeline(store, mcqs(), FakeGenerator::default());
        let out = p
            .search(SearchOptions {
                namespace: Some("physics".into()),
                ..ask("what is force?")
            })
            .await
            .unwrap();
        assert!(out.escalated);
        assert_eq!(out.namespace.as_deref(), Some("physics"));
        assert_eq!(out.sources.len(), 2);
    }

    #[tokio::test]
    async fn missing_components_are_unavailable() {
        let p = StudyPipeline::new(ContextorConfig::default())
            .with_rag_store(Arc::new(rag()))
            .with_embedder(Arc::new(FakeEmbedder));
        let err = p.search(ask("photosynthesis")).await.unwrap_err();
        assert!(matches!(err, ContextorError::Unavailable("generator")));

        let err = p.filters().await.unwrap_err();
        assert!(matches!(err, ContextorError::Unavailable("mcq store")));
        assert!(!p.availability().all());
    }

    #[tokio::test]
    async fn blank_query_is_rejected() {
        let p = pipeline(rag(), mcqs(), FakeGenerator::default());
        let err = p.search(ask("   ")).await.unwrap_err();
        assert!(matches!(err, ContextorError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn slow_store_hits_the_deadline() {
        let slow = FakeStore {
            delay: Some(Duration::from_millis(500)),
            ..rag()
        };
        let mut p = pipeline(slow, mcqs(), FakeGenerator::default());
        p.cfg.request_deadline = Duration::from_millis(50);
        let err = p.search(ask("photosynthesis")).await.unwrap_err();
        assert!(matches!(err, ContextorError::Timeout(_)));
    }

    #[tokio::test]
    async fn filters_and_catalog_come_from_mcq_index() {
        let p = pipeline(rag(), mcqs(), FakeGenerator::default());
        let f = p.filters().await.unwrap();
        assert_eq!(f.exams, ["AIIMS", "NEET"]);
        assert_eq!(f.subjects, ["Biology", "Botany"]);
        assert_eq!(f.years, [2021, 2020]);
        assert!(f.complete);

        let c = p.catalog().await.unwrap();
        assert_eq!(c.tree["medical"]["AIIMS"]["Unknown"]["Main"], 1);
    }

    #[tokio::test]
    async fn stats_report_both_indexes() {
        let p = pipeline(rag(), mcqs(), FakeGenerator::default());
        let s = p.stats().await.unwrap();
        assert_eq!(s.rag.as_ref().map(|r| r.total_vectors), Some(3));
        assert_eq!(s.mcq.as_ref().map(|m| m.namespaces["medical"]), Some(3));
        assert_eq!(s.distinct_exams, 2);
        assert!(s.taxonomy_complete);
    }

    #[tokio::test]
    async fn pyq_search_and_random_quiz() {
        let p = pipeline(rag(), mcqs(), FakeGenerator::default());
        let list = p
            .search_pyq(PyqSearchOptions {
                query: "cells".into(),
                exam: Some("neet".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(list.total, 2);
        assert_eq!(list.questions[0].id, "q1");

        let quiz = p.random_pyq(RandomOptions::default()).await.unwrap();
        assert!(quiz.total <= 3);
        assert_eq!(quiz.total, quiz.questions.len());
    }

    #[test]
    fn quiz_size_is_clamped() {
        let p = StudyPipeline::new(ContextorConfig::default());
        assert_eq!(p.quiz_size(None), 10);
        assert_eq!(p.quiz_size(Some(0)), 10);
        assert_eq!(p.quiz_size(Some(7)), 7);
        assert_eq!(p.quiz_size(Some(500)), 50);
    }

    #[tokio::test]
    async fn photosynthesis_in_science_namespace() {
        let store = FakeStore::default().with(
            "science",
            vec![
                chunk("sci-1", 0.82, PHOTOSYNTHESIS),
                chunk("sci-2", 0.77, PHOTOSYNTHESIS),
                chunk("sci-3", 0.64, PHOTOSYNTHESIS),
            ],
        );
        let p = pipeline(store, mcqs(), FakeGenerator::default());
        let out = p
            .search(SearchOptions {
                namespace: Some("science".into()),
                ..ask("What is photosynthesis?")
            })
            .await
            .unwrap();

        assert_eq!(out.sources.len(), 3);
        assert_eq!(out.context_quality, ContextQuality::High);
        assert!(!out.escalated);
        assert_eq!(out.namespace.as_deref(), Some("science"));
        assert!(out.sources.iter().all(|s| s.namespace.as_deref() == Some("science")));
    }

    #[tokio::test]
    async fn low_top_score_escalates_and_sources_come_from_the_broadened_set() {
        let store = FakeStore::default()
            .with("science", vec![chunk("sci", 0.2, &"s".repeat(300))])
            .with("history", vec![chunk("his", 0.25, &"h".repeat(300))]);
        let p = pipeline(store, mcqs(), FakeGenerator::default());
        let out = p
            .search(SearchOptions {
                namespace: Some("science".into()),
                ..ask("why do leaves change colour?")
            })
            .await
            .unwrap();

        assert!(out.escalated);
        assert_eq!(out.context_quality, ContextQuality::Limited);
        let mut namespaces: Vec<_> = out.sources.iter().filter_map(|s| s.namespace.as_deref()).collect();
        namespaces.sort_unstable();
        assert_eq!(namespaces, ["history", "science"]);
        assert_eq!(out.sources[0].id, "his");
    }

    #[tokio::test]
    async fn related_mcqs_without_generation() {
        let p = StudyPipeline::new(ContextorConfig::default())
            .with_mcq_store(Arc::new(mcqs()))
            .with_embedder(Arc::new(FakeEmbedder));
        let hits = p.related_mcqs("photosynthesis", None).await.unwrap();
        let ids: Vec<_> = hits.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, ["q1", "q3"]);

        let err = p.related_mcqs(" ", None).await.unwrap_err();
        assert!(matches!(err, ContextorError::InvalidRequest(_)));
    }
}
