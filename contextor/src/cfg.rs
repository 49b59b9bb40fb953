//! Runtime configuration loaded from environment variables.

use std::time::Duration;

use rag_store::OptionIndexPolicy;

/// Pipeline knobs. All fields have defaults via [`Default`] and `from_env`.
#[derive(Clone, Debug)]
pub struct ContextorConfig {
    // Context quality
    /// Composed context shorter than this (in chars) is `Limited`.
    pub context_min_chars: usize,
    /// Top score below this is `Limited`.
    pub relevance_floor: f32,
    /// Broadened search asks for `top_k * escalation_multiplier`.
    pub escalation_multiplier: u64,

    // Retrieval defaults
    pub default_n_results: u64,
    pub max_n_results: u64,
    pub default_mcq_limit: usize,
    /// MCQs scoring below this are dropped from search responses.
    pub mcq_score_threshold: f32,
    pub option_index_policy: OptionIndexPolicy,

    // Taxonomy sampling
    pub taxonomy_probe_text: String,
    pub taxonomy_sample_cap: u64,

    // Random quiz
    pub random_default_count: usize,
    pub random_max_count: usize,
    pub random_probe_top_k: u64,

    // Generation
    pub history_turns: usize,
    pub max_tokens: u32,
    pub temperature: f32,

    /// Hard wall-clock budget for one public operation.
    pub request_deadline: Duration,
}

impl Default for ContextorConfig {
    fn default() -> Self {
        Self {
            context_min_chars: 100,
            relevance_floor: 0.3,
            escalation_multiplier: 2,

            default_n_results: 5,
            max_n_results: 50,
            default_mcq_limit: 5,
            mcq_score_threshold: 0.25,
            option_index_policy: OptionIndexPolicy::Emitted,

            taxonomy_probe_text: "question".to_string(),
            taxonomy_sample_cap: 1000,

            random_default_count: 10,
            random_max_count: 50,
            random_probe_top_k: 5,

            history_turns: 4,
            max_tokens: 1024,
            temperature: 0.3,

            request_deadline: Duration::from_secs(30),
        }
    }
}

impl ContextorConfig {
    /// Build from environment variables, falling back to the defaults.
    pub fn from_env() -> Self {
        let d = Self::default();
        let option_index_policy = match env("OPTION_INDEX_POLICY", "emitted").to_lowercase().as_str() {
            "nominal" => OptionIndexPolicy::Nominal,
            _ => OptionIndexPolicy::Emitted,
        };

        Self {
            context_min_chars: parse("CONTEXT_MIN_CHARS", d.context_min_chars),
            relevance_floor: parse("RELEVANCE_FLOOR", d.relevance_floor),
            escalation_multiplier: parse("ESCALATION_MULTIPLIER", d.escalation_multiplier).max(1),

            default_n_results: parse("DEFAULT_N_RESULTS", d.default_n_results).max(1),
            max_n_results: parse("MAX_N_RESULTS", d.max_n_results).max(1),
            default_mcq_limit: parse("DEFAULT_MCQ_LIMIT", d.default_mcq_limit),
            mcq_score_threshold: parse("MCQ_SCORE_THRESHOLD", d.mcq_score_threshold),
            option_index_policy,

            taxonomy_probe_text: env("TAXONOMY_PROBE_TEXT", &d.taxonomy_probe_text),
            taxonomy_sample_cap: parse("TAXONOMY_SAMPLE_CAP", d.taxonomy_sample_cap).max(1),

            random_default_count: d.random_default_count,
            random_max_count: parse("RANDOM_MAX_COUNT", d.random_max_count).max(1),
            random_probe_top_k: d.random_probe_top_k,

            history_turns: parse("HISTORY_TURNS", d.history_turns),
            max_tokens: parse("LLM_MAX_TOKENS", d.max_tokens),
            temperature: parse("LLM_TEMPERATURE", d.temperature),

            request_deadline: Duration::from_secs(
                parse("REQUEST_DEADLINE_SECS", d.request_deadline.as_secs()).max(1),
            ),
        }
    }
}

fn env(k: &str, dflt: &str) -> String {
    std::env::var(k)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| dflt.to_string())
}

fn parse<T: std::str::FromStr>(k: &str, dflt: T) -> T {
    std::env::var(k)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(dflt)
}
