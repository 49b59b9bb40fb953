//! Filter values and the exam catalog, derived by sampling the MCQ index.
//!
//! Vector stores have no "list distinct metadata values" call, so each
//! namespace is probed once with a broad query capped at `sample_cap`
//! records. When a namespace holds more vectors than the cap, the result is
//! an approximation; [`Taxonomy::complete`] reports whether that happened.

use std::collections::BTreeSet;

use rag_store::normalize::{UNKNOWN, normalize_match};
use rag_store::{CanonicalRecord, OptionIndexPolicy, VectorStore};
use tracing::{debug, warn};

use crate::api_types::{Catalog, FilterOptions};
use crate::error::ContextorError;

/// Label used for an index without namespaces.
pub const DEFAULT_NAMESPACE: &str = "default";

/// Records sampled from one namespace.
#[derive(Clone, Debug)]
pub struct Sample {
    pub namespace: String,
    pub records: Vec<CanonicalRecord>,
    /// Vector count from stats; `None` when stats were unavailable.
    pub reported: Option<u64>,
}

impl Sample {
    fn is_complete(&self) -> bool {
        self.reported.is_some_and(|n| self.records.len() as u64 >= n)
    }
}

#[derive(Clone, Debug, Default)]
pub struct Taxonomy {
    pub samples: Vec<Sample>,
}

/// Probes every namespace once. Failed namespaces are dropped and logged;
/// the call errors only when all of them fail.
pub async fn sample(
    store: &dyn VectorStore,
    probe: &[f32],
    cap: u64,
    policy: OptionIndexPolicy,
) -> Result<Taxonomy, ContextorError> {
    let stats = match store.describe_stats().await {
        Ok(s) => Some(s),
        Err(e) => {
            warn!(backend = store.backend(), error = %e, "stats unavailable, sampling without namespaces");
            None
        }
    };
    let namespaces = stats.as_ref().map(|s| s.namespace_names()).unwrap_or_default();

    if namespaces.is_empty() {
        let matches = store.query(probe, cap, None).await?;
        let records = matches.iter().map(|m| normalize_match(m, policy)).collect();
        return Ok(Taxonomy {
            samples: vec![Sample {
                namespace: DEFAULT_NAMESPACE.to_string(),
                records,
                reported: stats.map(|s| s.total_vector_count),
            }],
        });
    }

    let results = store.query_many(&namespaces, probe, cap).await;
    let attempted = results.len();
    let mut last_error = None;
    let mut samples = Vec::with_capacity(attempted);

    for r in results {
        match r.result {
            Ok(matches) => {
                let reported = stats
                    .as_ref()
                    .and_then(|s| s.namespaces.get(&r.namespace))
                    .map(|n| n.vector_count);
                samples.push(Sample {
                    records: matches.iter().map(|m| normalize_match(m, policy)).collect(),
                    namespace: r.namespace,
                    reported,
                });
            }
            Err(e) => last_error = Some(format!("{}: {e}", r.namespace)),
        }
    }

    if samples.is_empty() {
        if let Some(last) = last_error {
            return Err(ContextorError::AllNamespacesFailed { attempted, last });
        }
    }

    let taxonomy = Taxonomy { samples };
    debug!(
        namespaces = taxonomy.samples.len(),
        sampled = taxonomy.sampled(),
        complete = taxonomy.complete(),
        "taxonomy sampled"
    );
    Ok(taxonomy)
}

impl Taxonomy {
    /// Every namespace returned at least as many records as it reports holding.
    pub fn complete(&self) -> bool {
        !self.samples.is_empty() && self.samples.iter().all(Sample::is_complete)
    }

    pub fn sampled(&self) -> usize {
        self.samples.iter().map(|s| s.records.len()).sum()
    }

    fn records(&self) -> impl Iterator<Item = &CanonicalRecord> {
        self.samples.iter().flat_map(|s| s.records.iter())
    }

    /// Distinct exams and subjects ascending, years descending. Blank and
    /// `Unknown` values are left out.
    pub fn filters(&self) -> FilterOptions {
        let mut exams = BTreeSet::new();
        let mut subjects = BTreeSet::new();
        let mut years = BTreeSet::new();

        for r in self.records() {
            if is_known(&r.exam_name) {
                exams.insert(r.exam_name.trim().to_string());
            }
            if is_known(&r.subject) {
                subjects.insert(r.subject.trim().to_string());
            }
            if is_known(&r.year) {
                if let Some(y) = parse_year(&r.year) {
                    years.insert(y);
                }
            }
        }

        let exams: Vec<String> = exams.into_iter().collect();
        let subjects: Vec<String> = subjects.into_iter().collect();
        FilterOptions {
            total_exams: exams.len(),
            total_subjects: subjects.len(),
            exams,
            subjects,
            years: years.into_iter().rev().collect(),
            complete: self.complete(),
            sampled: self.sampled(),
        }
    }

    /// namespace → exam → year → term → count. `Unknown` stays as a bucket here.
    pub fn catalog(&self) -> Catalog {
        let mut catalog = Catalog {
            complete: self.complete(),
            sampled: self.sampled(),
            ..Catalog::default()
        };

        for s in &self.samples {
            let by_exam = catalog.tree.entry(s.namespace.clone()).or_default();
            for r in &s.records {
                *by_exam
                    .entry(label(&r.exam_name))
                    .or_default()
                    .entry(label(&r.year))
                    .or_default()
                    .entry(label(&r.term))
                    .or_default() += 1;
            }
        }
        catalog
    }
}

fn is_known(v: &str) -> bool {
    let v = v.trim();
    !v.is_empty() && v != UNKNOWN
}

fn label(v: &str) -> String {
    if is_known(v) {
        v.trim().to_string()
    } else {
        UNKNOWN.to_string()
    }
}

/// `"2021"` → 2021; otherwise the first run of four digits (`"NEET 2019"` → 2019).
pub fn parse_year(raw: &str) -> Option<i32> {
    let raw = raw.trim();
    if let Ok(y) = raw.parse::<i32>() {
        return Some(y);
    }
    let bytes = raw.as_bytes();
    bytes.windows(4).enumerate().find_map(|(i, w)| {
        let bounded = i.checked_sub(1).is_none_or(|p| !bytes[p].is_ascii_digit())
            && bytes.get(i + 4).is_none_or(|b| !b.is_ascii_digit());
        if bounded && w.iter().all(u8::is_ascii_digit) {
            std::str::from_utf8(w).ok()?.parse().ok()
        } else {
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::{FakeStore, hit, mcq};
    use serde_json::json;

    fn store() -> FakeStore {
        FakeStore::default()
            .with(
                "medical",
                vec![
                    mcq("m1", 0.9, "NEET", "Biology", "2021"),
                    mcq("m2", 0.8, "NEET", "Physics", "2019"),
                    mcq("m3", 0.7, "AIIMS", "Biology", "2021"),
                ],
            )
            .with(
                "engineering",
                vec![
                    mcq("e1", 0.6, "JEE Main", "Physics", "2023"),
                    hit("e2", 0.5, json!({ "question": "No labels?", "subject": "" })),
                ],
            )
    }

    async fn sampled(store: &FakeStore, cap: u64) -> Taxonomy {
        sample(store, &[0.0], cap, OptionIndexPolicy::Emitted).await.unwrap()
    }

    #[tokio::test]
    async fn filters_are_sorted_distinct_and_skip_unknown() {
        let t = sampled(&store(), 1000).await;
        let f = t.filters();
        assert_eq!(f.exams, ["AIIMS", "JEE Main", "NEET"]);
        assert_eq!(f.subjects, ["Biology", "Physics"]);
        assert_eq!(f.years, [2023, 2021, 2019]);
        assert_eq!(f.total_exams, 3);
        assert!(!f.exams.iter().any(|e| e.is_empty() || e == UNKNOWN));
        assert!(f.complete);
        assert_eq!(f.sampled, 5);
    }

    #[tokio::test]
    async fn capped_sample_is_marked_incomplete() {
        let t = sampled(&store(), 2).await;
        assert!(!t.complete());
        assert_eq!(t.sampled(), 4);

        let mut inflated = store();
        inflated.reported.insert("medical".into(), 5000);
        assert!(!sampled(&inflated, 1000).await.complete());
    }

    #[tokio::test]
    async fn catalog_groups_by_namespace_exam_year_term() {
        let c = sampled(&store(), 1000).await.catalog();
        assert_eq!(c.tree["medical"]["NEET"]["2021"]["Main"], 1);
        assert_eq!(c.tree["medical"]["AIIMS"]["2021"]["Main"], 1);
        assert_eq!(c.tree["engineering"][UNKNOWN][UNKNOWN][UNKNOWN], 1);
    }

    #[tokio::test]
    async fn failed_namespace_is_dropped_but_all_failing_errors() {
        let partial = store().failing("dental");
        let t = sampled(&partial, 1000).await;
        assert_eq!(t.samples.len(), 2);

        let broken = FakeStore::default().failing("a").failing("b");
        let err = sample(&broken, &[0.0], 10, OptionIndexPolicy::Emitted).await.unwrap_err();
        assert!(matches!(err, ContextorError::AllNamespacesFailed { attempted: 2, .. }));
    }

    #[tokio::test]
    async fn stats_failure_samples_unnamespaced_and_is_incomplete() {
        let s = FakeStore {
            stats_fail: true,
            ..store()
        };
        let t = sampled(&s, 1000).await;
        assert_eq!(t.samples.len(), 1);
        assert_eq!(t.samples[0].namespace, DEFAULT_NAMESPACE);
        assert_eq!(t.sampled(), 5);
        assert!(!t.complete());
    }

    #[test]
    fn year_parsing() {
        assert_eq!(parse_year(" 2021 "), Some(2021));
        assert_eq!(parse_year("NEET 2019 (Phase 2)"), Some(2019));
        assert_eq!(parse_year("2019-20"), Some(2019));
        assert_eq!(parse_year("abc"), None);
        assert_eq!(parse_year("id-120193"), None);
    }
}
