//! Question filters applied after normalization.
//!
//! Filters compare against the canonical record, so they see the same value
//! whether it came from the blob or from flat metadata.

use serde::{Deserialize, Serialize};

use crate::normalize::CanonicalRecord;

/// Optional exam / subject / year constraints. Blank values mean "any".
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionFilter {
    pub exam: Option<String>,
    pub subject: Option<String>,
    pub year: Option<String>,
}

impl QuestionFilter {
    pub fn new(exam: Option<String>, subject: Option<String>, year: Option<String>) -> Self {
        let clean = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        Self {
            exam: clean(exam),
            subject: clean(subject),
            year: clean(year),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.exam.is_none() && self.subject.is_none() && self.year.is_none()
    }

    /// Case-insensitive equality on every constraint that is set.
    pub fn matches(&self, record: &CanonicalRecord) -> bool {
        fn eq(want: &Option<String>, got: &str) -> bool {
            want.as_deref()
                .is_none_or(|w| w.eq_ignore_ascii_case(got.trim()))
        }
        eq(&self.exam, &record.exam_name)
            && eq(&self.subject, &record.subject)
            && eq(&self.year, &record.year)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> CanonicalRecord {
        CanonicalRecord {
            exam_name: "UPSC CSE".into(),
            subject: "Polity".into(),
            year: "2019".into(),
            ..Default::default()
        }
    }

    #[test]
    fn empty_filter_matches_everything() {
        let f = QuestionFilter::new(Some("  ".into()), None, Some(String::new()));
        assert!(f.is_empty());
        assert!(f.matches(&record()));
    }

    #[test]
    fn all_set_constraints_must_hold() {
        let f = QuestionFilter::new(Some("upsc cse".into()), Some("Polity".into()), Some("2019".into()));
        assert!(f.matches(&record()));

        let f = QuestionFilter::new(None, None, Some("2020".into()));
        assert!(!f.matches(&record()));

        let f = QuestionFilter::new(None, Some("History".into()), None);
        assert!(!f.matches(&record()));
    }
}
