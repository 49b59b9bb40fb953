//! Metadata normalization: raw match metadata → canonical records.
//!
//! Source records are stored with an embedded serialized-JSON blob under
//! [`BLOB_KEY`] and, inconsistently, some of the same fields flattened next to
//! it. Every field is resolved through one layered policy:
//!
//! 1. the blob, if present and decodable (each synonym in order),
//! 2. the flat metadata field (each synonym in order),
//! 3. the field-specific default (`""` for text, [`UNKNOWN`] for exam identifiers).
//!
//! A blob that fails to decode is logged and ignored; normalization never fails.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::record::{Match, Metadata};

/// Reserved metadata key holding the serialized source record.
pub const BLOB_KEY: &str = "full_json_str";

/// Default for exam identifiers (`exam_name`, `year`, `term`).
pub const UNKNOWN: &str = "Unknown";

/// Fixed option letter order.
pub const OPTION_LETTERS: [char; 4] = ['a', 'b', 'c', 'd'];

/// Field names (with synonyms, in priority order) for each canonical field.
pub mod fields {
    pub const QUESTION: &[&str] = &["question"];
    pub const CORRECT: &[&str] = &["correct_answer", "correct_option", "answer"];
    pub const EXAM_NAME: &[&str] = &["exam_name", "exam"];
    pub const YEAR: &[&str] = &["year", "exam_year"];
    pub const TERM: &[&str] = &["term", "exam_term"];
    pub const SUBJECT: &[&str] = &["subject"];
    pub const EXPLANATION: &[&str] = &["explanation"];
    pub const TOPIC: &[&str] = &["topic"];
    pub const OPTIONS: &[&str] = &["options"];
    /// Chunk body used for prompting: `text`, then `question`.
    pub const CHUNK_TEXT: &[&str] = &["text", "question"];
}

/// How the correct option letter is mapped to an index.
///
/// With options `{a: "X", c: "Y"}` and correct letter `c`, the emitted options
/// are `["X", "Y"]`: `Emitted` yields `Some(1)` (where `"Y"` actually is),
/// `Nominal` yields `Some(2)` (the letter's slot in `[a, b, c, d]`).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OptionIndexPolicy {
    #[default]
    Emitted,
    Nominal,
}

/// Fully resolved question record, independent of which storage layer supplied it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: String,
    pub correct_answer_index: Option<usize>,
    pub exam_name: String,
    pub year: String,
    pub term: String,
    pub subject: String,
    pub explanation: String,
    pub topic: String,
}

/// Read-only view over one match's metadata with the blob decoded once.
pub struct MetadataView<'a> {
    blob: Option<Metadata>,
    flat: &'a Metadata,
}

impl<'a> MetadataView<'a> {
    pub fn new(flat: &'a Metadata) -> Self {
        Self {
            blob: decode_blob(flat),
            flat,
        }
    }

    pub fn has_blob(&self) -> bool {
        self.blob.is_some()
    }

    /// Layered lookup of the first non-empty value: blob synonyms, then flat synonyms.
    pub fn raw(&self, names: &[&str]) -> Option<&Value> {
        let layers = self.blob.iter().chain(std::iter::once(self.flat));
        for layer in layers {
            for name in names {
                if let Some(v) = layer.get(*name).filter(|v| !is_blank(v)) {
                    return Some(v);
                }
            }
        }
        None
    }

    /// Layered lookup rendered as text. Values that are not scalars (lists,
    /// objects) are skipped so later synonyms and the flat layer still apply.
    pub fn text(&self, names: &[&str]) -> Option<String> {
        let layers = self.blob.iter().chain(std::iter::once(self.flat));
        layers
            .flat_map(|layer| names.iter().filter_map(move |name| layer.get(*name)))
            .find_map(scalar_to_string)
    }

    /// Layered lookup with a default.
    pub fn text_or(&self, names: &[&str], default: &str) -> String {
        self.text(names).unwrap_or_else(|| default.to_string())
    }

    /// Options as `(letter, text)` in `a,b,c,d` order, only letters present.
    ///
    /// A structured `options` value (object keyed by letter, or an ordered
    /// array) wins; otherwise the four `option_<letter>` fields are used.
    pub fn options(&self) -> Vec<(char, String)> {
        if let Some(structured) = self.raw(fields::OPTIONS) {
            let parsed = options_from_value(structured);
            if !parsed.is_empty() {
                return parsed;
            }
        }

        OPTION_LETTERS
            .iter()
            .filter_map(|&letter| {
                let key = format!("option_{letter}");
                self.text(&[key.as_str()]).map(|t| (letter, t))
            })
            .collect()
    }
}

/// Normalizes one match's metadata into a [`CanonicalRecord`].
pub fn canonical_record(metadata: &Metadata, policy: OptionIndexPolicy) -> CanonicalRecord {
    let view = MetadataView::new(metadata);
    let options = view.options();
    let correct_answer = view.text_or(fields::CORRECT, "");
    let correct_answer_index = option_index(&correct_answer, &options, policy);

    CanonicalRecord {
        question: view.text_or(fields::QUESTION, ""),
        options: options.into_iter().map(|(_, t)| t).collect(),
        correct_answer,
        correct_answer_index,
        exam_name: view.text_or(fields::EXAM_NAME, UNKNOWN),
        year: view.text_or(fields::YEAR, UNKNOWN),
        term: view.text_or(fields::TERM, UNKNOWN),
        subject: view.text_or(fields::SUBJECT, ""),
        explanation: view.text_or(fields::EXPLANATION, ""),
        topic: view.text_or(fields::TOPIC, ""),
    }
}

/// Convenience for a whole match.
pub fn normalize_match(m: &Match, policy: OptionIndexPolicy) -> CanonicalRecord {
    canonical_record(&m.metadata, policy)
}

/// Primary text of a document chunk (`text`, falling back to `question`).
pub fn chunk_text(metadata: &Metadata) -> String {
    MetadataView::new(metadata).text_or(fields::CHUNK_TEXT, "")
}

/// Extracts `a`..`d` from forms like `"C"`, `"(c)"`, `"c)"`, `"option c"`, `"Option (C)"`.
pub fn option_letter(raw: &str) -> Option<char> {
    let lowered = raw.trim().to_lowercase();
    let rest = lowered.strip_prefix("option").unwrap_or(&lowered);
    let core: String = rest
        .chars()
        .filter(|c| !c.is_whitespace() && !matches!(*c, '(' | ')' | '.' | ':' | '_' | '-' | '[' | ']'))
        .collect();
    let mut chars = core.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if OPTION_LETTERS.contains(&c) => Some(c),
        _ => None,
    }
}

/// Resolves the correct option index under `policy`; `None` when undetermined.
pub fn option_index(
    correct: &str,
    options: &[(char, String)],
    policy: OptionIndexPolicy,
) -> Option<usize> {
    if options.is_empty() {
        return None;
    }
    let letter = option_letter(correct)?;
    match policy {
        OptionIndexPolicy::Emitted => options.iter().position(|(l, _)| *l == letter),
        OptionIndexPolicy::Nominal => OPTION_LETTERS.iter().position(|l| *l == letter),
    }
}

fn decode_blob(flat: &Metadata) -> Option<Metadata> {
    match flat.get(BLOB_KEY)? {
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => match serde_json::from_str::<Value>(s) {
            Ok(Value::Object(map)) => Some(map),
            Ok(_) => {
                warn!(key = BLOB_KEY, "embedded record is not a JSON object; using flat metadata");
                None
            }
            Err(e) => {
                warn!(key = BLOB_KEY, error = %e, "embedded record failed to decode; using flat metadata");
                None
            }
        },
        // Some stores hand the record back already structured.
        Value::Object(map) => Some(map.clone()),
        _ => None,
    }
}

fn options_from_value(v: &Value) -> Vec<(char, String)> {
    match v {
        Value::Object(map) => OPTION_LETTERS
            .iter()
            .filter_map(|&letter| {
                map.iter()
                    .find(|(k, _)| option_letter(k) == Some(letter))
                    .and_then(|(_, v)| scalar_to_string(v))
                    .map(|t| (letter, t))
            })
            .collect(),
        Value::Array(items) => OPTION_LETTERS
            .iter()
            .zip(items.iter())
            .filter_map(|(&letter, v)| scalar_to_string(v).map(|t| (letter, t)))
            .collect(),
        // Some exports store the options object itself as a JSON string.
        Value::String(s) => serde_json::from_str::<Value>(s)
            .ok()
            .filter(|inner| inner.is_object() || inner.is_array())
            .map(|inner| options_from_value(&inner))
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}

fn is_blank(v: &Value) -> bool {
    match v {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn scalar_to_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(match n.as_f64() {
            Some(f) if !n.is_i64() && !n.is_u64() && f.fract() == 0.0 && f.abs() < 1e15 => {
                format!("{}", f as i64)
            }
            _ => n.to_string(),
        }),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
