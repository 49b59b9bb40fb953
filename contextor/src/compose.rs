//! Turns ranked curriculum matches into one labelled context block.

use rag_store::normalize::{UNKNOWN, chunk_text};
use rag_store::{Match, MetadataView};

use crate::api_types::{ComposedContext, ContextQuality, Source};

const BLOCK_SEPARATOR: &str = "\n\n---\n\n";
const PREVIEW_CHARS: usize = 200;

/// Thresholds deciding whether composed material counts as `High` quality.
#[derive(Clone, Copy, Debug)]
pub struct QualityBar {
    pub min_chars: usize,
    pub relevance_floor: f32,
}

/// Build `[Source N]` blocks in input order, the parallel source list, and
/// the quality signal. Matches are expected ranked already.
///
/// # Example
/// ```
/// use contextor::compose::{compose, QualityBar};
/// let bar = QualityBar { min_chars: 100, relevance_floor: 0.3 };
/// let ctx = compose(&[], bar);
/// assert!(ctx.text.is_empty());
/// assert!(ctx.sources.is_empty());
/// ```
pub fn compose(matches: &[Match], bar: QualityBar) -> ComposedContext {
    let mut blocks = Vec::with_capacity(matches.len());
    let mut sources = Vec::with_capacity(matches.len());

    for (i, m) in matches.iter().enumerate() {
        let body = chunk_text(&m.metadata);
        blocks.push(format!("[Source {}]\n{}", i + 1, body));
        sources.push(to_source(m, body));
    }

    let text = blocks.join(BLOCK_SEPARATOR);
    let top_score = matches.first().map(|m| m.score).unwrap_or(0.0);
    let quality = assess(&text, top_score, bar);

    ComposedContext {
        text,
        sources,
        top_score,
        quality,
    }
}

/// `Limited` when the block is short or the best match is weak.
pub fn assess(text: &str, top_score: f32, bar: QualityBar) -> ContextQuality {
    if text.chars().count() < bar.min_chars || top_score < bar.relevance_floor {
        ContextQuality::Limited
    } else {
        ContextQuality::High
    }
}

fn to_source(m: &Match, full_text: String) -> Source {
    let view = MetadataView::new(&m.metadata);
    Source {
        id: m.id.clone(),
        source: view.text_or(&["source"], UNKNOWN),
        namespace: m.namespace.clone(),
        score: m.score,
        text: preview(&full_text),
        full_text,
        subject: view.text(&["subject"]),
        class: view.text(&["class", "grade"]),
        unit: view.text(&["unit"]),
        chapter: view.text(&["chapter"]),
        topic: view.text(&["topic"]),
    }
}

fn preview(text: &str) -> String {
    if text.chars().count() > PREVIEW_CHARS {
        let mut out: String = text.chars().take(PREVIEW_CHARS).collect();
        out.push_str("...");
        out
    } else {
        text.to_string()
    }
}
