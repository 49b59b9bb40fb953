//! Prompt builder: system framing chosen by context quality + labelled context block.

use crate::api_types::ContextQuality;

/// Framing for well-supported questions: answer from the material only.
pub const GROUNDED_SYSTEM: &str = r#"
You are an expert AI tutor for the NCERT curriculum and competitive exam preparation.
Answer strictly from the provided context. Cite sources as [Source N].
If the context does not cover part of the question, say so instead of guessing.
"#;

/// Framing for thin material: still help, but flag what the material lacks.
pub const LIMITED_SYSTEM: &str = r#"
You are an expert AI tutor for the NCERT curriculum and competitive exam preparation.
The retrieved study material for this question is limited. Use it where it helps and cite it as [Source N],
then give a clear educational answer from general subject knowledge.
Tell the student briefly that the answer goes beyond the available NCERT material.
"#;

pub fn system_prompt(quality: ContextQuality) -> &'static str {
    match quality {
        ContextQuality::High => GROUNDED_SYSTEM.trim(),
        ContextQuality::Limited => LIMITED_SYSTEM.trim(),
    }
}

/// Build the final user turn with a labelled context section.
///
/// # Example
/// ```
/// use contextor::prompt::build_user_prompt;
/// let prompt = build_user_prompt("What is osmosis?", "[Source 1]\nOsmosis is ...");
/// assert!(prompt.contains("**Question:** What is osmosis?"));
/// ```
pub fn build_user_prompt(question: &str, context: &str) -> String {
    let mut out = String::new();
    out.push_str("**Context:**\n");
    if context.trim().is_empty() {
        out.push_str("(no matching study material found)");
    } else {
        out.push_str(context.trim());
    }
    out.push_str("\n\n**Question:** ");
    out.push_str(question.trim());
    out.push_str("\n\nProvide a comprehensive answer using the context above. Include examples when helpful.");
    out
}
