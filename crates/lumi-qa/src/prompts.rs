//! Prompt templates. Placeholders are `{context}`, `{question}`,
//! `{context_answer}` and `{history}`.

use lumi_core::types::{Chunk, SourceType};

use crate::orchestrator::{ChatTurn, Role, HISTORY_TURNS};

pub const CONTEXT_PROMPT: &str = "Answer strictly based only on the context below.
Clearly indicate which source each piece comes from (PDF name or YouTube).
If multiple sources are available, cross-reference them.
If unsure, say \"This isn't clear from the sources.\"

Conversation so far:
{history}

Context:
{context}

Question: {question}";

pub const ANALYSIS_PROMPT: &str = "Based on the following question and the context answer provided,
generate your own analysis that goes beyond the given sources. This could include:
- Connecting concepts between sources
- Drawing broader implications
- Identifying potential gaps or limitations
- Providing educated guesses where appropriate
- Offering practical insights or recommendations

Question: {question}
Context Answer: {context_answer}

Provide your analysis below:";

/// Replace each `{key}` in `template` with its value, in one pass so that
/// values containing braces are left alone.
pub fn render(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let replaced = after.find('}').and_then(|close| {
            let key = &after[..close];
            values.iter().find(|(k, _)| *k == key).map(|(_, v)| (*v, close))
        });
        match replaced {
            Some((value, close)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Source label shown to the model, e.g. `[PDF: notes.pdf, page 3]`.
pub fn source_label(chunk: &Chunk) -> String {
    let meta = &chunk.metadata;
    match meta.kind {
        SourceType::Pdf => match meta.page() {
            Some(page) => format!("[PDF: {}, page {}]", meta.source, page + 1),
            None => format!("[PDF: {}]", meta.source),
        },
        SourceType::Youtube => format!("[YouTube: {}]", meta.title()),
    }
}

pub fn format_context(chunks: &[Chunk]) -> String {
    chunks
        .iter()
        .map(|c| format!("{}\n{}", source_label(c), c.content))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// The most recent [`HISTORY_TURNS`] turns, oldest first.
pub fn format_history(history: &[ChatTurn]) -> String {
    if history.is_empty() {
        return "(none)".to_string();
    }
    history[history.len().saturating_sub(HISTORY_TURNS)..]
        .iter()
        .map(|turn| {
            let who = match turn.role {
                Role::User => "User",
                Role::Assistant => "Assistant",
            };
            format!("{who}: {}", turn.content)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumi_core::types::Metadata;

    #[test]
    fn render_fills_known_placeholders_only() {
        let out = render("Q: {question} / {unknown} / {context}", &[("question", "why {x}?"), ("context", "c")]);
        assert_eq!(out, "Q: why {x}? / {unknown} / c");
    }

    #[test]
    fn templates_use_their_placeholders() {
        assert!(CONTEXT_PROMPT.contains("{context}") && CONTEXT_PROMPT.contains("{question}") && CONTEXT_PROMPT.contains("{history}"));
        assert!(ANALYSIS_PROMPT.contains("{context_answer}"));
    }

    #[test]
    fn labels_name_the_source() {
        let pdf = Chunk::new("x", Metadata::new("notes.pdf", SourceType::Pdf).with("page", 2));
        let video = Chunk::new("y", Metadata::new("https://youtu.be/a", SourceType::Youtube).with("title", "Krebs"));
        assert_eq!(source_label(&pdf), "[PDF: notes.pdf, page 3]");
        assert_eq!(source_label(&video), "[YouTube: Krebs]");
        assert_eq!(format_context(&[pdf, video]), "[PDF: notes.pdf, page 3]\nx\n\n[YouTube: Krebs]\ny");
    }

    #[test]
    fn history_renders_only_recent_turns() {
        let history: Vec<ChatTurn> = (0..HISTORY_TURNS + 4).map(|i| ChatTurn::user(format!("q{i}"))).collect();
        let text = format_history(&history);
        assert_eq!(text.lines().count(), HISTORY_TURNS);
        assert!(text.starts_with("User: q4\n"));
        assert!(text.ends_with(&format!("User: q{}", HISTORY_TURNS + 3)));
        assert_eq!(format_history(&[]), "(none)");
    }
}
