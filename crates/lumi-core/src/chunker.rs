use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::error::{Error, Result};
use crate::types::{Chunk, SourceDocument};

/// Separators tried in order; the empty one splits between characters.
const SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Upper bound on a chunk's length, in characters.
    pub chunk_size: usize,
    /// Characters carried over from the end of one chunk into the next.
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { chunk_size: 1000, chunk_overlap: 200 }
    }
}

impl ChunkingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::InvalidConfig("chunk_size must be greater than 0".into()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(Error::InvalidConfig(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct Chunker {
    config: ChunkingConfig,
}

impl Chunker {
    pub fn new(config: ChunkingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ChunkingConfig { &self.config }

    /// Split every document, in order, into overlapping bounded chunks.
    ///
    /// Chunks inherit their document's metadata plus a `start_index` entry.
    /// Fails with [`Error::EmptyInput`] when nothing is left to index.
    pub fn split_documents(&self, documents: &[SourceDocument]) -> Result<Vec<Chunk>> {
        if documents.is_empty() {
            return Err(Error::EmptyInput);
        }
        let mut chunks = Vec::new();
        for doc in documents {
            let pieces = self.split_text(&doc.content);
            let mut start = 0usize;
            let mut previous_len = 0usize;
            for piece in pieces {
                let search_from = (start + previous_len).saturating_sub(self.config.chunk_overlap);
                let mut metadata = doc.metadata.clone();
                if let Some(found) = find_from(&doc.content, &piece, search_from).or_else(|| find_from(&doc.content, &piece, 0)) {
                    start = found;
                    metadata.insert("start_index", found);
                }
                previous_len = piece.chars().count();
                chunks.push(Chunk { content: piece, metadata });
            }
        }
        tracing::debug!(documents = documents.len(), chunks = chunks.len(), "split documents");
        if chunks.is_empty() {
            return Err(Error::EmptyInput);
        }
        Ok(chunks)
    }

    /// Split one text. Text that already fits is returned whole.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return Vec::new();
        }
        if text.chars().count() <= self.config.chunk_size {
            return vec![text.to_string()];
        }
        self.split_recursive(text, &SEPARATORS)
    }

    fn split_recursive(&self, text: &str, separators: &[&str]) -> Vec<String> {
        let position = separators
            .iter()
            .position(|sep| sep.is_empty() || text.contains(sep))
            .unwrap_or(separators.len().saturating_sub(1));
        let separator = separators.get(position).copied().unwrap_or("");
        let remaining = separators.get(position + 1..).unwrap_or(&[]);

        let mut chunks = Vec::new();
        let mut pending: Vec<&str> = Vec::new();
        for piece in split_keep_start(text, separator) {
            if piece.chars().count() < self.config.chunk_size {
                pending.push(piece);
                continue;
            }
            if !pending.is_empty() {
                chunks.extend(self.merge(&pending));
                pending.clear();
            }
            if remaining.is_empty() {
                chunks.extend(trimmed(piece));
            } else {
                chunks.extend(self.split_recursive(piece, remaining));
            }
        }
        if !pending.is_empty() {
            chunks.extend(self.merge(&pending));
        }
        chunks
    }

    /// Greedily pack pieces up to `chunk_size`, keeping an overlapping tail.
    fn merge(&self, pieces: &[&str]) -> Vec<String> {
        let size = self.config.chunk_size;
        let overlap = self.config.chunk_overlap;
        let mut out = Vec::new();
        let mut window: VecDeque<(&str, usize)> = VecDeque::new();
        let mut total = 0usize;
        for &piece in pieces {
            let len = piece.chars().count();
            if total + len > size && !window.is_empty() {
                out.extend(join(&window));
                while total > overlap || (total + len > size && total > 0) {
                    match window.pop_front() {
                        Some((_, dropped)) => total -= dropped,
                        None => break,
                    }
                }
            }
            window.push_back((piece, len));
            total += len;
        }
        out.extend(join(&window));
        out
    }
}

/// Split on `separator`, keeping it at the start of the following piece.
fn split_keep_start<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    if separator.is_empty() {
        return text.char_indices().map(|(i, c)| &text[i..i + c.len_utf8()]).collect();
    }
    let mut pieces = Vec::new();
    let mut start = 0usize;
    for (pos, _) in text.match_indices(separator) {
        if pos > start {
            pieces.push(&text[start..pos]);
            start = pos;
        }
    }
    if start < text.len() {
        pieces.push(&text[start..]);
    }
    pieces
}

fn join(window: &VecDeque<(&str, usize)>) -> Option<String> {
    let joined: String = window.iter().map(|(piece, _)| *piece).collect();
    trimmed(&joined)
}

fn trimmed(text: &str) -> Option<String> {
    let t = text.trim();
    if t.is_empty() { None } else { Some(t.to_string()) }
}

/// Character offset of `needle` in `haystack`, searching from character `from`.
fn find_from(haystack: &str, needle: &str, from: usize) -> Option<usize> {
    let byte_from = haystack.char_indices().nth(from).map_or(haystack.len(), |(b, _)| b);
    let found = haystack[byte_from..].find(needle)?;
    Some(from + haystack[byte_from..byte_from + found].chars().count())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Metadata, SourceType};

    fn chunker(size: usize, overlap: usize) -> Chunker {
        Chunker::new(ChunkingConfig { chunk_size: size, chunk_overlap: overlap }).unwrap()
    }

    fn words(n: usize) -> String {
        (0..n).map(|i| format!("word{i:04}")).collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn short_text_is_returned_whole() {
        let c = chunker(1000, 200);
        assert_eq!(c.split_text("  Short text\n"), vec!["  Short text\n".to_string()]);
    }

    #[test]
    fn blank_text_yields_nothing() {
        assert!(chunker(100, 10).split_text(" \n\n ").is_empty());
    }

    #[test]
    fn chunks_are_bounded_and_overlap() {
        let c = chunker(100, 30);
        let text = words(60);
        let pieces = c.split_text(&text);
        assert!(pieces.len() > 1);
        for p in &pieces {
            assert!(p.chars().count() <= 100, "chunk too long: {}", p.len());
        }
        for pair in pieces.windows(2) {
            let last_word = pair[0].split_whitespace().last().unwrap();
            assert!(pair[1].contains(last_word), "consecutive chunks share a boundary word");
        }
    }

    #[test]
    fn paragraphs_are_preferred_split_points() {
        let c = chunker(30, 0);
        let text = "first paragraph here\n\nsecond paragraph here\n\nthird one";
        let pieces = c.split_text(text);
        assert_eq!(pieces, vec!["first paragraph here", "second paragraph here", "third one"]);
    }

    #[test]
    fn unbroken_text_falls_back_to_characters() {
        let c = chunker(10, 2);
        let pieces = c.split_text(&"x".repeat(25));
        assert!(pieces.iter().all(|p| p.chars().count() <= 10));
        assert!(pieces.len() >= 3);
    }

    #[test]
    fn split_keeps_separator_at_start() {
        assert_eq!(split_keep_start("a b c", " "), vec!["a", " b", " c"]);
        assert_eq!(split_keep_start("\n\na\n\nb", "\n\n"), vec!["\n\na", "\n\nb"]);
    }

    #[test]
    fn find_from_counts_characters() {
        assert_eq!(find_from("héllo héllo", "héllo", 1), Some(6));
        assert_eq!(find_from("abc", "zzz", 0), None);
    }

    #[test]
    fn documents_keep_metadata_and_record_offsets() {
        let c = chunker(100, 20);
        let meta = Metadata::new("lecture.pdf", SourceType::Pdf).with("page", 0);
        let doc = SourceDocument::new(words(40), meta.clone());
        let chunks = c.split_documents(&[doc.clone()]).unwrap();
        assert!(chunks.len() > 1);
        let mut last_start = None;
        for chunk in &chunks {
            assert_eq!(chunk.metadata.source, "lecture.pdf");
            assert_eq!(chunk.metadata.page(), Some(0));
            let start = chunk.metadata.get("start_index").and_then(|v| v.as_u64()).unwrap() as usize;
            let expected: String = doc.content.chars().skip(start).take(chunk.content.chars().count()).collect();
            assert_eq!(expected, chunk.content);
            if let Some(prev) = last_start { assert!(start > prev); }
            last_start = Some(start);
        }
    }

    #[test]
    fn empty_input_is_rejected() {
        let c = Chunker::default();
        assert!(matches!(c.split_documents(&[]), Err(Error::EmptyInput)));
        let blank = SourceDocument::new("   ", Metadata::new("a.pdf", SourceType::Pdf));
        assert!(matches!(c.split_documents(&[blank]), Err(Error::EmptyInput)));
    }

    #[test]
    fn overlap_must_be_smaller_than_size() {
        let err = Chunker::new(ChunkingConfig { chunk_size: 100, chunk_overlap: 100 }).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }
}
