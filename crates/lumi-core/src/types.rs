//! Domain types shared by the chunker, the indexes and the retriever.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Position of a chunk inside its corpus.
pub type ChunkId = usize;

/// Kind of study material a document was loaded from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Pdf,
    Youtube,
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceType::Pdf => f.write_str("pdf"),
            SourceType::Youtube => f.write_str("youtube"),
        }
    }
}

/// Provenance carried by a document and inherited by its chunks.
///
/// `source` and `type` are always present. Loader specific fields such as
/// `page`, `title`, `duration`, `views` or the chunker's `start_index` are
/// kept in `extra` and serialized flat next to them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub source: String,
    #[serde(rename = "type")]
    pub kind: SourceType,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Metadata {
    pub fn new(source: impl Into<String>, kind: SourceType) -> Self {
        Self { source: source.into(), kind, extra: BTreeMap::new() }
    }

    #[must_use]
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.extra.insert(key.to_string(), value.into());
        self
    }

    pub fn insert(&mut self, key: &str, value: impl Into<Value>) {
        self.extra.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> { self.extra.get(key) }

    /// Human readable label: the video title when known, else the source.
    pub fn title(&self) -> &str {
        self.extra.get("title").and_then(Value::as_str).unwrap_or(&self.source)
    }

    pub fn page(&self) -> Option<u64> { self.extra.get("page").and_then(Value::as_u64) }
}

/// Raw text produced by a loader, before chunking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceDocument {
    pub content: String,
    pub metadata: Metadata,
}

impl SourceDocument {
    pub fn new(content: impl Into<String>, metadata: Metadata) -> Self {
        Self { content: content.into(), metadata }
    }
}

/// Immutable unit of retrievable text.
///
/// Two chunks with the same `content` are the same chunk for deduplication,
/// whatever their metadata says.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub content: String,
    pub metadata: Metadata,
}

impl Chunk {
    pub fn new(content: impl Into<String>, metadata: Metadata) -> Self {
        Self { content: content.into(), metadata }
    }

    /// First `max_chars` characters, with an ellipsis when cut.
    pub fn preview(&self, max_chars: usize) -> String {
        let mut chars = self.content.chars();
        let head: String = chars.by_ref().take(max_chars).collect();
        if chars.next().is_some() { format!("{head}...") } else { head }
    }
}

/// Ordered chunks of one ingestion; a chunk's position is its [`ChunkId`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Corpus {
    chunks: Vec<Chunk>,
}

impl Corpus {
    pub fn new(chunks: Vec<Chunk>) -> Self { Self { chunks } }

    pub fn len(&self) -> usize { self.chunks.len() }

    pub fn is_empty(&self) -> bool { self.chunks.is_empty() }

    pub fn get(&self, id: ChunkId) -> Option<&Chunk> { self.chunks.get(id) }

    pub fn chunks(&self) -> &[Chunk] { &self.chunks }

    pub fn iter(&self) -> impl Iterator<Item = (ChunkId, &Chunk)> { self.chunks.iter().enumerate() }

    pub fn contents(&self) -> Vec<String> { self.chunks.iter().map(|c| c.content.clone()).collect() }
}

/// Indicates which index produced a candidate.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SourceKind {
    Vector,
    Text,
}

/// A scored corpus position returned by one of the indexes.
///
/// `score` is index specific but higher is always better.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchHit {
    pub id: ChunkId,
    pub score: f32,
    pub source: SourceKind,
}
