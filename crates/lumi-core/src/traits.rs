use std::future::Future;

use crate::error::Result;
use crate::types::{Chunk, SourceDocument};

/// Text to vector model. Vectors for one `model_id` share one dimension.
pub trait Embedder: Send + Sync {
    /// Stable identifier for the model (e.g. `hash:d384`).
    fn model_id(&self) -> &str;
    fn dim(&self) -> usize;
    fn max_len(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;
}

/// Pairwise (query, passage) relevance model used for reranking.
pub trait RelevanceScorer: Send + Sync {
    fn model_id(&self) -> &str;
    /// One score per passage, higher is more relevant.
    fn score(&self, query: &str, passages: &[String]) -> anyhow::Result<Vec<f32>>;
}

/// Anything that answers `query(text, k)` with an ordered chunk list.
pub trait Retriever: Send + Sync {
    fn query(&self, text: &str, k: usize) -> impl Future<Output = Result<Vec<Chunk>>> + Send;
}

/// Produces raw documents for ingestion (PDF pages, a transcript, ...).
pub trait SourceLoader: Send + Sync {
    /// Short label used when reporting a failure.
    fn describe(&self) -> String;
    fn load(&self) -> Result<Vec<SourceDocument>>;
}
