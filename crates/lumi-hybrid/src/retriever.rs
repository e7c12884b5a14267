use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use lumi_core::chunker::{Chunker, ChunkingConfig};
use lumi_core::config::Settings;
use lumi_core::error::{Error, Result, Stage};
use lumi_core::traits::{Embedder, RelevanceScorer, Retriever};
use lumi_core::types::{Chunk, Corpus, SourceDocument};
use lumi_text::SparseIndex;
use lumi_vector::{DenseIndex, DenseOptions, EmbeddingCache};

use crate::rerank::Reranker;

/// Each index is asked for `OVERFETCH * k` candidates.
const OVERFETCH: usize = 2;

#[derive(Debug, Clone)]
pub struct HybridOptions {
    pub chunking: ChunkingConfig,
    pub batch_size: usize,
    /// Bound on every embedding and rerank call.
    pub timeout: Duration,
    /// Used by [`Retriever::query`], which has no rerank switch.
    pub use_rerank: bool,
}

impl Default for HybridOptions {
    fn default() -> Self {
        Self { chunking: ChunkingConfig::default(), batch_size: 32, timeout: Duration::from_secs(30), use_rerank: true }
    }
}

impl HybridOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            chunking: settings.chunking.clone(),
            batch_size: settings.embedding.batch_size,
            timeout: settings.retrieval.timeout(),
            use_rerank: settings.retrieval.use_rerank,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestStats {
    pub documents: usize,
    pub chunks: usize,
}

/// Corpus plus both indexes, always built from the same snapshot.
struct Indexes {
    corpus: Arc<Corpus>,
    dense: DenseIndex,
    sparse: SparseIndex,
}

enum State {
    Uninitialized,
    Ready(Indexes),
}

pub struct HybridRetriever {
    chunker: Chunker,
    embedder: Arc<dyn Embedder>,
    reranker: Reranker,
    cache: EmbeddingCache,
    options: HybridOptions,
    state: State,
}

impl HybridRetriever {
    pub fn new(options: HybridOptions, embedder: Arc<dyn Embedder>, scorer: Arc<dyn RelevanceScorer>) -> Result<Self> {
        let chunker = Chunker::new(options.chunking.clone())?;
        let reranker = Reranker::new(scorer, options.timeout);
        Ok(Self { chunker, embedder, reranker, cache: EmbeddingCache::new(), options, state: State::Uninitialized })
    }

    /// Retriever with the embedder and scorer the settings describe.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let embedder = lumi_embed::get_default_embedder(&settings.embedding).map_err(|e| Error::external(Stage::Embedding, format!("{e:#}")))?;
        let scorer = lumi_embed::build_scorer(&settings.reranker, Arc::clone(&embedder))
            .map_err(|e| Error::external(Stage::Reranking, format!("{e:#}")))?;
        Self::new(HybridOptions::from_settings(settings), embedder, scorer)
    }

    pub fn is_ready(&self) -> bool { matches!(self.state, State::Ready(_)) }

    pub fn options(&self) -> &HybridOptions { &self.options }

    pub fn set_use_rerank(&mut self, use_rerank: bool) { self.options.use_rerank = use_rerank; }

    /// Full rebuild from `documents`. On error the previous corpus and indexes stay.
    pub async fn ingest(&mut self, documents: &[SourceDocument]) -> Result<IngestStats> {
        let started = Instant::now();
        let chunks = self.chunker.split_documents(documents)?;
        let corpus = Arc::new(Corpus::new(chunks));
        let dense_options = DenseOptions { batch_size: self.options.batch_size, timeout: self.options.timeout };
        let dense = DenseIndex::build(Arc::clone(&corpus), Arc::clone(&self.embedder), &self.cache, dense_options).await?;
        let sparse = SparseIndex::build(Arc::clone(&corpus))?;

        let stats = IngestStats { documents: documents.len(), chunks: corpus.len() };
        let rebuilt = self.is_ready();
        self.state = State::Ready(Indexes { corpus, dense, sparse });
        tracing::info!(
            documents = stats.documents,
            chunks = stats.chunks,
            rebuilt,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "collection indexed"
        );
        Ok(stats)
    }

    /// Up to `k` chunks for `query`.
    ///
    /// Dense hits come first, then sparse hits, `2k` from each; duplicates by
    /// content keep their first occurrence. The merge is then reranked, or
    /// just cut to `k` when `use_rerank` is false.
    pub async fn retrieve(&self, query: &str, k: usize, use_rerank: bool) -> Result<Vec<Chunk>> {
        let State::Ready(indexes) = &self.state else {
            return Err(Error::NotReady);
        };
        if k == 0 {
            return Ok(Vec::new());
        }
        let fetch = k.saturating_mul(OVERFETCH);
        let dense_hits = indexes.dense.query_scored(query, fetch).await?;
        let sparse_ids = indexes.sparse.query_ids(query, fetch)?;

        let candidates = dense_hits
            .iter()
            .map(|h| h.id)
            .chain(sparse_ids)
            .filter_map(|id| indexes.corpus.get(id));
        let mut seen: HashSet<&str> = HashSet::new();
        let mut merged: Vec<Chunk> = Vec::new();
        for chunk in candidates {
            if seen.insert(chunk.content.as_str()) {
                merged.push(chunk.clone());
            }
        }
        tracing::debug!(dense = dense_hits.len(), merged = merged.len(), k, use_rerank, "candidates merged");

        if !use_rerank {
            merged.truncate(k);
            return Ok(merged);
        }
        self.reranker.rerank(query, merged, k).await
    }

    /// The current corpus in order.
    pub fn all_chunks(&self) -> Result<&[Chunk]> {
        match &self.state {
            State::Ready(indexes) => Ok(indexes.corpus.chunks()),
            State::Uninitialized => Err(Error::NotReady),
        }
    }

    /// Drop the corpus and both indexes.
    pub fn clear(&mut self) {
        self.state = State::Uninitialized;
        tracing::debug!("retriever cleared");
    }
}

impl Retriever for HybridRetriever {
    async fn query(&self, text: &str, k: usize) -> Result<Vec<Chunk>> {
        self.retrieve(text, k, self.options.use_rerank).await
    }
}
