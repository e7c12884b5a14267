use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Duration;

use lumi_core::bounded::run_bounded;
use lumi_core::error::{Error, Result, Stage};
use lumi_core::traits::{Embedder, Retriever};
use lumi_core::types::{Chunk, ChunkId, Corpus, SearchHit, SourceKind};
use lumi_embed::cosine_similarity;

use crate::cache::{hash_content, CacheEntry, EmbeddingCache};

#[derive(Debug, Clone, Copy)]
pub struct DenseOptions {
    pub batch_size: usize,
    /// Bound on each embedding call.
    pub timeout: Duration,
}

impl Default for DenseOptions {
    fn default() -> Self {
        Self { batch_size: 32, timeout: Duration::from_secs(30) }
    }
}

/// Flat cosine index over one corpus snapshot. Queries are embedded with the
/// same embedder that built the index.
pub struct DenseIndex {
    corpus: Arc<Corpus>,
    embedder: Arc<dyn Embedder>,
    model_id: String,
    dim: usize,
    vectors: Vec<Vec<f32>>,
    timeout: Duration,
}

impl DenseIndex {
    pub async fn build(corpus: Arc<Corpus>, embedder: Arc<dyn Embedder>, cache: &EmbeddingCache, options: DenseOptions) -> Result<Self> {
        let model_id = embedder.model_id().to_string();
        let dim = embedder.dim();
        let batch_size = options.batch_size.max(1);
        let mut vectors: Vec<Vec<f32>> = Vec::with_capacity(corpus.len());
        let mut cached = 0usize;

        for (batch_no, batch) in corpus.chunks().chunks(batch_size).enumerate() {
            let hashes: Vec<String> = batch.iter().map(|c| hash_content(&c.content)).collect();
            let hits = cache.get_many(&model_id, &hashes);
            cached += hits.len();
            let misses: Vec<usize> = (0..batch.len()).filter(|i| !hits.contains_key(&hashes[*i])).collect();

            let mut fresh = Vec::new();
            if !misses.is_empty() {
                let texts: Vec<String> = misses.iter().map(|&i| batch[i].content.clone()).collect();
                fresh = embed_checked(&embedder, texts, dim, options.timeout).await?;
                cache.put_many(
                    misses
                        .iter()
                        .zip(fresh.iter())
                        .map(|(&i, v)| CacheEntry { content_hash: hashes[i].clone(), embedder_id: model_id.clone(), vector: v.clone() })
                        .collect(),
                );
            }
            let mut fresh = fresh.into_iter();
            for hash in &hashes {
                let vector = match hits.get(hash) {
                    Some(v) => v.clone(),
                    None => fresh.next().ok_or_else(|| Error::external(Stage::Embedding, "embedder returned too few vectors"))?,
                };
                vectors.push(vector);
            }
            tracing::trace!(batch = batch_no, size = batch.len(), "embedded batch");
        }
        tracing::debug!(chunks = corpus.len(), cached, model = %model_id, "dense index built");
        Ok(Self { corpus, embedder, model_id, dim, vectors, timeout: options.timeout })
    }

    pub fn corpus(&self) -> &Arc<Corpus> { &self.corpus }

    pub fn model_id(&self) -> &str { &self.model_id }

    pub fn dim(&self) -> usize { self.dim }

    pub fn len(&self) -> usize { self.vectors.len() }

    pub fn is_empty(&self) -> bool { self.vectors.is_empty() }

    /// The `n` most similar chunks, best first, ties by lowest position.
    pub async fn query_scored(&self, text: &str, n: usize) -> Result<Vec<SearchHit>> {
        if n == 0 || self.vectors.is_empty() {
            return Ok(Vec::new());
        }
        let mut q = embed_checked(&self.embedder, vec![text.to_string()], self.dim, self.timeout).await?;
        let q = q.pop().ok_or_else(|| Error::external(Stage::Embedding, "no query vector"))?;
        let mut scored: Vec<(ChunkId, f32)> = self.vectors.iter().enumerate().map(|(id, v)| (id, cosine_similarity(&q, v))).collect();
        scored.sort_by(|a, b| descending_nan_last(a.1, b.1).then(a.0.cmp(&b.0)));
        scored.truncate(n);
        Ok(scored.into_iter().map(|(id, score)| SearchHit { id, score, source: SourceKind::Vector }).collect())
    }
}

impl Retriever for DenseIndex {
    async fn query(&self, text: &str, k: usize) -> Result<Vec<Chunk>> {
        let hits = self.query_scored(text, k).await?;
        Ok(hits.into_iter().filter_map(|h| self.corpus.get(h.id).cloned()).collect())
    }
}

/// One bounded embedding call; the result must have one `dim`-sized vector per text.
async fn embed_checked(embedder: &Arc<dyn Embedder>, texts: Vec<String>, dim: usize, timeout: Duration) -> Result<Vec<Vec<f32>>> {
    let expected = texts.len();
    let embedder = Arc::clone(embedder);
    let vectors = run_bounded(Stage::Embedding, timeout, move || embedder.embed_batch(&texts)).await?;
    if vectors.len() != expected {
        return Err(Error::external(Stage::Embedding, format!("embedder returned {} vectors for {} texts", vectors.len(), expected)));
    }
    if let Some(bad) = vectors.iter().find(|v| v.len() != dim) {
        return Err(Error::external(Stage::Embedding, format!("dim mismatch: got {} expected {}", bad.len(), dim)));
    }
    if vectors.iter().flatten().any(|x| !x.is_finite()) {
        return Err(Error::external(Stage::Embedding, "non-finite embedding"));
    }
    Ok(vectors)
}

/// Finite vectors can still overflow to a NaN cosine; those rank last.
fn descending_nan_last(a: f32, b: f32) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.total_cmp(&a),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumi_core::types::{Metadata, SourceType};
    use lumi_embed::HashEmbedder;
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

    fn corpus(texts: &[&str]) -> Arc<Corpus> {
        let meta = Metadata::new("lecture.pdf", SourceType::Pdf);
        Arc::new(Corpus::new(texts.iter().map(|t| Chunk::new(*t, meta.clone())).collect()))
    }

    struct Counting {
        inner: HashEmbedder,
        calls: AtomicUsize,
        texts: AtomicUsize,
    }

    impl Embedder for Counting {
        fn model_id(&self) -> &str { self.inner.model_id() }
        fn dim(&self) -> usize { self.inner.dim() }
        fn max_len(&self) -> usize { self.inner.max_len() }
        fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
            self.calls.fetch_add(1, AtomicOrdering::SeqCst);
            self.texts.fetch_add(texts.len(), AtomicOrdering::SeqCst);
            self.inner.embed_batch(texts)
        }
    }

    #[tokio::test]
    async fn batches_and_reuses_cached_vectors() {
        let embedder = Arc::new(Counting { inner: HashEmbedder::new(64), calls: AtomicUsize::new(0), texts: AtomicUsize::new(0) });
        let cache = EmbeddingCache::new();
        let options = DenseOptions { batch_size: 2, ..Default::default() };
        let texts = ["a b", "c d", "e f", "g h", "i j"];

        let index = DenseIndex::build(corpus(&texts), embedder.clone(), &cache, options).await.unwrap();
        assert_eq!(index.len(), 5);
        assert_eq!(embedder.calls.load(AtomicOrdering::SeqCst), 3);
        assert_eq!(cache.len(), 5);

        DenseIndex::build(corpus(&texts), embedder.clone(), &cache, options).await.unwrap();
        assert_eq!(embedder.texts.load(AtomicOrdering::SeqCst), 5, "second build is served from cache");
    }

    #[tokio::test]
    async fn nearest_chunk_ranks_first() {
        let index = DenseIndex::build(
            corpus(&["glaciers carve valleys", "enzymes speed up reactions", "rivers erode valleys over time"]),
            Arc::new(HashEmbedder::new(256)),
            &EmbeddingCache::new(),
            DenseOptions::default(),
        )
        .await
        .unwrap();
        let hits = index.query_scored("enzymes reactions", 3).await.unwrap();
        assert_eq!(hits[0].id, 1);
        assert!(hits.windows(2).all(|w| w[0].score >= w[1].score));
        assert_eq!(index.model_id(), "hash:d256");
    }

    #[tokio::test]
    async fn equal_scores_keep_corpus_order() {
        let index = DenseIndex::build(corpus(&["same text", "other", "same text"]), Arc::new(HashEmbedder::new(32)), &EmbeddingCache::new(), DenseOptions::default())
            .await
            .unwrap();
        let ids: Vec<ChunkId> = index.query_scored("same text", 2).await.unwrap().into_iter().map(|h| h.id).collect();
        assert_eq!(ids, vec![0, 2]);
    }

    struct WrongDim;

    impl Embedder for WrongDim {
        fn model_id(&self) -> &str { "broken" }
        fn dim(&self) -> usize { 8 }
        fn max_len(&self) -> usize { 16 }
        fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![0.5; 4]).collect())
        }
    }

    #[tokio::test]
    async fn wrong_dimension_is_an_embedding_failure() {
        let err = DenseIndex::build(corpus(&["x"]), Arc::new(WrongDim), &EmbeddingCache::new(), DenseOptions::default()).await.err().unwrap();
        assert!(matches!(err, Error::ExternalService { stage: Stage::Embedding, .. }));
    }

    /// Every third text is a vector the cosine cannot handle.
    struct Degenerate {
        component: f32,
    }

    impl Embedder for Degenerate {
        fn model_id(&self) -> &str { "degenerate" }
        fn dim(&self) -> usize { 4 }
        fn max_len(&self) -> usize { 16 }
        fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .map(|t| if t.starts_with("bad") || t == "query text" { vec![self.component; 4] } else { vec![0.0; 4] })
                .collect())
        }
    }

    fn mixed_corpus() -> Arc<Corpus> {
        let texts: Vec<String> = (0..200).map(|i| if i % 3 == 0 { format!("bad {i}") } else { format!("ok {i}") }).collect();
        let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
        corpus(&refs)
    }

    #[tokio::test]
    async fn nan_embeddings_are_rejected_at_build() {
        let err = DenseIndex::build(mixed_corpus(), Arc::new(Degenerate { component: f32::NAN }), &EmbeddingCache::new(), DenseOptions::default())
            .await
            .err()
            .unwrap();
        match err {
            Error::ExternalService { stage, message } => {
                assert_eq!(stage, Stage::Embedding);
                assert!(message.contains("non-finite"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn overflowing_similarities_sort_last_without_panicking() {
        // f32::MAX components overflow the norms, so those cosines are NaN
        let index = DenseIndex::build(mixed_corpus(), Arc::new(Degenerate { component: f32::MAX }), &EmbeddingCache::new(), DenseOptions::default())
            .await
            .unwrap();
        let top: Vec<ChunkId> = index.query_scored("query text", 10).await.unwrap().into_iter().map(|h| h.id).collect();
        assert_eq!(top, vec![1, 2, 4, 5, 7, 8, 10, 11, 13, 14]);

        let all = index.query_scored("query text", 200).await.unwrap();
        assert_eq!(all.len(), 200);
        assert!(all[..133].iter().all(|h| h.score == 0.0));
        assert!(all[133..].iter().all(|h| h.score.is_nan() && h.id % 3 == 0));
    }
}
