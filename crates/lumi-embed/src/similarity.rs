use std::sync::Arc;

use lumi_core::traits::{Embedder, RelevanceScorer};

use crate::pool::cosine_similarity;

/// Reranking fallback used when no cross-encoder is configured: cosine of
/// query and passage embeddings.
pub struct EmbeddingSimilarityScorer {
    embedder: Arc<dyn Embedder>,
    id: String,
}

impl EmbeddingSimilarityScorer {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        let id = format!("cosine:{}", embedder.model_id());
        Self { embedder, id }
    }
}

impl RelevanceScorer for EmbeddingSimilarityScorer {
    fn model_id(&self) -> &str { &self.id }

    fn score(&self, query: &str, passages: &[String]) -> anyhow::Result<Vec<f32>> {
        if passages.is_empty() {
            return Ok(Vec::new());
        }
        let mut q = self.embedder.embed_batch(&[query.to_string()])?;
        let q = q.pop().ok_or_else(|| anyhow::anyhow!("embedder returned no query vector"))?;
        let vectors = self.embedder.embed_batch(passages)?;
        if vectors.len() != passages.len() {
            anyhow::bail!("embedder returned {} vectors for {} passages", vectors.len(), passages.len());
        }
        Ok(vectors.iter().map(|v| cosine_similarity(&q, v)).collect())
    }
}
