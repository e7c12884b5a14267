//! Embedding and relevance models: BERT-family encoders on candle, a
//! cross-encoder for reranking, and model-free fallbacks.

use anyhow::Result;
use std::sync::Arc;

use lumi_core::config::{EmbeddingSettings, RerankerSettings};
use lumi_core::traits::{Embedder, RelevanceScorer};

mod bert;
mod cross_encoder;
mod device;
mod hash;
mod model_files;
mod pool;
mod similarity;
mod tokenize;

pub use bert::BertEmbedder;
pub use cross_encoder::CrossEncoder;
pub use device::select_device;
pub use hash::HashEmbedder;
pub use pool::{cosine_similarity, masked_mean_l2};
pub use similarity::EmbeddingSimilarityScorer;

/// `APP_USE_FAKE_EMBEDDINGS=1` forces the hashing embedder.
fn fake_requested() -> bool {
    std::env::var("APP_USE_FAKE_EMBEDDINGS").ok().map(|v| v == "1" || v.eq_ignore_ascii_case("true")).unwrap_or(false)
}

/// Embedder for the given settings. Without a model directory (or when fakes
/// are requested) the hashing embedder of `settings.dim` is returned.
pub fn get_default_embedder(settings: &EmbeddingSettings) -> Result<Arc<dyn Embedder>> {
    match &settings.model_dir {
        Some(dir) if !settings.use_fake && !fake_requested() => {
            let dir = model_files::resolve_model_dir(dir)?;
            Ok(Arc::new(BertEmbedder::load(&dir, settings.max_len)?))
        }
        _ => {
            tracing::info!(dim = settings.dim, "using hash embedder");
            Ok(Arc::new(HashEmbedder::new(settings.dim)))
        }
    }
}

/// Cross-encoder when configured, else cosine over `embedder`.
pub fn build_scorer(settings: &RerankerSettings, embedder: Arc<dyn Embedder>) -> Result<Arc<dyn RelevanceScorer>> {
    match &settings.model_dir {
        Some(dir) => {
            let dir = model_files::resolve_model_dir(dir)?;
            Ok(Arc::new(CrossEncoder::load(&dir, settings.max_len)?))
        }
        None => {
            tracing::info!(embedder = embedder.model_id(), "reranking with embedding similarity");
            Ok(Arc::new(EmbeddingSimilarityScorer::new(embedder)))
        }
    }
}
