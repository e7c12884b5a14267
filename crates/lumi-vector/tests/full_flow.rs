use std::sync::Arc;
use std::time::Duration;

use lumi_core::traits::{Embedder, Retriever};
use lumi_core::types::{Chunk, Corpus, Metadata, SourceType};
use lumi_core::{Error, Stage};
use lumi_embed::HashEmbedder;
use lumi_vector::{DenseIndex, DenseOptions, EmbeddingCache};

fn transcript_corpus() -> Arc<Corpus> {
    let meta = Metadata::new("https://youtu.be/abc123", SourceType::Youtube).with("title", "Cell biology");
    let texts = [
        "the mitochondria produce energy for the cell",
        "ribosomes assemble proteins from amino acids",
        "the nucleus stores genetic information",
    ];
    Arc::new(Corpus::new(texts.iter().map(|t| Chunk::new(*t, meta.clone())).collect()))
}

#[tokio::test]
async fn retriever_returns_chunks_with_metadata() {
    let corpus = transcript_corpus();
    let index = DenseIndex::build(corpus.clone(), Arc::new(HashEmbedder::new(384)), &EmbeddingCache::new(), DenseOptions::default())
        .await
        .expect("build");
    let chunks = index.query("ribosomes proteins", 2).await.expect("query");
    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0], corpus.chunks()[1]);
    assert_eq!(chunks[0].metadata.title(), "Cell biology");
    assert!(index.query("anything", 0).await.expect("query").is_empty());
}

#[tokio::test]
async fn empty_corpus_builds_and_answers_nothing() {
    let index = DenseIndex::build(Arc::new(Corpus::default()), Arc::new(HashEmbedder::new(16)), &EmbeddingCache::new(), DenseOptions::default())
        .await
        .expect("build");
    assert!(index.is_empty());
    assert!(index.query("cells", 3).await.expect("query").is_empty());
}

struct Sluggish;

impl Embedder for Sluggish {
    fn model_id(&self) -> &str { "sluggish" }
    fn dim(&self) -> usize { 4 }
    fn max_len(&self) -> usize { 32 }
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        std::thread::sleep(Duration::from_millis(300));
        Ok(texts.iter().map(|_| vec![1.0, 0.0, 0.0, 0.0]).collect())
    }
}

#[tokio::test]
async fn slow_embedder_times_out() {
    let options = DenseOptions { batch_size: 8, timeout: Duration::from_millis(20) };
    let err = DenseIndex::build(transcript_corpus(), Arc::new(Sluggish), &EmbeddingCache::new(), options).await.err().expect("timeout");
    assert!(matches!(err, Error::Timeout { stage: Stage::Embedding, .. }));
}
