use std::hash::{Hash, Hasher};
use twox_hash::XxHash64;

use lumi_core::traits::Embedder;

/// Model-free embedder: each normalized token is hashed into a bucket.
///
/// Texts sharing words get similar vectors, which is enough for tests and
/// for running without downloaded weights.
pub struct HashEmbedder {
    dim: usize,
    id: String,
}

impl HashEmbedder {
    pub fn new(dim: usize) -> Self {
        let dim = dim.max(1);
        Self { dim, id: format!("hash:d{dim}") }
    }

    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dim];
        for (i, token) in normalized_tokens(text).enumerate() {
            let mut hasher = XxHash64::with_seed(0);
            token.hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h as usize) % self.dim;
            let val = (((h >> 32) as u32) as f32) / (u32::MAX as f32);
            v[idx] += 0.5 + val + (i as f32 % 3.0) * 0.01;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut v { *x /= norm; }
        }
        v
    }
}

fn normalized_tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split_whitespace()
        .map(|w| w.chars().filter(|c| c.is_alphanumeric()).flat_map(char::to_lowercase).collect::<String>())
        .filter(|w| !w.is_empty())
}

impl Embedder for HashEmbedder {
    fn model_id(&self) -> &str { &self.id }
    fn dim(&self) -> usize { self.dim }
    fn max_len(&self) -> usize { usize::MAX }
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::cosine_similarity;

    #[test]
    fn punctuation_and_case_are_ignored() {
        let e = HashEmbedder::new(64);
        assert_eq!(e.embed_text("Photosynthesis, light!"), e.embed_text("photosynthesis light"));
    }

    #[test]
    fn shared_words_score_higher_than_unrelated_text() {
        let e = HashEmbedder::new(384);
        let q = e.embed_text("cell membrane transport");
        let near = e.embed_text("transport across the cell membrane");
        let far = e.embed_text("medieval trade routes in europe");
        assert!(cosine_similarity(&q, &near) > cosine_similarity(&q, &far));
    }

    #[test]
    fn blank_text_is_the_zero_vector() {
        let e = HashEmbedder::new(8);
        assert!(e.embed_text("  ...  ").iter().all(|x| *x == 0.0));
    }
}
