use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Duration;

use lumi_core::bounded::run_bounded;
use lumi_core::error::{Error, Result, Stage};
use lumi_core::traits::RelevanceScorer;
use lumi_core::types::Chunk;

/// Second pass over a merged candidate set.
pub struct Reranker {
    scorer: Arc<dyn RelevanceScorer>,
    timeout: Duration,
}

impl Reranker {
    pub fn new(scorer: Arc<dyn RelevanceScorer>, timeout: Duration) -> Self {
        Self { scorer, timeout }
    }

    pub fn model_id(&self) -> &str { self.scorer.model_id() }

    /// Candidates sorted by descending score, keeping input order among equal
    /// scores; NaN scores go last. At most `top_n` are returned.
    pub async fn rerank(&self, query: &str, candidates: Vec<Chunk>, top_n: usize) -> Result<Vec<Chunk>> {
        if candidates.is_empty() || top_n == 0 {
            return Ok(Vec::new());
        }
        let passages: Vec<String> = candidates.iter().map(|c| c.content.clone()).collect();
        let scorer = Arc::clone(&self.scorer);
        let q = query.to_string();
        let scores = run_bounded(Stage::Reranking, self.timeout, move || scorer.score(&q, &passages)).await?;
        if scores.len() != candidates.len() {
            return Err(Error::external(
                Stage::Reranking,
                format!("scorer returned {} scores for {} candidates", scores.len(), candidates.len()),
            ));
        }

        let mut scored: Vec<(f32, Chunk)> = scores.into_iter().zip(candidates).collect();
        scored.sort_by(|a, b| descending_nan_last(a.0, b.0));
        tracing::debug!(candidates = scored.len(), top_n, model = self.scorer.model_id(), "reranked");
        Ok(scored.into_iter().take(top_n).map(|(_, chunk)| chunk).collect())
    }
}

fn descending_nan_last(a: f32, b: f32) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
    }
}
