use anyhow::{anyhow, Result};
use candle_core::{DType, Tensor};

/// Mean of the unmasked token vectors, L2 normalized. `hidden` is `[B,T,H]`.
///
/// Rows whose mask is all zeros pool to a zero vector.
pub fn masked_mean_l2(hidden: &Tensor, attention_mask: &Tensor) -> Result<Tensor> {
    let (batch, _tokens, hidden_dim) = hidden.dims3().map_err(|e| anyhow!("hidden shape must be [B,T,H]: {e}"))?;
    let dtype = hidden.dtype();

    // [B,T] -> [B,T,1] so it broadcasts over the hidden axis
    let weights = attention_mask.to_device(hidden.device())?.to_dtype(dtype)?;
    let totals = hidden.broadcast_mul(&weights.unsqueeze(2)?)?.sum(1)?;
    let counts = weights.sum_keepdim(1)?.clamp(1.0, f64::MAX)?;
    let pooled = totals.broadcast_div(&counts)?;

    let floor = if dtype == DType::F16 { 1e-6 } else { 1e-12 };
    let lengths = pooled.sqr()?.sum_keepdim(1)?.sqrt()?.clamp(floor, f64::MAX)?;
    let pooled = pooled.broadcast_div(&lengths)?;
    if pooled.dims() != [batch, hidden_dim].as_slice() {
        return Err(anyhow!("pooled shape {:?}, expected [{batch}, {hidden_dim}]", pooled.dims()));
    }
    Ok(pooled)
}

/// Cosine similarity; 0 when either vector is all zeros or lengths differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() { return 0.0; }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
