use anyhow::{anyhow, Result};
use candle_core::Device;
use candle_transformers::models::bert::BertModel;
use std::path::Path;
use std::time::Instant;
use tokenizers::Tokenizer;

use lumi_core::traits::Embedder;

use crate::device::select_device;
use crate::model_files::{load_weights, read_bert_config};
use crate::pool::masked_mean_l2;
use crate::tokenize::{encode_on_device, load_tokenizer};

/// Sentence embedder over a BERT encoder (e.g. all-MiniLM-L6-v2):
/// mean pooling over unmasked tokens, L2 normalized.
pub struct BertEmbedder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    id: String,
    dim: usize,
    max_len: usize,
}

impl BertEmbedder {
    pub fn load(model_dir: &Path, max_len: usize) -> Result<Self> {
        let device = select_device();
        tracing::info!(dir = %model_dir.display(), "loading embedding model");
        let tokenizer = load_tokenizer(model_dir, max_len)?;
        let (config, dim) = read_bert_config(model_dir)?;
        let vb = load_weights(model_dir, &device)?;
        let model = BertModel::load(vb, &config)?;
        let name = model_dir.file_name().map_or_else(|| "bert".to_string(), |n| n.to_string_lossy().to_string());
        let id = format!("bert:{name}:d{dim}");
        tracing::info!(model = %id, "embedding model loaded");
        Ok(Self { model, tokenizer, device, id, dim, max_len })
    }

    fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        let start = Instant::now();
        let enc = encode_on_device(&self.tokenizer, text, &self.device)?;
        let hidden = self.model.forward(&enc.input_ids, &enc.token_type_ids, Some(&enc.attention_mask))?;
        let pooled = masked_mean_l2(&hidden, &enc.attention_mask)?;
        let vector: Vec<f32> = pooled.squeeze(0)?.to_vec1()?;
        if vector.len() != self.dim {
            return Err(anyhow!("embedding has {} dims, model reports {}", vector.len(), self.dim));
        }
        if start.elapsed().as_millis() > 100 { tracing::debug!(elapsed_ms = start.elapsed().as_millis() as u64, "slow embedding"); }
        Ok(vector)
    }
}

impl Embedder for BertEmbedder {
    fn model_id(&self) -> &str { &self.id }
    fn dim(&self) -> usize { self.dim }
    fn max_len(&self) -> usize { self.max_len }
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed_one(t)).collect()
    }
}
