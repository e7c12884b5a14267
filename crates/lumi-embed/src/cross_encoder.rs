use anyhow::{anyhow, Result};
use candle_core::{Device, IndexOp};
use candle_nn::{Linear, Module};
use candle_transformers::models::bert::BertModel;
use std::path::Path;
use tokenizers::Tokenizer;

use lumi_core::traits::RelevanceScorer;

use crate::device::select_device;
use crate::model_files::{load_weights, read_bert_config};
use crate::tokenize::{encode_on_device, load_tokenizer};

/// BERT sequence classifier scoring (query, passage) pairs, e.g.
/// `cross-encoder/ms-marco-MiniLM-L-6-v2`. The score is the raw logit.
pub struct CrossEncoder {
    bert: BertModel,
    pooler: Linear,
    classifier: Linear,
    tokenizer: Tokenizer,
    device: Device,
    id: String,
}

impl CrossEncoder {
    pub fn load(model_dir: &Path, max_len: usize) -> Result<Self> {
        let device = select_device();
        tracing::info!(dir = %model_dir.display(), "loading cross-encoder");
        let tokenizer = load_tokenizer(model_dir, max_len)?;
        let (config, hidden) = read_bert_config(model_dir)?;
        let vb = load_weights(model_dir, &device)?;
        let bert = BertModel::load(vb.pp("bert"), &config)?;
        let pooler = candle_nn::linear(hidden, hidden, vb.pp("bert.pooler.dense"))?;
        let classifier = candle_nn::linear(hidden, 1, vb.pp("classifier"))?;
        let name = model_dir.file_name().map_or_else(|| "cross-encoder".to_string(), |n| n.to_string_lossy().to_string());
        Ok(Self { bert, pooler, classifier, tokenizer, device, id: format!("cross:{name}") })
    }

    fn score_pair(&self, query: &str, passage: &str) -> Result<f32> {
        let enc = encode_on_device(&self.tokenizer, (query, passage), &self.device)?;
        let hidden = self.bert.forward(&enc.input_ids, &enc.token_type_ids, Some(&enc.attention_mask))?;
        let cls = hidden.i((.., 0))?;
        let pooled = self.pooler.forward(&cls)?.tanh()?;
        let logits = self.classifier.forward(&pooled)?;
        let values: Vec<f32> = logits.flatten_all()?.to_vec1()?;
        values.first().copied().ok_or_else(|| anyhow!("classifier returned no logit"))
    }
}

impl RelevanceScorer for CrossEncoder {
    fn model_id(&self) -> &str { &self.id }

    fn score(&self, query: &str, passages: &[String]) -> Result<Vec<f32>> {
        passages.iter().map(|p| self.score_pair(query, p)).collect()
    }
}
