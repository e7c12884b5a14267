use anyhow::{anyhow, Result};
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::Config as BertConfig;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use lumi_core::config::expand_path;

/// Expand `~`/`${VAR}` and check the directory exists.
pub fn resolve_model_dir(dir: &str) -> Result<PathBuf> {
    let path = expand_path(dir);
    if !path.is_dir() {
        return Err(anyhow!("Model directory not found: {}", path.display()));
    }
    Ok(path)
}

/// Parsed `config.json` plus its `hidden_size`.
pub fn read_bert_config(model_dir: &Path) -> Result<(BertConfig, usize)> {
    let config_path = model_dir.join("config.json");
    let raw = std::fs::read_to_string(&config_path).map_err(|e| anyhow!("Failed to read {}: {}", config_path.display(), e))?;
    let config: BertConfig = serde_json::from_str(&raw)?;
    let value: serde_json::Value = serde_json::from_str(&raw)?;
    let hidden = value
        .get("hidden_size")
        .and_then(serde_json::Value::as_u64)
        .ok_or_else(|| anyhow!("{} has no hidden_size", config_path.display()))?;
    Ok((config, usize::try_from(hidden)?))
}

/// Weights from `model.safetensors`, falling back to `pytorch_model.bin`.
pub fn load_weights(model_dir: &Path, device: &Device) -> Result<VarBuilder<'static>> {
    let safetensors = model_dir.join("model.safetensors");
    if safetensors.exists() {
        // SAFETY: the weights file is mapped read-only and not modified while the model lives.
        let vb = unsafe { VarBuilder::from_mmaped_safetensors(&[safetensors], DType::F32, device)? };
        return Ok(vb);
    }
    let weights_path = model_dir.join("pytorch_model.bin");
    if weights_path.exists() {
        let weights = candle_core::pickle::read_all(&weights_path)?;
        let weights_map: HashMap<String, Tensor> = weights.into_iter().collect();
        return Ok(VarBuilder::from_tensors(weights_map, DType::F32, device));
    }
    Err(anyhow!("No model.safetensors or pytorch_model.bin in {}", model_dir.display()))
}
