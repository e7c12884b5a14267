use anyhow::{anyhow, Result};
use candle_core::{Device, Tensor};
use std::path::Path;
use tokenizers::{EncodeInput, Tokenizer, TruncationParams};

/// Model inputs for a single sequence, each shaped `[1, T]`.
pub struct Encoded {
    pub input_ids: Tensor,
    pub token_type_ids: Tensor,
    pub attention_mask: Tensor,
}

/// Load `tokenizer.json`, truncating to `max_len` tokens and without padding.
pub fn load_tokenizer(model_dir: &Path, max_len: usize) -> Result<Tokenizer> {
    let tokenizer_path = model_dir.join("tokenizer.json");
    let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
        .map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", tokenizer_path.display(), e))?;
    tokenizer
        .with_truncation(Some(TruncationParams { max_length: max_len, ..Default::default() }))
        .map_err(|e| anyhow!("Invalid truncation settings: {}", e))?;
    tokenizer.with_padding(None);
    Ok(tokenizer)
}

pub fn encode_on_device<'s, E>(tokenizer: &Tokenizer, input: E, device: &Device) -> Result<Encoded>
where
    E: Into<EncodeInput<'s>>,
{
    let enc = tokenizer.encode(input, true).map_err(|e| anyhow!("Tokenization failed: {}", e))?;
    let len = enc.get_ids().len();
    if len == 0 { return Err(anyhow!("Tokenization produced no tokens")); }
    let input_ids = Tensor::new(enc.get_ids(), device)?.reshape((1, len))?;
    let token_type_ids = Tensor::new(enc.get_type_ids(), device)?.reshape((1, len))?;
    let attention_mask = Tensor::new(enc.get_attention_mask(), device)?.reshape((1, len))?;
    Ok(Encoded { input_ids, token_type_ids, attention_mask })
}
