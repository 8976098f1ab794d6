use anyhow::{anyhow, Result};
use candle_core::{Device, Tensor};
use tokenizers::{Tokenizer, TruncationParams};

/// Load `tokenizer.json` with truncation at `max_len` and padding disabled.
///
/// Truncation is done by the tokenizer so the trailing `[SEP]` survives.
pub fn load_tokenizer(path: &std::path::Path, max_len: usize) -> Result<Tokenizer> {
    let mut tokenizer = Tokenizer::from_file(path)
        .map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", path.display(), e))?;
    tokenizer
        .with_truncation(Some(TruncationParams { max_length: max_len, ..Default::default() }))
        .map_err(|e| anyhow!("Failed to configure truncation: {}", e))?;
    tokenizer.with_padding(None);
    Ok(tokenizer)
}

/// Tokenize a single text into `[1, T]` tensors: (input_ids, token_type_ids, attention_mask).
pub fn tokenize_on_device(tokenizer: &Tokenizer, text: &str, device: &Device) -> Result<(Tensor, Tensor, Tensor)> {
    let enc = tokenizer.encode(text, true).map_err(|e| anyhow!("Tokenization failed: {}", e))?;
    let len = enc.get_ids().len();
    let input_ids = Tensor::new(enc.get_ids(), device)?.reshape((1, len))?;
    let type_ids = Tensor::new(enc.get_type_ids(), device)?.reshape((1, len))?;
    let attention_mask = Tensor::new(enc.get_attention_mask(), device)?.reshape((1, len))?;
    Ok((input_ids, type_ids, attention_mask))
}
