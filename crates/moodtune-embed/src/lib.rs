use anyhow::{anyhow, Context, Result};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use tokenizers::Tokenizer;

use moodtune_core::config::ModelSettings;
use moodtune_core::error::Error;
use moodtune_core::traits::Encoder;

pub mod device;
pub mod lazy;
pub mod pool;
pub mod tokenize;

pub use device::select_device;
pub use lazy::LazyEncoder;
pub use pool::masked_mean_l2;
pub use tokenize::{load_tokenizer, tokenize_on_device};

const SLOW_ENCODE: Duration = Duration::from_millis(100);

/// Sentence encoder over a local BERT checkpoint (all-MiniLM-L6-v2 layout).
///
/// The model directory must hold `config.json`, `tokenizer.json` and either
/// `model.safetensors` or `pytorch_model.bin`.
pub struct BertEncoder { model: BertModel, tokenizer: Tokenizer, device: Device, dim: usize }

impl BertEncoder {
    pub fn load(model_dir: &Path, max_len: usize) -> Result<Self> {
        let device = select_device();
        tracing::info!(dir = %model_dir.display(), "loading sentence encoder");

        let config_path = model_dir.join("config.json");
        let raw: serde_json::Value = serde_json::from_str(
            &std::fs::read_to_string(&config_path).with_context(|| format!("reading {}", config_path.display()))?,
        )?;
        let dim = raw
            .get("hidden_size")
            .and_then(serde_json::Value::as_u64)
            .ok_or_else(|| anyhow!("{} has no hidden_size", config_path.display()))? as usize;
        let max_len = match raw.get("max_position_embeddings").and_then(serde_json::Value::as_u64) {
            Some(limit) => effective_max_len(max_len, limit as usize),
            None => max_len,
        };
        let config: BertConfig = serde_json::from_value(raw)?;
        let tokenizer = load_tokenizer(&model_dir.join("tokenizer.json"), max_len)?;

        let weights = load_weights(model_dir, &device)?;
        let vb = VarBuilder::from_tensors(weights, DType::F32, &device);
        let model = BertModel::load(vb, &config)?;
        tracing::info!(dim, max_len, "sentence encoder ready");
        Ok(Self { model, tokenizer, device, dim })
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let start = Instant::now();
        let (input_ids, type_ids, attention_mask) = tokenize_on_device(&self.tokenizer, text, &self.device)?;
        let hidden = self.model.forward(&input_ids, &type_ids, Some(&attention_mask))?;
        let pooled = masked_mean_l2(&hidden, &attention_mask)?;
        let emb = pooled.to_device(&Device::Cpu)?.squeeze(0)?.to_vec1::<f32>()?;
        if emb.len() != self.dim { return Err(anyhow!("model produced {} values, expected {}", emb.len(), self.dim)); }
        let elapsed = start.elapsed();
        if elapsed > SLOW_ENCODE { tracing::warn!(?elapsed, "slow encode"); }
        Ok(emb)
    }
}

impl Encoder for BertEncoder {
    fn dim(&self) -> usize { self.dim }
    fn encode(&self, text: &str) -> moodtune_core::Result<Vec<f32>> {
        if text.trim().is_empty() { return Err(Error::Encoding("empty input".into())); }
        self.embed(text).map_err(|e| Error::Encoding(format!("{e:#}")))
    }
}

/// Longest token sequence the checkpoint can embed, capped at its position table.
fn effective_max_len(requested: usize, position_limit: usize) -> usize {
    if requested > position_limit {
        tracing::warn!(requested, position_limit, "max_len exceeds the model's position embeddings, clamping");
        position_limit
    } else {
        requested
    }
}

fn load_weights(model_dir: &Path, device: &Device) -> Result<HashMap<String, Tensor>> {
    let safetensors = model_dir.join("model.safetensors");
    if safetensors.exists() {
        tracing::debug!(path = %safetensors.display(), "reading safetensors weights");
        return Ok(candle_core::safetensors::load(&safetensors, device)?);
    }
    let pth = model_dir.join("pytorch_model.bin");
    if pth.exists() {
        tracing::debug!(path = %pth.display(), "reading pytorch weights");
        return Ok(candle_core::pickle::read_all(&pth)?.into_iter().collect());
    }
    Err(anyhow!("No model.safetensors or pytorch_model.bin in {}", model_dir.display()))
}

/// Deterministic token-hash encoder for tests and offline development.
///
/// Each whitespace token is hashed into one bucket; the result is L2-normalized.
/// Texts sharing tokens therefore score higher than unrelated texts.
pub struct HashingEncoder { dim: usize }

impl HashingEncoder { pub fn new(dim: usize) -> Self { Self { dim } } }

impl Encoder for HashingEncoder {
    fn dim(&self) -> usize { self.dim }
    fn encode(&self, text: &str) -> moodtune_core::Result<Vec<f32>> {
        use std::hash::{Hash, Hasher}; use twox_hash::XxHash64;
        if text.trim().is_empty() { return Err(Error::Encoding("empty input".into())); }
        if self.dim == 0 { return Err(Error::Encoding("zero-dimensional encoder".into())); }
        let mut v = vec![0f32; self.dim];
        for (i, token) in text.split_whitespace().enumerate() {
            let mut hasher = XxHash64::with_seed(0);
            token.to_lowercase().hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h as usize) % self.dim;
            let val = (((h >> 32) as u32) as f32) / (u32::MAX as f32);
            v[idx] += 0.5 + val + (i as f32 % 3.0) * 0.01;
        }
        let norm = (v.iter().map(|x| x * x).sum::<f32>()).sqrt().max(1e-6);
        for x in &mut v { *x /= norm; }
        Ok(v)
    }
}

/// Which encoder a set of model settings selects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncoderKind {
    /// Token-hash fake; no model files needed.
    Hashing,
    /// BERT checkpoint under the configured directory.
    Bert(PathBuf),
}

impl EncoderKind {
    /// `model.fake = true` or `APP_USE_FAKE_EMBEDDINGS=1|true` selects [`EncoderKind::Hashing`].
    pub fn from_settings(settings: &ModelSettings) -> Self {
        let env_fake = std::env::var("APP_USE_FAKE_EMBEDDINGS")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        Self::select(settings, env_fake)
    }

    pub fn select(settings: &ModelSettings, env_fake: bool) -> Self {
        if settings.fake || env_fake { Self::Hashing } else { Self::Bert(settings.dir.clone()) }
    }
}

impl fmt::Display for EncoderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hashing => write!(f, "hashing (fake)"),
            Self::Bert(dir) => write!(f, "bert ({})", dir.display()),
        }
    }
}

/// Encoder described by `settings`, initialized on first use.
///
/// See [`EncoderKind::from_settings`] for how the fake encoder is chosen.
pub fn default_encoder(settings: &ModelSettings) -> LazyEncoder {
    encoder_for(EncoderKind::from_settings(settings), settings)
}

pub fn encoder_for(kind: EncoderKind, settings: &ModelSettings) -> LazyEncoder {
    let dim = settings.dim;
    match kind {
        EncoderKind::Hashing => {
            tracing::info!(dim, "using hashing encoder");
            LazyEncoder::new(dim, move || Ok(Box::new(HashingEncoder::new(dim)) as Box<dyn Encoder>))
        }
        EncoderKind::Bert(model_dir) => {
            let max_len = settings.max_len;
            LazyEncoder::new(dim, move || {
                let dir = resolve_model_dir(&model_dir)?;
                Ok(Box::new(BertEncoder::load(&dir, max_len)?) as Box<dyn Encoder>)
            })
        }
    }
}

fn resolve_model_dir(configured: &Path) -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("APP_MODEL_DIR") { let p = PathBuf::from(&dir); if p.exists() { tracing::debug!(dir = %p.display(), "using APP_MODEL_DIR"); return Ok(p); } }
    if configured.exists() { return Ok(configured.to_path_buf()); }
    let legacy = Path::new("../models/all-MiniLM-L6-v2"); if legacy.exists() { tracing::debug!(dir = %legacy.display(), "using sibling model dir"); return Ok(legacy.to_path_buf()); }
    Err(anyhow!("Could not locate model directory {}", configured.display()))
}
