use std::{
    collections::HashMap,
    hash::{Hash, Hasher},
    path::Path,
    sync::{Arc, Mutex},
};

use ahash::AHasher;
use anyhow::{Context, Result, anyhow};
use common::EmbeddingProvider;
use ort::{session::Session, value::Tensor};
use tokenizers::{EncodeInput, Tokenizer};

use crate::config::EmbedderConfig;

/// Local embedding provider: an all-MiniLM-class ONNX model with mean
/// pooling. Deterministic for a fixed model file, which is what the
/// retrieval core requires of its Embedding Provider collaborator.
pub struct EmbeddingEngine {
    config: EmbedderConfig,
    backend: Backend,
}

enum Backend {
    Onnx(OnnxSession),
    Pseudo,
    Unavailable(String),
}

struct OnnxSession {
    session: Mutex<Session>,
    tokenizer: Option<Arc<Tokenizer>>,
}

struct TokenBatch {
    input_ids: Vec<i64>,
    attention_mask: Vec<i64>,
    rows: usize,
    seq_len: usize,
}

impl EmbeddingEngine {
    pub fn new(config: EmbedderConfig) -> Self {
        let backend = match open_backend(&config) {
            Ok(backend) => backend,
            Err(err) => {
                tracing::warn!(error = %err, "embedding backend unavailable");
                Backend::Unavailable(err.to_string())
            }
        };
        Self { config, backend }
    }

    pub fn vector_dim(&self) -> usize {
        self.config.vector_dim
    }

    pub fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        match &self.backend {
            Backend::Onnx(session) => session.embed(texts, &self.config),
            Backend::Pseudo => Ok(texts
                .iter()
                .map(|text| pseudo_embed(text, self.config.vector_dim))
                .collect()),
            Backend::Unavailable(msg) => Err(anyhow!(
                "embedding unavailable: {msg}. set SCHOLARSEEK_ALLOW_PSEUDO_EMBED=true only for local test scaffolding"
            )),
        }
    }
}

impl EmbeddingProvider for EmbeddingEngine {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_texts(std::slice::from_ref(&text.to_string()))?;
        vectors
            .pop()
            .ok_or_else(|| anyhow!("embedding model returned no vector"))
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.embed_texts(texts)
    }
}

impl OnnxSession {
    fn embed(&self, texts: &[String], cfg: &EmbedderConfig) -> Result<Vec<Vec<f32>>> {
        let batch = tokenize(texts, cfg, self.tokenizer.as_ref())?;
        let mut session = self
            .session
            .lock()
            .map_err(|_| anyhow!("embedding session lock poisoned"))?;

        let shape = vec![batch.rows as i64, batch.seq_len as i64];
        let ids_tensor = Tensor::<i64>::from_array((shape.clone(), batch.input_ids.clone()))?;
        let mask_tensor = Tensor::<i64>::from_array((shape.clone(), batch.attention_mask.clone()))?;
        let type_tensor =
            Tensor::<i64>::from_array((shape, vec![0i64; batch.rows * batch.seq_len]))?;

        let mut model_inputs = HashMap::new();
        for input in session.inputs() {
            let name = input.name().to_lowercase();
            let value = if name.contains("attention") && name.contains("mask") {
                mask_tensor.clone().upcast()
            } else if name.contains("token_type") {
                type_tensor.clone().upcast()
            } else {
                ids_tensor.clone().upcast()
            };
            model_inputs.insert(input.name().to_string(), value);
        }

        let mut outputs = session.run(model_inputs)?;
        let first_key = outputs
            .keys()
            .next()
            .map(str::to_string)
            .ok_or_else(|| anyhow!("embedding model returned no outputs"))?;
        let output = outputs
            .remove(first_key)
            .ok_or_else(|| anyhow!("embedding model output extraction failed"))?;
        let (out_shape, values) = output
            .try_extract_tensor::<f32>()
            .map_err(|err| anyhow!("embedding output decode failed: {err}"))?;

        pool_output(out_shape, values, &batch, cfg.vector_dim)
    }
}

/// Mean-pools the model output into one vector per input row. Accepts both
/// already-pooled rank-2 output and token-level rank-3 output.
fn pool_output(
    shape: &[i64],
    values: &[f32],
    batch: &TokenBatch,
    target_dim: usize,
) -> Result<Vec<Vec<f32>>> {
    if shape.len() < 2 || shape[0] <= 0 {
        return Err(anyhow!("embedding output shape {shape:?} is unsupported"));
    }
    let hidden = usize::try_from(shape[shape.len() - 1]).unwrap_or(0);
    if hidden == 0 {
        return Err(anyhow!("embedding output hidden dimension is invalid"));
    }

    if shape.len() == 2 {
        if values.len() < batch.rows * hidden {
            return Err(anyhow!(
                "embedding output tensor too small for expected shape {}x{hidden}",
                batch.rows
            ));
        }
        let out = (0..batch.rows)
            .map(|row| fit_dim(&values[row * hidden..(row + 1) * hidden], target_dim))
            .collect();
        return Ok(out);
    }

    let model_seq_len = usize::try_from(shape[shape.len() - 2]).unwrap_or(batch.seq_len);
    if values.len() < batch.rows * model_seq_len * hidden {
        return Err(anyhow!("embedding output tensor too small for pooling"));
    }

    let mut out = Vec::with_capacity(batch.rows);
    for row in 0..batch.rows {
        let mut pooled = vec![0.0f32; hidden];
        let mut active = 0.0f32;
        for token in 0..model_seq_len {
            let mask_index = row * batch.seq_len + token.min(batch.seq_len.saturating_sub(1));
            if batch.attention_mask.get(mask_index).copied().unwrap_or(0) == 0 {
                continue;
            }
            active += 1.0;
            let base = (row * model_seq_len + token) * hidden;
            for (slot, value) in pooled.iter_mut().zip(&values[base..base + hidden]) {
                *slot += value;
            }
        }
        if active > 0.0 {
            for value in &mut pooled {
                *value /= active;
            }
        }
        out.push(fit_dim(&pooled, target_dim));
    }
    Ok(out)
}

fn fit_dim(values: &[f32], target_dim: usize) -> Vec<f32> {
    if target_dim == 0 {
        return Vec::new();
    }
    if values.len() >= target_dim {
        return values[..target_dim].to_vec();
    }
    let mut out = vec![0.0f32; target_dim];
    out[..values.len()].copy_from_slice(values);
    out
}

fn open_backend(config: &EmbedderConfig) -> Result<Backend> {
    if config.allow_pseudo_fallback {
        return Ok(Backend::Pseudo);
    }
    let model_path = Path::new(&config.model_path);
    if !model_path.exists() {
        return Err(anyhow!(
            "embedding model not found at {}",
            model_path.display()
        ));
    }

    let session = Session::builder()
        .context("failed to create ONNX session builder")?
        .commit_from_file(model_path)
        .with_context(|| format!("failed to load ONNX model {}", model_path.display()))?;
    let tokenizer = match config.tokenizer_path.as_ref() {
        Some(path) => Some(Arc::new(Tokenizer::from_file(path).map_err(|err| {
            anyhow!("failed loading tokenizer from {path}: {err}")
        })?)),
        None => None,
    };

    Ok(Backend::Onnx(OnnxSession {
        session: Mutex::new(session),
        tokenizer,
    }))
}

fn tokenize(
    texts: &[String],
    config: &EmbedderConfig,
    tokenizer: Option<&Arc<Tokenizer>>,
) -> Result<TokenBatch> {
    let seq_len = config.max_sequence_length.max(1);
    let mut input_ids = vec![0i64; texts.len() * seq_len];
    let mut attention_mask = vec![0i64; texts.len() * seq_len];

    if let Some(tokenizer) = tokenizer {
        let inputs = texts
            .iter()
            .map(|text| EncodeInput::Single(text.as_str().into()))
            .collect::<Vec<_>>();
        let encodings = tokenizer
            .encode_batch(inputs, true)
            .map_err(|err| anyhow!("tokenization failed: {err}"))?;
        for (row, encoding) in encodings.iter().enumerate() {
            for (col, token_id) in encoding.get_ids().iter().take(seq_len).enumerate() {
                input_ids[row * seq_len + col] = i64::from(*token_id);
                attention_mask[row * seq_len + col] = 1;
            }
        }
    } else {
        // Byte-level fallback when no tokenizer file ships with the model.
        for (row, text) in texts.iter().enumerate() {
            for (col, byte) in text.as_bytes().iter().take(seq_len).enumerate() {
                input_ids[row * seq_len + col] = i64::from(*byte) + 1;
                attention_mask[row * seq_len + col] = 1;
            }
        }
    }

    Ok(TokenBatch {
        input_ids,
        attention_mask,
        rows: texts.len(),
        seq_len,
    })
}

/// Hash-bucket bag-of-words vector. Deterministic, so fusion and re-ranking
/// tests get stable rankings without a model file.
fn pseudo_embed(text: &str, dim: usize) -> Vec<f32> {
    let mut out = vec![0.0f32; dim.max(1)];
    let buckets = out.len();
    for token in text.split_whitespace() {
        let mut hasher = AHasher::default();
        token.to_ascii_lowercase().hash(&mut hasher);
        out[(hasher.finish() as usize) % buckets] += 1.0;
    }
    out
}
