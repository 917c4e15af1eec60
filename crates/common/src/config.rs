use std::{fs, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    pub corpus_path: String,
    pub model_path: String,
    /// RRF smoothing constant.
    pub rrf_k: usize,
    /// Lower and upper clamp for the adaptive result-set size.
    pub min_results: usize,
    pub max_results: usize,
    /// Global cap on supporting sentences across the retained papers.
    pub sentence_top_n: usize,
    pub expansion_endpoint: String,
    pub expansion_model: String,
    pub expansion_timeout_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            corpus_path: "data/corpus.json".to_string(),
            model_path: "models/all-minilm-l6-v2.onnx".to_string(),
            rrf_k: 60,
            min_results: 2,
            max_results: 10,
            sentence_top_n: 5,
            expansion_endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
            expansion_model: "gpt-4o-mini".to_string(),
            expansion_timeout_ms: 8_000,
        }
    }
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let mut cfg = if path.exists() {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("failed reading config file: {}", path.display()))?;
            toml::from_str::<Self>(&raw)
                .with_context(|| format!("failed parsing config file: {}", path.display()))?
        } else {
            Self::default()
        };

        if let Ok(corpus) = std::env::var("SCHOLARSEEK_CORPUS_PATH") {
            cfg.corpus_path = corpus;
        }
        if let Ok(model) = std::env::var("SCHOLARSEEK_MODEL_PATH") {
            cfg.model_path = model;
        }
        if let Ok(rrf_k) = std::env::var("SCHOLARSEEK_RRF_K") {
            cfg.rrf_k = rrf_k.parse().unwrap_or(cfg.rrf_k);
        }
        if let Ok(endpoint) = std::env::var("SCHOLARSEEK_EXPANSION_ENDPOINT") {
            cfg.expansion_endpoint = endpoint;
        }
        if let Ok(model) = std::env::var("SCHOLARSEEK_EXPANSION_MODEL") {
            cfg.expansion_model = model;
        }
        if let Ok(timeout) = std::env::var("SCHOLARSEEK_EXPANSION_TIMEOUT_MS") {
            cfg.expansion_timeout_ms = timeout.parse().unwrap_or(cfg.expansion_timeout_ms);
        }

        Ok(cfg)
    }
}
