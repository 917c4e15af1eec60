#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbedderConfig {
    pub model_path: String,
    pub tokenizer_path: Option<String>,
    pub vector_dim: usize,
    pub max_sequence_length: usize,
    /// Deterministic hash-bucket vectors instead of a real model. Test
    /// scaffolding only.
    pub allow_pseudo_fallback: bool,
}

impl Default for EmbedderConfig {
    fn default() -> Self {
        let model_path = std::env::var("SCHOLARSEEK_MODEL_PATH")
            .unwrap_or_else(|_| "models/all-minilm-l6-v2.onnx".to_string());
        let tokenizer_path = std::env::var("SCHOLARSEEK_TOKENIZER_PATH").ok().or_else(|| {
            let candidate = std::path::Path::new(&model_path).with_extension("tokenizer.json");
            if candidate.exists() {
                Some(candidate.display().to_string())
            } else {
                None
            }
        });
        Self {
            model_path,
            tokenizer_path,
            vector_dim: 384,
            max_sequence_length: 256,
            allow_pseudo_fallback: std::env::var("SCHOLARSEEK_ALLOW_PSEUDO_EMBED")
                .map(|v| v.eq_ignore_ascii_case("true"))
                .unwrap_or(cfg!(test)),
        }
    }
}
