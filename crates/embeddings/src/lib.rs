pub mod config;
pub mod engine;

pub use config::EmbedderConfig;
pub use engine::EmbeddingEngine;
