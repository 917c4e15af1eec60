pub mod config;
pub mod error;

use std::sync::Arc;

use schemars::JsonSchema;
use schemars::Schema;
use serde::{Deserialize, Serialize};

pub use error::RetrievalError;

/// One corpus entry: a paper abstract together with its precomputed
/// embedding. Never mutated during a retrieval call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaperDoc {
    pub paper_id: u64,
    pub title: String,
    pub author_name: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub embedding: Vec<f32>,
}

/// Read-only, versioned view of the corpus. The ingestion side publishes a
/// whole new snapshot instead of mutating in place, so concurrent retrieval
/// calls can share one snapshot without locking.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CorpusSnapshot {
    pub version: u64,
    pub docs: Vec<PaperDoc>,
}

impl CorpusSnapshot {
    pub fn new(version: u64, docs: Vec<PaperDoc>) -> Self {
        Self { version, docs }
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }
}

/// One ranked paper in the final evidence set, shaped for the service layer.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct RankedPaper {
    pub paper_id: u64,
    pub title: String,
    pub author_name: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub score: f32,
    pub sentences: Vec<String>,
}

/// Final output of one retrieval call: the retained papers in relevance
/// order, each annotated with its most query-relevant sentences.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct EvidenceSet {
    pub papers: Vec<RankedPaper>,
}

/// Maps text to a fixed-length vector. Must be deterministic for a fixed
/// model version; dimensionality must match the corpus embeddings.
pub trait EmbeddingProvider: Send + Sync {
    fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>>;
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;
}

/// Produces related query phrasings for one input query. Expected to return
/// 4-6 variants but may return fewer or none; failures are absorbed by the
/// retrieval orchestrator, never surfaced to callers.
pub trait QueryExpander: Send + Sync {
    fn expand(
        &self,
        query: &str,
    ) -> impl std::future::Future<Output = anyhow::Result<Vec<String>>> + Send;
}

/// Splits text into an ordered sentence sequence. No reordering, no merging.
pub trait SentenceSplitter: Send + Sync {
    fn split(&self, text: &str) -> Vec<String>;
}

/// Hands out the current corpus snapshot. The orchestrator caches the
/// returned `Arc` for the duration of one call.
pub trait CorpusSupplier: Send + Sync {
    fn current_snapshot(&self) -> Arc<CorpusSnapshot>;
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct SchemaBundle {
    pub ranked_paper: Schema,
    pub evidence_set: Schema,
}

pub fn schema_bundle() -> SchemaBundle {
    SchemaBundle {
        ranked_paper: schemars::schema_for!(RankedPaper),
        evidence_set: schemars::schema_for!(EvidenceSet),
    }
}
