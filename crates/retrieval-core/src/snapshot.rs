use std::{fs, path::Path, sync::Arc};

use anyhow::{Context, Result};
use common::{CorpusSnapshot, CorpusSupplier, PaperDoc};
use parking_lot::RwLock;

/// Copy-on-write holder for the current corpus snapshot.
///
/// The ingestion side publishes whole new snapshots; readers clone the `Arc`
/// once and keep it for the duration of one retrieval call. A publish during
/// a call leaves that call on the snapshot it started with.
#[derive(Debug, Default)]
pub struct SnapshotStore {
    current: RwLock<Arc<CorpusSnapshot>>,
}

impl SnapshotStore {
    pub fn new(docs: Vec<PaperDoc>) -> Self {
        Self {
            current: RwLock::new(Arc::new(CorpusSnapshot::new(1, docs))),
        }
    }

    /// Replaces the corpus wholesale and returns the new snapshot version.
    pub fn publish(&self, docs: Vec<PaperDoc>) -> u64 {
        let mut guard = self.current.write();
        let version = guard.version + 1;
        *guard = Arc::new(CorpusSnapshot::new(version, docs));
        tracing::debug!(version, docs = guard.len(), "published corpus snapshot");
        version
    }

    pub fn current(&self) -> Arc<CorpusSnapshot> {
        Arc::clone(&self.current.read())
    }
}

impl CorpusSupplier for SnapshotStore {
    fn current_snapshot(&self) -> Arc<CorpusSnapshot> {
        self.current()
    }
}

/// Loads a corpus file: a JSON array of documents with precomputed
/// embeddings, as produced by the external ingestion pipeline.
pub fn load_corpus(path: &Path) -> Result<Vec<PaperDoc>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed reading corpus file: {}", path.display()))?;
    let docs: Vec<PaperDoc> = serde_json::from_str(&raw)
        .with_context(|| format!("failed parsing corpus file: {}", path.display()))?;
    Ok(docs)
}
