pub mod cutoff;
pub mod fusion;
pub mod orchestrator;
pub mod rerank;
pub mod scorer;
pub mod segment;
pub mod snapshot;

pub use cutoff::adaptive_top_k;
pub use fusion::{DEFAULT_RRF_K, FusedResult, QueryRanking, rrf_fuse};
pub use orchestrator::{Retriever, RetrieverConfig};
pub use rerank::{SentenceEvidence, annotate, cosine_similarity, select_evidence};
pub use scorer::{DocDistance, score_corpus};
pub use segment::RuleSplitter;
pub use snapshot::{SnapshotStore, load_corpus};
