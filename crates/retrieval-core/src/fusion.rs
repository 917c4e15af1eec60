use ahash::AHashMap;
use common::CorpusSnapshot;

use crate::scorer::DocDistance;

pub const DEFAULT_RRF_K: usize = 60;

/// One query variant's distance scores over the corpus. Variant text is kept
/// for tracing; duplicate variant text is a distinct contributor.
#[derive(Debug, Clone)]
pub struct QueryRanking {
    pub variant: String,
    pub distances: Vec<DocDistance>,
}

/// Accumulated reciprocal-rank score for one document, with the metadata
/// attached the first time the document was encountered.
#[derive(Debug, Clone, PartialEq)]
pub struct FusedResult {
    pub paper_id: u64,
    pub score: f32,
    pub title: String,
    pub author_name: String,
    pub abstract_text: String,
}

/// Reciprocal rank fusion over one or more per-variant rankings.
///
/// Each variant's documents are ranked by ascending distance (stable, so
/// distance ties keep corpus order) and contribute `1/(rank + k)` to the
/// document's cumulative score. Every document seen by at least one variant
/// appears exactly once in the output.
///
/// The output is sorted ascending by `(score, paper_id)`. That places the
/// best-fused documents at the *tail*; callers wanting relevance order must
/// reverse (or take the tail) before truncating. The ascending order is a
/// preserved contract that downstream consumers rely on - do not flip it.
pub fn rrf_fuse(
    rankings: &[QueryRanking],
    snapshot: &CorpusSnapshot,
    k: usize,
) -> Vec<FusedResult> {
    let metadata = snapshot
        .docs
        .iter()
        .map(|doc| (doc.paper_id, doc))
        .collect::<AHashMap<_, _>>();

    let mut fused: AHashMap<u64, FusedResult> = AHashMap::new();
    for ranking in rankings {
        let mut ordered = ranking.distances.clone();
        ordered.sort_by(|a, b| a.distance.total_cmp(&b.distance));

        for (rank, entry) in ordered.iter().enumerate() {
            let Some(doc) = metadata.get(&entry.paper_id) else {
                tracing::warn!(
                    paper_id = entry.paper_id,
                    variant = %ranking.variant,
                    "ranked document missing from snapshot, skipping"
                );
                continue;
            };
            let slot = fused.entry(entry.paper_id).or_insert_with(|| FusedResult {
                paper_id: doc.paper_id,
                score: 0.0,
                title: doc.title.clone(),
                author_name: doc.author_name.clone(),
                abstract_text: doc.abstract_text.clone(),
            });
            slot.score += 1.0 / ((rank + k) as f32);
        }
    }

    let mut out = fused.into_values().collect::<Vec<_>>();
    out.sort_by(|a, b| {
        a.score
            .total_cmp(&b.score)
            .then_with(|| a.paper_id.cmp(&b.paper_id))
    });
    out
}
