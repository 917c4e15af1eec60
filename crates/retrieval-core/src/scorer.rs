use common::{CorpusSnapshot, RetrievalError};

/// Raw distance of one document from one query vector. Lower is more
/// similar. Produced in corpus order; ranking happens in fusion.
#[derive(Debug, Clone, PartialEq)]
pub struct DocDistance {
    pub paper_id: u64,
    pub distance: f32,
}

/// Scores every document in the snapshot against the query vector with
/// Euclidean (L2) distance. No pre-filtering and no tie-breaking; ties are
/// resolved downstream by fusion.
pub fn score_corpus(
    query_vec: &[f32],
    snapshot: &CorpusSnapshot,
) -> Result<Vec<DocDistance>, RetrievalError> {
    if snapshot.is_empty() {
        return Err(RetrievalError::EmptyCorpus);
    }

    let mut distances = Vec::with_capacity(snapshot.len());
    for doc in &snapshot.docs {
        if doc.embedding.len() != query_vec.len() {
            return Err(RetrievalError::DimensionMismatch {
                query_dim: query_vec.len(),
                paper_id: doc.paper_id,
                doc_dim: doc.embedding.len(),
            });
        }
        distances.push(DocDistance {
            paper_id: doc.paper_id,
            distance: l2_distance(query_vec, &doc.embedding),
        });
    }
    Ok(distances)
}

fn l2_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(av, bv)| {
            let diff = av - bv;
            diff * diff
        })
        .sum::<f32>()
        .sqrt()
}
