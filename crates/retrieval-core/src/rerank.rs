use anyhow::Result;
use common::{EmbeddingProvider, RankedPaper, SentenceSplitter};

use crate::fusion::FusedResult;

/// One scored sentence from a retained document.
#[derive(Debug, Clone, PartialEq)]
pub struct SentenceEvidence {
    pub paper_id: u64,
    pub sentence_index: usize,
    pub sentence: String,
    pub similarity: f32,
}

/// Second-pass re-ranking: splits each retained abstract into sentences,
/// embeds every sentence, and keeps the global top `top_n` by cosine
/// similarity to the query vector, ordered descending by similarity.
///
/// Zero-norm sentence or query vectors score 0 rather than failing; the
/// pipeline stays total on degenerate embeddings.
pub fn select_evidence<E, S>(
    retained: &[FusedResult],
    query_vec: &[f32],
    embedder: &E,
    splitter: &S,
    top_n: usize,
) -> Result<Vec<SentenceEvidence>>
where
    E: EmbeddingProvider + ?Sized,
    S: SentenceSplitter + ?Sized,
{
    let mut scored = Vec::new();
    for result in retained {
        let sentences = splitter.split(&result.abstract_text);
        if sentences.is_empty() {
            continue;
        }
        let vectors = embedder.embed_batch(&sentences)?;
        for (index, (sentence, vector)) in sentences.into_iter().zip(vectors).enumerate() {
            scored.push(SentenceEvidence {
                paper_id: result.paper_id,
                sentence_index: index,
                sentence,
                similarity: cosine_similarity(query_vec, &vector),
            });
        }
    }

    scored.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
    scored.truncate(top_n);
    Ok(scored)
}

/// Attaches the surviving sentences to their documents, restoring original
/// intra-document order. Documents contributing no top sentence get an empty
/// list. Input order of `retained` is preserved.
pub fn annotate(retained: &[FusedResult], evidence: &[SentenceEvidence]) -> Vec<RankedPaper> {
    retained
        .iter()
        .map(|result| {
            let mut picked = evidence
                .iter()
                .filter(|e| e.paper_id == result.paper_id)
                .collect::<Vec<_>>();
            picked.sort_by_key(|e| e.sentence_index);
            RankedPaper {
                paper_id: result.paper_id,
                title: result.title.clone(),
                author_name: result.author_name.clone(),
                abstract_text: result.abstract_text.clone(),
                score: result.score,
                sentences: picked.into_iter().map(|e| e.sentence.clone()).collect(),
            }
        })
        .collect()
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || b.is_empty() || a.len() != b.len() {
        return 0.0;
    }
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (av, bv) in a.iter().zip(b.iter()) {
        dot += av * bv;
        norm_a += av * av;
        norm_b += bv * bv;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}
