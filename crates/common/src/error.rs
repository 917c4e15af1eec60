use thiserror::Error;

/// Failure modes a retrieval call can surface to its caller.
///
/// Recoverable conditions never appear here: query-expansion failures degrade
/// to the single original query, and zero-norm vectors during sentence
/// scoring are assigned similarity 0. A call that returns `Ok` with an empty
/// evidence set means "no results"; these variants mean "retrieval failed".
#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("corpus snapshot contains no documents")]
    EmptyCorpus,

    #[error(
        "embedding dimension mismatch: query vector has {query_dim} components, document {paper_id} has {doc_dim}"
    )]
    DimensionMismatch {
        query_dim: usize,
        paper_id: u64,
        doc_dim: usize,
    },

    #[error("embedding provider failed: {0}")]
    EmbeddingFailed(anyhow::Error),
}

#[cfg(test)]
mod tests {
    use super::RetrievalError;

    #[test]
    fn dimension_mismatch_names_the_offending_document() {
        let err = RetrievalError::DimensionMismatch {
            query_dim: 384,
            paper_id: 12,
            doc_dim: 768,
        };
        let message = err.to_string();
        assert!(message.contains("384"));
        assert!(message.contains("document 12"));
    }

    #[test]
    fn empty_corpus_is_distinguishable() {
        assert!(matches!(
            RetrievalError::EmptyCorpus,
            RetrievalError::EmptyCorpus
        ));
    }
}
