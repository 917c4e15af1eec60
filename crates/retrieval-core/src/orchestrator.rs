use std::time::Duration;

use common::{
    CorpusSupplier, EmbeddingProvider, EvidenceSet, QueryExpander, RetrievalError,
    SentenceSplitter, config::AppConfig,
};

use crate::{cutoff, fusion, rerank, scorer};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrieverConfig {
    pub rrf_k: usize,
    pub min_results: usize,
    pub max_results: usize,
    pub sentence_top_n: usize,
    pub expansion_timeout: Duration,
}

impl Default for RetrieverConfig {
    fn default() -> Self {
        Self {
            rrf_k: fusion::DEFAULT_RRF_K,
            min_results: 2,
            max_results: 10,
            sentence_top_n: 5,
            expansion_timeout: Duration::from_millis(8_000),
        }
    }
}

impl From<&AppConfig> for RetrieverConfig {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            rrf_k: cfg.rrf_k,
            min_results: cfg.min_results,
            max_results: cfg.max_results,
            sentence_top_n: cfg.sentence_top_n,
            expansion_timeout: Duration::from_millis(cfg.expansion_timeout_ms),
        }
    }
}

/// Entry point of one retrieval call. Owns the corpus snapshot for the
/// duration of the call and sequences scoring, fusion, cutoff, and sentence
/// re-ranking.
///
/// This is the only place allowed to absorb Query Expander failures; every
/// other component failure propagates to the caller.
pub struct Retriever<C, E, X, S> {
    corpus: C,
    embedder: E,
    expander: X,
    splitter: S,
    config: RetrieverConfig,
}

impl<C, E, X, S> Retriever<C, E, X, S>
where
    C: CorpusSupplier,
    E: EmbeddingProvider,
    X: QueryExpander,
    S: SentenceSplitter,
{
    pub fn new(corpus: C, embedder: E, expander: X, splitter: S, config: RetrieverConfig) -> Self {
        Self {
            corpus,
            embedder,
            expander,
            splitter,
            config,
        }
    }

    pub async fn retrieve(
        &self,
        query: &str,
        use_expansion: bool,
    ) -> Result<EvidenceSet, RetrievalError> {
        let query = strip_control_tokens(query);
        let snapshot = self.corpus.current_snapshot();

        // No meaningful result is possible without the query vector.
        let query_vec = self
            .embedder
            .embed(&query)
            .map_err(RetrievalError::EmbeddingFailed)?;

        let variants = if use_expansion {
            self.expanded_variants(&query).await
        } else {
            vec![query.clone()]
        };

        let mut rankings = Vec::with_capacity(variants.len());
        for variant in &variants {
            let variant_vec = if *variant == query {
                query_vec.clone()
            } else {
                match self.embedder.embed(variant) {
                    Ok(vec) => vec,
                    Err(err) => {
                        tracing::warn!(variant = %variant, error = %err, "variant embedding failed, skipping variant");
                        continue;
                    }
                }
            };
            rankings.push(fusion::QueryRanking {
                variant: variant.clone(),
                distances: scorer::score_corpus(&variant_vec, &snapshot)?,
            });
        }
        if rankings.is_empty() {
            // Every variant embedding failed; score with the original query.
            rankings.push(fusion::QueryRanking {
                variant: query.clone(),
                distances: scorer::score_corpus(&query_vec, &snapshot)?,
            });
        }

        // Canonical fused order is ascending (score, id); relevance order is
        // its reverse.
        let mut ranked = fusion::rrf_fuse(&rankings, &snapshot, self.config.rrf_k);
        ranked.reverse();

        let scores = ranked.iter().map(|r| r.score).collect::<Vec<_>>();
        let k_top = cutoff::adaptive_top_k(&scores, self.config.min_results, self.config.max_results);
        ranked.truncate(k_top);
        tracing::debug!(
            snapshot_version = snapshot.version,
            variants = rankings.len(),
            retained = ranked.len(),
            "retrieval pipeline retained top documents"
        );

        let evidence = rerank::select_evidence(
            &ranked,
            &query_vec,
            &self.embedder,
            &self.splitter,
            self.config.sentence_top_n,
        )
        .map_err(RetrievalError::EmbeddingFailed)?;
        let papers = rerank::annotate(&ranked, &evidence);

        Ok(EvidenceSet { papers })
    }

    /// Expansion degrades, never fails: timeouts, errors, and empty variant
    /// lists all fall back to the single original query.
    async fn expanded_variants(&self, query: &str) -> Vec<String> {
        let expansion =
            tokio::time::timeout(self.config.expansion_timeout, self.expander.expand(query)).await;
        match expansion {
            Ok(Ok(variants)) if !variants.is_empty() => variants,
            Ok(Ok(_)) => {
                tracing::warn!("query expansion returned no variants, using original query");
                vec![query.to_string()]
            }
            Ok(Err(err)) => {
                tracing::warn!(error = %err, "query expansion failed, using original query");
                vec![query.to_string()]
            }
            Err(_) => {
                tracing::warn!(
                    timeout_ms = self.config.expansion_timeout.as_millis() as u64,
                    "query expansion timed out, using original query"
                );
                vec![query.to_string()]
            }
        }
    }
}

/// Removes model-control delimiters from the raw query so injected tokens
/// cannot corrupt embedding or scoring.
fn strip_control_tokens(query: &str) -> String {
    query
        .replace("[INST]", "")
        .replace("[/INST]", "")
        .trim()
        .to_string()
}
