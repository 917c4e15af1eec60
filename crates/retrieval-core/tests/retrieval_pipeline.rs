use std::collections::HashMap;
use std::time::Duration;

use anyhow::anyhow;
use common::{EmbeddingProvider, PaperDoc, QueryExpander, RetrievalError};
use retrieval_core::{Retriever, RetrieverConfig, RuleSplitter, SnapshotStore};

/// Embeds known texts to fixed vectors; anything else gets a zero vector of
/// the right dimensionality.
struct MapEmbedder {
    map: HashMap<String, Vec<f32>>,
    dim: usize,
}

impl MapEmbedder {
    fn new(dim: usize, entries: &[(&str, &[f32])]) -> Self {
        Self {
            map: entries
                .iter()
                .map(|(text, vec)| ((*text).to_string(), vec.to_vec()))
                .collect(),
            dim,
        }
    }
}

impl EmbeddingProvider for MapEmbedder {
    fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        Ok(self
            .map
            .get(text)
            .cloned()
            .unwrap_or_else(|| vec![0.0; self.dim]))
    }

    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }
}

struct BrokenEmbedder;

impl EmbeddingProvider for BrokenEmbedder {
    fn embed(&self, _text: &str) -> anyhow::Result<Vec<f32>> {
        Err(anyhow!("model unavailable"))
    }

    fn embed_batch(&self, _texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        Err(anyhow!("model unavailable"))
    }
}

struct FixedExpander(Vec<String>);

impl QueryExpander for FixedExpander {
    async fn expand(&self, _query: &str) -> anyhow::Result<Vec<String>> {
        Ok(self.0.clone())
    }
}

struct FailingExpander;

impl QueryExpander for FailingExpander {
    async fn expand(&self, _query: &str) -> anyhow::Result<Vec<String>> {
        Err(anyhow!("expansion model unreachable"))
    }
}

struct StalledExpander;

impl QueryExpander for StalledExpander {
    async fn expand(&self, _query: &str) -> anyhow::Result<Vec<String>> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(Vec::new())
    }
}

fn doc(paper_id: u64, abstract_text: &str, embedding: &[f32]) -> PaperDoc {
    PaperDoc {
        paper_id,
        title: format!("Paper {paper_id}"),
        author_name: format!("Author {paper_id}"),
        abstract_text: abstract_text.to_string(),
        embedding: embedding.to_vec(),
    }
}

fn line_corpus() -> SnapshotStore {
    // Three documents at increasing distance from the query at the origin.
    SnapshotStore::new(vec![
        doc(0, "Closest work. Strong match here.", &[0.1, 0.0]),
        doc(1, "Middling work. Some relevance.", &[0.5, 0.0]),
        doc(2, "Distant work. Barely related.", &[0.9, 0.0]),
    ])
}

fn config() -> RetrieverConfig {
    RetrieverConfig {
        expansion_timeout: Duration::from_millis(100),
        ..RetrieverConfig::default()
    }
}

#[tokio::test]
async fn single_query_ranks_closest_first_and_cuts_to_minimum() {
    let embedder = MapEmbedder::new(2, &[("q", &[0.0, 0.0])]);
    let retriever = Retriever::new(
        line_corpus(),
        embedder,
        FixedExpander(Vec::new()),
        RuleSplitter,
        config(),
    );

    let evidence = retriever.retrieve("q", false).await.expect("evidence");
    // Near-uniform single-variant scores collapse to the minimum cutoff.
    assert_eq!(evidence.papers.len(), 2);
    assert_eq!(evidence.papers[0].paper_id, 0);
    assert_eq!(evidence.papers[1].paper_id, 1);
    assert!(evidence.papers[0].score > evidence.papers[1].score);
}

#[tokio::test]
async fn empty_expansion_falls_back_to_original_query() {
    let embedder = MapEmbedder::new(2, &[("q", &[0.0, 0.0])]);
    let retriever = Retriever::new(
        line_corpus(),
        embedder,
        FixedExpander(Vec::new()),
        RuleSplitter,
        config(),
    );

    let evidence = retriever.retrieve("q", true).await.expect("evidence");
    assert!(!evidence.papers.is_empty());
    assert_eq!(evidence.papers[0].paper_id, 0);
}

#[tokio::test]
async fn failing_expansion_is_absorbed() {
    let embedder = MapEmbedder::new(2, &[("q", &[0.0, 0.0])]);
    let retriever = Retriever::new(
        line_corpus(),
        embedder,
        FailingExpander,
        RuleSplitter,
        config(),
    );

    let evidence = retriever.retrieve("q", true).await.expect("evidence");
    assert!(!evidence.papers.is_empty());
}

#[tokio::test]
async fn stalled_expansion_times_out_and_degrades() {
    let embedder = MapEmbedder::new(2, &[("q", &[0.0, 0.0])]);
    let retriever = Retriever::new(
        line_corpus(),
        embedder,
        StalledExpander,
        RuleSplitter,
        config(),
    );

    let evidence = retriever.retrieve("q", true).await.expect("evidence");
    assert!(!evidence.papers.is_empty());
}

#[tokio::test]
async fn disagreeing_variants_sum_reciprocal_contributions() {
    let store = SnapshotStore::new(vec![
        doc(1, "Axis aligned. Extra words.", &[1.0, 0.0]),
        doc(2, "Diagonal. Extra words.", &[0.5, 0.5]),
        doc(3, "Other axis. Extra words.", &[0.0, 1.0]),
    ]);
    let embedder = MapEmbedder::new(
        2,
        &[
            ("q", &[0.5, 0.5]),
            ("v1", &[1.0, 0.0]),
            ("v2", &[0.0, 1.0]),
        ],
    );
    let retriever = Retriever::new(
        store,
        embedder,
        FixedExpander(vec!["v1".to_string(), "v2".to_string()]),
        RuleSplitter,
        config(),
    );

    let evidence = retriever.retrieve("q", true).await.expect("evidence");
    // Document 1 is best for v1 (rank 0) and worst for v2 (rank 2); its
    // fused score is the sum of both contributions, not the maximum.
    let doc1 = evidence
        .papers
        .iter()
        .find(|p| p.paper_id == 1)
        .expect("document 1 retained");
    let expected = 1.0 / 60.0 + 1.0 / 62.0;
    assert!((doc1.score - expected).abs() < 1e-6);
    assert!(doc1.score > 1.0 / 60.0);
}

#[tokio::test]
async fn zero_embedding_sentences_score_zero_without_fault() {
    // Every sentence embeds to the zero vector (unknown to the embedder).
    let embedder = MapEmbedder::new(2, &[("q", &[1.0, 0.0])]);
    let retriever = Retriever::new(
        line_corpus(),
        embedder,
        FixedExpander(Vec::new()),
        RuleSplitter,
        config(),
    );

    let evidence = retriever.retrieve("q", false).await.expect("evidence");
    let total_sentences: usize = evidence.papers.iter().map(|p| p.sentences.len()).sum();
    assert!(total_sentences <= 5);
}

#[tokio::test]
async fn sentence_cap_holds_across_documents() {
    let store = SnapshotStore::new(vec![
        doc(0, "One. Two. Three. Four.", &[0.1, 0.0]),
        doc(1, "Five. Six. Seven. Eight.", &[0.2, 0.0]),
    ]);
    let embedder = MapEmbedder::new(2, &[("q", &[0.0, 0.0])]);
    let retriever = Retriever::new(
        store,
        embedder,
        FixedExpander(Vec::new()),
        RuleSplitter,
        config(),
    );

    let evidence = retriever.retrieve("q", false).await.expect("evidence");
    let total_sentences: usize = evidence.papers.iter().map(|p| p.sentences.len()).sum();
    assert!(total_sentences <= 5);
    // Every surfaced sentence belongs to a retained document's abstract.
    for paper in &evidence.papers {
        for sentence in &paper.sentences {
            assert!(paper.abstract_text.contains(sentence.as_str()));
        }
    }
}

#[tokio::test]
async fn empty_corpus_surfaces_as_error() {
    let embedder = MapEmbedder::new(2, &[("q", &[0.0, 0.0])]);
    let retriever = Retriever::new(
        SnapshotStore::new(Vec::new()),
        embedder,
        FixedExpander(Vec::new()),
        RuleSplitter,
        config(),
    );

    let err = retriever.retrieve("q", false).await.expect_err("error");
    assert!(matches!(err, RetrievalError::EmptyCorpus));
}

#[tokio::test]
async fn dimension_mismatch_surfaces_as_error() {
    let store = SnapshotStore::new(vec![doc(0, "A.", &[0.1, 0.0, 0.3])]);
    let embedder = MapEmbedder::new(2, &[("q", &[0.0, 0.0])]);
    let retriever = Retriever::new(
        store,
        embedder,
        FixedExpander(Vec::new()),
        RuleSplitter,
        config(),
    );

    let err = retriever.retrieve("q", false).await.expect_err("error");
    assert!(matches!(err, RetrievalError::DimensionMismatch { .. }));
}

#[tokio::test]
async fn broken_embedding_provider_is_fatal() {
    let retriever = Retriever::new(
        line_corpus(),
        BrokenEmbedder,
        FixedExpander(Vec::new()),
        RuleSplitter,
        config(),
    );

    let err = retriever.retrieve("q", false).await.expect_err("error");
    assert!(matches!(err, RetrievalError::EmbeddingFailed(_)));
}

#[tokio::test]
async fn injection_delimiters_are_stripped_before_embedding() {
    let embedder = MapEmbedder::new(2, &[("q", &[0.0, 0.0])]);
    let retriever = Retriever::new(
        line_corpus(),
        embedder,
        FixedExpander(Vec::new()),
        RuleSplitter,
        config(),
    );

    // "[INST] q [/INST]" normalizes to "q", which the embedder knows.
    let evidence = retriever
        .retrieve("[INST] q [/INST]", false)
        .await
        .expect("evidence");
    assert_eq!(evidence.papers[0].paper_id, 0);
}
