//! Per-question chunk retrieval.

use crate::chunking::Chunk;
use crate::embedding::Embedder;
use crate::error::{DuettError, Result, Stage};
use crate::external::CallPolicy;
use crate::vector_store::ChunkIndex;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// A question with the chunks retrieved for it, nearest first.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedContext {
    pub question: String,
    pub chunks: Vec<Chunk>,
}

/// Finds supporting chunks for each question.
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    policy: CallPolicy,
    top_k: usize,
}

impl Retriever {
    /// Create a new retriever.
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            policy: CallPolicy::default(),
            top_k: 3,
        }
    }

    /// Set the number of chunks retrieved per question.
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    /// Set the timeout and retry policy for embedding calls.
    pub fn with_policy(mut self, policy: CallPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Retrieve context for every question, preserving question order.
    ///
    /// All questions are embedded in one batch. An empty index gives every
    /// question empty context instead of failing.
    #[instrument(skip(self, index, questions), fields(questions = questions.len(), chunks = index.len()))]
    pub async fn retrieve(
        &self,
        index: &ChunkIndex,
        questions: &[String],
    ) -> Result<Vec<RetrievedContext>> {
        if questions.is_empty() {
            return Ok(Vec::new());
        }

        if index.is_empty() {
            warn!("Index is empty; answering without retrieved context");
            return Ok(questions
                .iter()
                .map(|q| RetrievedContext {
                    question: q.clone(),
                    chunks: Vec::new(),
                })
                .collect());
        }

        let query_vectors = self
            .policy
            .run(Stage::Answers, "question embedding", || {
                self.embedder.embed_batch(questions)
            })
            .await?;

        if query_vectors.len() != questions.len() {
            return Err(DuettError::EmbeddingDimension(format!(
                "embedder returned {} vectors for {} questions",
                query_vectors.len(),
                questions.len()
            )));
        }

        let mut contexts = Vec::with_capacity(questions.len());
        for (question, vector) in questions.iter().zip(&query_vectors) {
            let ordinals = index.search(vector, self.top_k)?;
            debug!("Question {:?} -> chunks {:?}", question, ordinals);

            let chunks = ordinals
                .into_iter()
                .filter_map(|ordinal| index.chunk(ordinal).cloned())
                .collect();

            contexts.push(RetrievedContext {
                question: question.clone(),
                chunks,
            });
        }

        info!(
            "Retrieved {} chunks for {} questions",
            contexts.iter().map(|c| c.chunks.len()).sum::<usize>(),
            contexts.len()
        );
        Ok(contexts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector_store::{FlatL2Index, VectorIndex};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct TableEmbedder {
        table: HashMap<String, Vec<f32>>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Embedder for TableEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            Ok(self.table[text].clone())
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(texts.iter().map(|t| self.table[t].clone()).collect())
        }

        fn dimensions(&self) -> usize {
            2
        }
    }

    fn embedder(entries: &[(&str, [f32; 2])]) -> Arc<TableEmbedder> {
        Arc::new(TableEmbedder {
            table: entries
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_vec()))
                .collect(),
            calls: AtomicUsize::new(0),
        })
    }

    fn index() -> ChunkIndex {
        let chunks = vec![
            Chunk::new("zero".into(), 0, 0),
            Chunk::new("one".into(), 1, 4),
            Chunk::new("two".into(), 2, 7),
        ];
        let mut flat = FlatL2Index::new();
        flat.add(vec![vec![0.0, 0.0], vec![10.0, 10.0], vec![2.0, 0.0]])
            .unwrap();
        ChunkIndex::new(chunks, Box::new(flat)).unwrap()
    }

    #[tokio::test]
    async fn test_retrieves_nearest_chunks_per_question() {
        let embedder = embedder(&[("near two?", [1.9, 0.0]), ("near one?", [9.0, 9.0])]);
        let retriever = Retriever::new(embedder.clone()).with_top_k(2);
        let questions = vec!["near two?".to_string(), "near one?".to_string()];

        let contexts = retriever.retrieve(&index(), &questions).await.unwrap();

        assert_eq!(embedder.calls.load(Ordering::SeqCst), 1);
        assert_eq!(contexts.len(), 2);
        assert_eq!(contexts[0].question, "near two?");
        let texts: Vec<&str> = contexts[0].chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["two", "zero"]);
        assert_eq!(contexts[1].chunks[0].text, "one");
    }

    #[tokio::test]
    async fn test_top_k_larger_than_index() {
        let embedder = embedder(&[("q", [0.0, 0.0])]);
        let retriever = Retriever::new(embedder).with_top_k(10);

        let contexts = retriever.retrieve(&index(), &["q".to_string()]).await.unwrap();
        assert_eq!(contexts[0].chunks.len(), 3);
    }

    #[tokio::test]
    async fn test_empty_index_degrades_to_empty_context() {
        let embedder = embedder(&[]);
        let retriever = Retriever::new(embedder.clone());
        let questions = vec!["Anything?".to_string()];

        let contexts = retriever
            .retrieve(&ChunkIndex::empty(), &questions)
            .await
            .unwrap();

        assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
        assert_eq!(contexts.len(), 1);
        assert!(contexts[0].chunks.is_empty());
    }
}
