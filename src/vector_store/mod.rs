//! Vector search over document chunks.
//!
//! Provides a trait-based interface for nearest-neighbor indexes and the
//! [`Indexer`] that embeds chunks and builds a [`ChunkIndex`] from them.

mod flat;

pub use flat::FlatL2Index;

use crate::chunking::Chunk;
use crate::embedding::Embedder;
use crate::error::{DuettError, Result, Stage};
use crate::external::CallPolicy;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// One search hit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Insertion position of the matched vector.
    pub position: usize,
    /// Squared Euclidean distance to the query (lower is closer).
    pub distance: f32,
}

/// Trait for nearest-neighbor index implementations.
pub trait VectorIndex: Send + Sync {
    /// Append vectors. All vectors in one index must share a dimension.
    fn add(&mut self, vectors: Vec<Vec<f32>>) -> Result<()>;

    /// Return at most `k` neighbors of `query`, nearest first.
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>>;

    /// Number of stored vectors.
    fn len(&self) -> usize;

    /// Whether the index holds no vectors.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Dimension of the stored vectors, once known.
    fn dimension(&self) -> Option<usize>;
}

/// Compute the squared Euclidean distance between two vectors of equal length.
pub fn squared_l2_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

/// Chunks of one document together with their search index.
///
/// Built once per document and never modified afterwards.
pub struct ChunkIndex {
    chunks: Vec<Chunk>,
    index: Box<dyn VectorIndex>,
}

impl ChunkIndex {
    /// Pair chunks with an index holding exactly one vector per chunk.
    pub fn new(chunks: Vec<Chunk>, index: Box<dyn VectorIndex>) -> Result<Self> {
        if chunks.len() != index.len() {
            return Err(DuettError::EmbeddingDimension(format!(
                "index holds {} vectors for {} chunks",
                index.len(),
                chunks.len()
            )));
        }
        Ok(Self { chunks, index })
    }

    /// An index over zero chunks.
    pub fn empty() -> Self {
        Self {
            chunks: Vec::new(),
            index: Box::new(FlatL2Index::new()),
        }
    }

    /// Ordinals of the `k` chunks nearest to `query`, nearest first.
    ///
    /// Returns at most `min(k, len)` ordinals; an empty index returns none.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<usize>> {
        let neighbors = self.index.search(query, k)?;
        Ok(neighbors
            .into_iter()
            .map(|n| self.chunks[n.position].ordinal)
            .collect())
    }

    /// Look up a chunk by ordinal.
    pub fn chunk(&self, ordinal: usize) -> Option<&Chunk> {
        self.chunks.get(ordinal).filter(|c| c.ordinal == ordinal)
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Dimension of the indexed vectors, if any were added.
    pub fn dimension(&self) -> Option<usize> {
        self.index.dimension()
    }
}

/// Embeds chunks and builds the exact search index over them.
pub struct Indexer {
    embedder: Arc<dyn Embedder>,
    policy: CallPolicy,
}

impl Indexer {
    /// Create a new indexer.
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            policy: CallPolicy::default(),
        }
    }

    /// Set the timeout and retry policy for embedding calls.
    pub fn with_policy(mut self, policy: CallPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Embed every chunk in one batch and index the vectors.
    #[instrument(skip(self, chunks), fields(chunks = chunks.len()))]
    pub async fn build(&self, chunks: Vec<Chunk>) -> Result<ChunkIndex> {
        if chunks.is_empty() {
            info!("No chunks to index");
            return Ok(ChunkIndex::empty());
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = self
            .policy
            .run(Stage::Indexing, "chunk embedding", || {
                self.embedder.embed_batch(&texts)
            })
            .await?;

        if embeddings.len() != chunks.len() {
            return Err(DuettError::EmbeddingDimension(format!(
                "embedder returned {} vectors for {} chunks",
                embeddings.len(),
                chunks.len()
            )));
        }

        let expected = self.embedder.dimensions();
        if let Some((ordinal, vector)) = embeddings
            .iter()
            .enumerate()
            .find(|(_, v)| v.len() != expected)
        {
            return Err(DuettError::EmbeddingDimension(format!(
                "chunk {} embedded with {} dimensions, embedder is configured for {}",
                ordinal,
                vector.len(),
                expected
            )));
        }

        let mut index = FlatL2Index::new();
        index.add(embeddings)?;
        debug!("Indexed {} vectors of dimension {:?}", index.len(), index.dimension());

        info!("Built index over {} chunks", chunks.len());
        ChunkIndex::new(chunks, Box::new(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Maps each text to a fixed vector by its first character.
    struct LetterEmbedder {
        calls: AtomicUsize,
        reported: usize,
    }

    #[async_trait]
    impl Embedder for LetterEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            Ok(self.embed_batch(&[text.to_string()]).await?.remove(0))
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(texts
                .iter()
                .map(|t| match t.chars().next() {
                    Some('a') => vec![0.0, 0.0],
                    Some('b') => vec![1.0, 0.0],
                    Some('c') => vec![5.0, 5.0],
                    _ => vec![9.0],
                })
                .collect())
        }

        fn dimensions(&self) -> usize {
            self.reported
        }
    }

    fn chunks(texts: &[&str]) -> Vec<Chunk> {
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| Chunk::new(t.to_string(), i, i * 10))
            .collect()
    }

    fn indexer_reporting(reported: usize) -> (Arc<LetterEmbedder>, Indexer) {
        let embedder = Arc::new(LetterEmbedder {
            calls: AtomicUsize::new(0),
            reported,
        });
        (embedder.clone(), Indexer::new(embedder))
    }

    fn indexer() -> (Arc<LetterEmbedder>, Indexer) {
        indexer_reporting(2)
    }

    #[test]
    fn test_squared_l2_distance() {
        assert_eq!(squared_l2_distance(&[0.0, 0.0], &[3.0, 4.0]), 25.0);
        assert_eq!(squared_l2_distance(&[1.0, 2.0], &[1.0, 2.0]), 0.0);
    }

    #[tokio::test]
    async fn test_build_embeds_in_one_call() {
        let (embedder, indexer) = indexer();
        let index = indexer.build(chunks(&["apple", "banana", "cherry"])).await.unwrap();

        assert_eq!(embedder.calls.load(Ordering::SeqCst), 1);
        assert_eq!(index.len(), 3);
        assert_eq!(index.dimension(), Some(2));
        assert_eq!(index.search(&[0.9, 0.0], 2).unwrap(), vec![1, 0]);
        assert_eq!(index.chunk(2).unwrap().text, "cherry");
    }

    #[tokio::test]
    async fn test_empty_chunks_build_an_empty_index() {
        let (embedder, indexer) = indexer();
        let index = indexer.build(Vec::new()).await.unwrap();

        assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
        assert!(index.is_empty());
        assert!(index.search(&[1.0, 2.0], 3).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_mixed_dimensions_are_fatal() {
        let (_, indexer) = indexer();
        let result = indexer.build(chunks(&["apple", "zebra"])).await;
        assert!(matches!(result, Err(DuettError::EmbeddingDimension(_))));
    }

    #[tokio::test]
    async fn test_vectors_must_match_configured_dimension() {
        let (_, indexer) = indexer_reporting(3);
        let result = indexer.build(chunks(&["apple", "banana"])).await;

        match result {
            Err(DuettError::EmbeddingDimension(message)) => {
                assert!(message.contains("2 dimensions"));
                assert!(message.contains("configured for 3"));
            }
            other => panic!("expected EmbeddingDimension, got {:?}", other.map(|i| i.len())),
        }
    }

    #[tokio::test]
    async fn test_rebuilding_gives_identical_results() {
        let (_, indexer) = indexer();
        let first = indexer.build(chunks(&["apple", "banana", "cherry"])).await.unwrap();
        let second = indexer.build(chunks(&["apple", "banana", "cherry"])).await.unwrap();

        let query = [4.0, 4.0];
        assert_eq!(first.search(&query, 3).unwrap(), second.search(&query, 3).unwrap());
        assert_eq!(first.chunks(), second.chunks());
    }
}
