//! Exact in-memory index using Euclidean distance.
//!
//! Every query scans all stored vectors, so recall is always complete.

use super::{squared_l2_distance, Neighbor, VectorIndex};
use crate::error::{DuettError, Result};

/// Flat (brute-force) L2 index.
#[derive(Debug, Default, Clone)]
pub struct FlatL2Index {
    dimension: Option<usize>,
    vectors: Vec<Vec<f32>>,
}

impl FlatL2Index {
    /// Create a new empty index.
    pub fn new() -> Self {
        Self::default()
    }

    fn check_dimension(expected: usize, found: usize, what: &str) -> Result<()> {
        if expected != found {
            return Err(DuettError::EmbeddingDimension(format!(
                "{} has dimension {}, index dimension is {}",
                what, found, expected
            )));
        }
        Ok(())
    }
}

impl VectorIndex for FlatL2Index {
    fn add(&mut self, vectors: Vec<Vec<f32>>) -> Result<()> {
        let Some(first) = vectors.first() else {
            return Ok(());
        };

        let dimension = self.dimension.unwrap_or(first.len());
        if dimension == 0 {
            return Err(DuettError::EmbeddingDimension(
                "vectors must not be empty".to_string(),
            ));
        }

        // Validate the whole batch before storing any of it
        for (i, vector) in vectors.iter().enumerate() {
            Self::check_dimension(dimension, vector.len(), &format!("vector {}", i))?;
        }

        self.dimension = Some(dimension);
        self.vectors.extend(vectors);
        Ok(())
    }

    fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        let Some(dimension) = self.dimension else {
            return Ok(Vec::new());
        };
        Self::check_dimension(dimension, query.len(), "query")?;

        let mut neighbors: Vec<Neighbor> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(position, vector)| Neighbor {
                position,
                distance: squared_l2_distance(query, vector),
            })
            .collect();

        // Ties resolve to the earlier position so results are reproducible
        neighbors.sort_by(|a, b| {
            a.distance
                .total_cmp(&b.distance)
                .then(a.position.cmp(&b.position))
        });
        neighbors.truncate(k);

        Ok(neighbors)
    }

    fn len(&self) -> usize {
        self.vectors.len()
    }

    fn dimension(&self) -> Option<usize> {
        self.dimension
    }
}
