//! Text chunking for breaking documents into overlapping retrieval units.

mod recursive;

pub use recursive::RecursiveChunker;

use crate::error::{DuettError, Result};
use serde::{Deserialize, Serialize};

/// A segment of the source document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Text content of this chunk.
    pub text: String,
    /// Position of this chunk in the document, starting at 0.
    pub ordinal: usize,
    /// Character offset of the first character in the source text.
    pub start: usize,
}

impl Chunk {
    /// Create a new chunk.
    pub fn new(text: String, ordinal: usize, start: usize) -> Self {
        Self {
            text,
            ordinal,
            start,
        }
    }

    /// Length in characters.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    /// Character offset one past the last character.
    pub fn end(&self) -> usize {
        self.start + self.char_len()
    }
}

/// Configuration for chunking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
    /// Maximum chunk length in characters.
    pub chunk_size: usize,
    /// Characters each chunk repeats from its predecessor.
    pub chunk_overlap: usize,
}

impl ChunkingConfig {
    /// Create a validated configuration.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        let config = Self {
            chunk_size,
            chunk_overlap,
        };
        config.validate()?;
        Ok(config)
    }

    /// `chunk_overlap` must be strictly smaller than `chunk_size`.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_overlap >= self.chunk_size {
            return Err(DuettError::Config(format!(
                "chunk overlap ({}) must be smaller than chunk size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        Ok(())
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

/// Trait for text chunking implementations.
pub trait Chunker: Send + Sync {
    /// Split raw text into ordered chunks. Empty text yields no chunks.
    fn split(&self, text: &str) -> Vec<Chunk>;
}

/// Rebuild the source text from chunks by dropping each overlap region.
pub fn reassemble(chunks: &[Chunk]) -> String {
    let mut text = String::new();
    let mut covered: usize = 0;

    for chunk in chunks {
        let skip = covered.saturating_sub(chunk.start);
        text.extend(chunk.text.chars().skip(skip));
        covered = covered.max(chunk.end());
    }

    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reassemble_drops_overlap_regions() {
        // "Hello brave new world" cut into three windows sharing 3 characters
        let chunks = vec![
            Chunk::new("Hello bra".to_string(), 0, 0),
            Chunk::new("brave new".to_string(), 1, 6),
            Chunk::new("new world".to_string(), 2, 12),
        ];
        assert_eq!(reassemble(&chunks), "Hello brave new world");
    }

    #[test]
    fn test_reassemble_handles_multibyte_text() {
        let chunks = vec![
            Chunk::new("Grüße, ".to_string(), 0, 0),
            Chunk::new(", Wörter".to_string(), 1, 5),
        ];
        assert_eq!(reassemble(&chunks), "Grüße, Wörter");
        assert!(reassemble(&[]).is_empty());
    }
}
