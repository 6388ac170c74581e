//! Boundary-aware fixed-size chunking.
//!
//! Each window of at most `chunk_size` characters is cut at the last paragraph
//! break it contains, falling back to a line break, a sentence end, any
//! whitespace, and finally a hard character cut.

use super::{Chunk, Chunker, ChunkingConfig};
use crate::error::Result;
use tracing::debug;

/// Cut positions in priority order. A cut at `i` splits `chars[..i]` from `chars[i..]`.
const BOUNDARIES: [fn(&[char], usize) -> bool; 4] = [
    is_paragraph_break,
    is_line_break,
    is_sentence_end,
    is_word_break,
];

fn is_paragraph_break(chars: &[char], i: usize) -> bool {
    i >= 2 && chars[i - 1] == '\n' && chars[i - 2] == '\n'
}

fn is_line_break(chars: &[char], i: usize) -> bool {
    chars[i - 1] == '\n'
}

fn is_sentence_end(chars: &[char], i: usize) -> bool {
    i >= 2 && chars[i - 1].is_whitespace() && matches!(chars[i - 2], '.' | '!' | '?')
}

fn is_word_break(chars: &[char], i: usize) -> bool {
    chars[i - 1].is_whitespace()
}

/// Chunker that prefers natural boundaries over hard cuts.
#[derive(Debug, Clone)]
pub struct RecursiveChunker {
    config: ChunkingConfig,
}

impl RecursiveChunker {
    /// Create a chunker, rejecting an overlap that is not smaller than the size.
    pub fn new(config: ChunkingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ChunkingConfig {
        &self.config
    }

    /// Find the best cut in `min..=limit`, searching backwards from `limit`.
    fn find_cut(chars: &[char], min: usize, limit: usize) -> usize {
        for boundary in BOUNDARIES {
            if let Some(cut) = (min..=limit).rev().find(|&i| boundary(chars, i)) {
                return cut;
            }
        }
        limit
    }
}

impl Default for RecursiveChunker {
    fn default() -> Self {
        Self {
            config: ChunkingConfig::default(),
        }
    }
}

impl Chunker for RecursiveChunker {
    fn split(&self, text: &str) -> Vec<Chunk> {
        let chars: Vec<char> = text.chars().collect();
        let total = chars.len();
        let ChunkingConfig {
            chunk_size,
            chunk_overlap,
        } = self.config;

        let mut chunks = Vec::new();
        let mut start = 0;

        while start < total {
            let limit = (start + chunk_size).min(total);
            // The cut must leave more than `chunk_overlap` characters so the
            // next window starts strictly after this one.
            let end = if limit == total {
                total
            } else {
                Self::find_cut(&chars, start + chunk_overlap + 1, limit)
            };

            let text: String = chars[start..end].iter().collect();
            chunks.push(Chunk::new(text, chunks.len(), start));

            if end == total {
                break;
            }
            start = end - chunk_overlap;
        }

        debug!("Split {} characters into {} chunks", total, chunks.len());
        chunks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunking::reassemble;

    fn chunker(size: usize, overlap: usize) -> RecursiveChunker {
        RecursiveChunker::new(ChunkingConfig::new(size, overlap).unwrap()).unwrap()
    }

    fn sample_text() -> String {
        let paragraph = "Transformers process tokens in parallel. Attention weighs every pair of \
                         positions! Does this scale? Only with tricks like sparse attention.";
        (0..12)
            .map(|i| format!("Section {}. {}", i, paragraph))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    #[test]
    fn test_empty_text_yields_no_chunks() {
        assert!(chunker(100, 20).split("").is_empty());
    }

    #[test]
    fn test_short_text_is_one_chunk() {
        let chunks = chunker(100, 20).split("A short note.");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "A short note.");
        assert_eq!(chunks[0].ordinal, 0);
        assert_eq!(chunks[0].start, 0);
    }

    #[test]
    fn test_overlap_not_smaller_than_size_is_rejected() {
        assert!(ChunkingConfig::new(100, 100).is_err());
        assert!(ChunkingConfig::new(100, 150).is_err());
        let config = ChunkingConfig {
            chunk_size: 10,
            chunk_overlap: 10,
        };
        assert!(RecursiveChunker::new(config).is_err());
    }

    #[test]
    fn test_reassembly_reconstructs_text() {
        let text = sample_text();
        for (size, overlap) in [(120, 30), (200, 0), (57, 56), (1000, 200)] {
            let chunks = chunker(size, overlap).split(&text);
            assert_eq!(reassemble(&chunks), text, "size={} overlap={}", size, overlap);
        }
    }

    #[test]
    fn test_ordinals_are_contiguous_from_zero() {
        let chunks = chunker(120, 30).split(&sample_text());
        assert!(chunks.len() > 5);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.ordinal, i);
        }
    }

    #[test]
    fn test_chunks_respect_size_and_repeat_overlap() {
        let overlap = 30;
        let chunks = chunker(120, overlap).split(&sample_text());

        for chunk in &chunks {
            assert!(chunk.char_len() <= 120);
        }
        for pair in chunks.windows(2) {
            let prev: Vec<char> = pair[0].text.chars().collect();
            let next: Vec<char> = pair[1].text.chars().collect();
            assert_eq!(pair[1].start, pair[0].end() - overlap);
            assert_eq!(&prev[prev.len() - overlap..], &next[..overlap]);
        }
    }

    #[test]
    fn test_prefers_paragraph_breaks() {
        let text = "First paragraph here.\n\nSecond paragraph is a little longer than that.";
        let chunks = chunker(40, 0).split(text);
        assert_eq!(chunks[0].text, "First paragraph here.\n\n");
    }

    #[test]
    fn test_falls_back_to_word_breaks() {
        let text = "alpha beta gamma delta epsilon zeta eta theta";
        let chunks = chunker(12, 0).split(text);
        assert_eq!(chunks[0].text, "alpha beta ");
        assert!(chunks.iter().all(|c| c.char_len() <= 12));
        assert_eq!(reassemble(&chunks), text);
    }

    #[test]
    fn test_hard_cut_without_whitespace() {
        let text = "x".repeat(25);
        let chunks = chunker(10, 2).split(&text);
        assert_eq!(chunks[0].char_len(), 10);
        assert_eq!(chunks[1].start, 8);
        assert_eq!(reassemble(&chunks), text);
    }

    #[test]
    fn test_multibyte_text() {
        let text = "Blåbærsyltetøy er godt. Æble og øl på æøå-fest! ".repeat(6);
        let chunks = chunker(30, 8).split(&text);
        assert_eq!(reassemble(&chunks), text);
    }

    #[test]
    fn test_split_is_deterministic() {
        let text = sample_text();
        let chunker = chunker(150, 40);
        assert_eq!(chunker.split(&text), chunker.split(&text));
    }
}
