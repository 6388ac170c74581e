//! Document text extraction.
//!
//! Provides a trait-based interface for turning a source document into plain
//! text, with implementations for PDF and plain text files.

mod pdf;
mod text;

pub use pdf::PdfExtractor;
pub use text::PlainTextExtractor;

use crate::error::{DuettError, Result};
use async_trait::async_trait;
use std::path::Path;
use tracing::{info, instrument};

/// Trait for document extractors.
#[async_trait]
pub trait DocumentExtractor: Send + Sync {
    /// Check if this extractor can read the given file.
    fn can_handle(&self, path: &Path) -> bool;

    /// Return the full plain-text content of the document.
    async fn extract(&self, path: &Path) -> Result<String>;
}

/// Check a file's extension against a list, ignoring case.
pub(crate) fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| extensions.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Detect the appropriate extractor for the given file.
pub fn detect_extractor(path: &Path) -> Option<Box<dyn DocumentExtractor>> {
    let pdf = PdfExtractor::new();
    if pdf.can_handle(path) {
        return Some(Box::new(pdf));
    }

    let text = PlainTextExtractor::new();
    if text.can_handle(path) {
        return Some(Box::new(text));
    }

    None
}

/// Extractor that picks an implementation from the file extension.
#[derive(Debug, Default, Clone, Copy)]
pub struct AutoExtractor;

impl AutoExtractor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DocumentExtractor for AutoExtractor {
    fn can_handle(&self, path: &Path) -> bool {
        detect_extractor(path).is_some()
    }

    #[instrument(skip(self), fields(path = %path.display()))]
    async fn extract(&self, path: &Path) -> Result<String> {
        if !path.exists() {
            return Err(DuettError::Extraction(format!(
                "File not found: {}",
                path.display()
            )));
        }

        let extractor = detect_extractor(path).ok_or_else(|| {
            DuettError::InvalidInput(format!(
                "Unsupported document type: {} (expected .pdf, .txt or .md)",
                path.display()
            ))
        })?;

        let text = extractor.extract(path).await?;
        let text = normalize(&text);

        if text.trim().is_empty() {
            return Err(DuettError::Extraction(format!(
                "No extractable text in {}",
                path.display()
            )));
        }

        info!("Extracted {} characters", text.chars().count());
        Ok(text)
    }
}

/// Normalize line endings and page breaks into plain paragraphs.
fn normalize(text: &str) -> String {
    text.replace("\r\n", "\n")
        .replace('\r', "\n")
        .replace('\u{c}', "\n\n")
}
