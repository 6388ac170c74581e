//! Plain text and Markdown documents.

use super::{has_extension, DocumentExtractor};
use crate::error::{DuettError, Result};
use async_trait::async_trait;
use std::path::Path;

/// Supported plain text extensions.
const TEXT_EXTENSIONS: &[&str] = &["txt", "text", "md", "markdown"];

/// Reads UTF-8 text files as-is.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainTextExtractor;

impl PlainTextExtractor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DocumentExtractor for PlainTextExtractor {
    fn can_handle(&self, path: &Path) -> bool {
        has_extension(path, TEXT_EXTENSIONS)
    }

    async fn extract(&self, path: &Path) -> Result<String> {
        let bytes = tokio::fs::read(path).await?;
        String::from_utf8(bytes).map_err(|e| {
            DuettError::Extraction(format!("{} is not valid UTF-8: {}", path.display(), e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rejects_invalid_utf8() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.txt");
        std::fs::write(&path, [0xff, 0xfe, 0x00]).unwrap();

        let result = PlainTextExtractor::new().extract(&path).await;
        assert!(matches!(result, Err(DuettError::Extraction(_))));
    }
}
