//! PDF text extraction via poppler's `pdftotext`.

use super::{has_extension, DocumentExtractor};
use crate::error::{DuettError, Result};
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, instrument, warn};

/// Extracts text from PDF files with the `pdftotext` tool.
#[derive(Debug, Clone)]
pub struct PdfExtractor {
    program: String,
}

impl PdfExtractor {
    pub fn new() -> Self {
        Self::with_program("pdftotext")
    }

    /// Use a different `pdftotext` binary (e.g. an absolute path).
    pub fn with_program(program: &str) -> Self {
        Self {
            program: program.to_string(),
        }
    }
}

impl Default for PdfExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentExtractor for PdfExtractor {
    fn can_handle(&self, path: &Path) -> bool {
        has_extension(path, &["pdf"])
    }

    #[instrument(skip(self), fields(path = %path.display()))]
    async fn extract(&self, path: &Path) -> Result<String> {
        debug!("Running {}", self.program);

        let result = Command::new(&self.program)
            .arg("-enc")
            .arg("UTF-8")
            .arg(path)
            .arg("-")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await;

        let output = match result {
            Ok(o) => o,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(DuettError::ToolNotFound(self.program.clone()));
            }
            Err(e) => {
                return Err(DuettError::Extraction(format!(
                    "{} execution failed: {e}",
                    self.program
                )));
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DuettError::Extraction(format!(
                "{} failed: {}",
                self.program,
                stderr.trim()
            )));
        }

        // Damaged files can still yield partial text alongside warnings
        if !output.stderr.is_empty() {
            warn!(
                "{} reported: {}",
                self.program,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
