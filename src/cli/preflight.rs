//! Pre-flight checks before expensive operations.
//!
//! Validates that required tools and configuration are available
//! before starting a run that would otherwise fail midway.

use crate::document::has_extension;
use crate::error::{DuettError, Result};
use std::path::Path;
use std::process::Command;

/// Run pre-flight checks for generating a podcast from `document`.
///
/// Returns Ok(()) if all checks pass, or an error describing what's missing.
pub fn check_generate(document: &Path) -> Result<()> {
    if !document.is_file() {
        return Err(DuettError::InvalidInput(format!(
            "document not found: {}",
            document.display()
        )));
    }

    check_api_key()?;
    for tool in required_tools(document) {
        check_tool(tool)?;
    }
    Ok(())
}

/// External tools needed to read a document.
pub fn required_tools(document: &Path) -> Vec<&'static str> {
    if has_extension(document, &["pdf"]) {
        vec!["pdftotext"]
    } else {
        Vec::new()
    }
}

/// Check if OpenAI API key is configured.
fn check_api_key() -> Result<()> {
    match std::env::var("OPENAI_API_KEY") {
        Ok(key) if !key.is_empty() => Ok(()),
        Ok(_) => Err(DuettError::Config(
            "OPENAI_API_KEY is empty. Set it with: export OPENAI_API_KEY='sk-...'".to_string(),
        )),
        Err(_) => Err(DuettError::Config(
            "OPENAI_API_KEY not set. Set it with: export OPENAI_API_KEY='sk-...'".to_string(),
        )),
    }
}

/// Check if an external tool can be started.
///
/// `pdftotext -v` exits non-zero on some builds, so only a failed spawn counts.
fn check_tool(name: &str) -> Result<()> {
    match Command::new(name).arg("-v").output() {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(DuettError::ToolNotFound(name.to_string()))
        }
        Err(e) => Err(DuettError::ToolNotFound(format!("{}: {}", name, e))),
    }
}
