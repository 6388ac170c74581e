//! Error types for Duett.

use std::fmt;
use thiserror::Error;

/// Pipeline stage, used to tell the caller where a run failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Extraction,
    Indexing,
    Questions,
    Answers,
    Script,
    Audio,
}

impl Stage {
    /// All stages in execution order.
    pub const ALL: [Stage; 6] = [
        Stage::Extraction,
        Stage::Indexing,
        Stage::Questions,
        Stage::Answers,
        Stage::Script,
        Stage::Audio,
    ];

    /// 1-based position of the stage in a run.
    pub fn number(self) -> usize {
        Self::ALL.iter().position(|s| *s == self).unwrap_or(0) + 1
    }

    /// Human-readable label for progress output.
    pub fn label(self) -> &'static str {
        match self {
            Stage::Extraction => "Reading the document",
            Stage::Indexing => "Chunking and indexing",
            Stage::Questions => "Identifying key questions",
            Stage::Answers => "Finding answers in the document",
            Stage::Script => "Writing the podcast script",
            Stage::Audio => "Generating audio",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Extraction => "extraction",
            Stage::Indexing => "indexing",
            Stage::Questions => "questions",
            Stage::Answers => "answers",
            Stage::Script => "script",
            Stage::Audio => "audio",
        };
        f.write_str(name)
    }
}

/// Library-level error type for Duett operations.
#[derive(Error, Debug)]
pub enum DuettError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Document extraction failed: {0}")]
    Extraction(String),

    #[error("Embedding dimension error: {0}")]
    EmbeddingDimension(String),

    #[error("Unusable model output in {stage} stage: {message}")]
    ModelOutputParse { stage: Stage, message: String },

    #[error("Script line {line} could not be parsed ({reason}): {raw:?}")]
    ScriptLineParse {
        line: usize,
        raw: String,
        reason: String,
    },

    #[error("Sample rate mismatch at script line {line}: expected {expected} Hz, got {found} Hz")]
    SampleRateMismatch {
        line: usize,
        expected: u32,
        found: u32,
    },

    /// `retryable` is false when the service rejected the request itself
    /// (bad key, unknown model or voice), so repeating it cannot help.
    #[error("External call failed in {stage} stage: {message}")]
    ExternalCall {
        stage: Stage,
        message: String,
        retryable: bool,
    },

    #[error("{stage} stage failed: {source}")]
    Stage {
        stage: Stage,
        #[source]
        source: Box<DuettError>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    #[error("External tool not found: {0}. Please install it and ensure it's in your PATH.")]
    ToolNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl DuettError {
    /// A collaborator failure worth retrying: network errors, timeouts, overload.
    pub fn external(stage: Stage, message: impl Into<String>) -> Self {
        DuettError::ExternalCall {
            stage,
            message: message.into(),
            retryable: true,
        }
    }

    /// A collaborator refused the request; retrying gives the same answer.
    pub fn rejected(stage: Stage, message: impl Into<String>) -> Self {
        DuettError::ExternalCall {
            stage,
            message: message.into(),
            retryable: false,
        }
    }

    /// A failed HTTP response, retryable only for rate limits and server errors.
    pub fn from_status(stage: Stage, status: u16, message: impl Into<String>) -> Self {
        DuettError::ExternalCall {
            stage,
            message: message.into(),
            retryable: is_retryable_status(status),
        }
    }

    /// Shorthand for an unusable model response.
    pub fn model_output(stage: Stage, message: impl Into<String>) -> Self {
        DuettError::ModelOutputParse {
            stage,
            message: message.into(),
        }
    }

    /// Attach the failing stage. Errors already tagged keep their stage.
    pub fn in_stage(self, stage: Stage) -> Self {
        match self {
            DuettError::Stage { .. } => self,
            other => DuettError::Stage {
                stage,
                source: Box::new(other),
            },
        }
    }

    /// The stage this error was raised in, if known.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            DuettError::Stage { stage, .. }
            | DuettError::ExternalCall { stage, .. }
            | DuettError::ModelOutputParse { stage, .. } => Some(*stage),
            DuettError::Extraction(_) => Some(Stage::Extraction),
            DuettError::EmbeddingDimension(_) => Some(Stage::Indexing),
            DuettError::ScriptLineParse { .. } | DuettError::SampleRateMismatch { .. } => {
                Some(Stage::Audio)
            }
            _ => None,
        }
    }

    /// Whether retrying the failed call could succeed.
    ///
    /// Only retryable collaborator failures qualify; malformed output is never retried.
    pub fn is_transient(&self) -> bool {
        match self {
            DuettError::ExternalCall { retryable, .. } => *retryable,
            DuettError::Stage { source, .. } => source.is_transient(),
            _ => false,
        }
    }
}

/// 429 and 5xx responses may succeed later; every other status is final.
pub fn is_retryable_status(status: u16) -> bool {
    status == 429 || (500..600).contains(&status)
}

/// Result type alias for Duett operations.
pub type Result<T> = std::result::Result<T, DuettError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_numbers_follow_run_order() {
        assert_eq!(Stage::Extraction.number(), 1);
        assert_eq!(Stage::Audio.number(), 6);
    }

    #[test]
    fn test_in_stage_keeps_first_stage() {
        let err = DuettError::Extraction("empty".into())
            .in_stage(Stage::Extraction)
            .in_stage(Stage::Audio);
        assert_eq!(err.stage(), Some(Stage::Extraction));
        assert!(err.to_string().starts_with("extraction stage failed"));
    }

    #[test]
    fn test_only_external_calls_are_transient() {
        assert!(DuettError::external(Stage::Script, "timeout").is_transient());
        assert!(DuettError::external(Stage::Script, "503")
            .in_stage(Stage::Script)
            .is_transient());
        assert!(!DuettError::model_output(Stage::Questions, "empty").is_transient());
        assert!(!DuettError::rejected(Stage::Audio, "invalid voice").is_transient());
        assert!(!DuettError::ScriptLineParse {
            line: 1,
            raw: "x".into(),
            reason: "no speaker".into()
        }
        .is_transient());
    }

    #[test]
    fn test_status_decides_retry() {
        assert!(DuettError::from_status(Stage::Audio, 429, "slow down").is_transient());
        assert!(DuettError::from_status(Stage::Audio, 503, "unavailable").is_transient());
        assert!(!DuettError::from_status(Stage::Audio, 401, "bad key").is_transient());
        assert!(!DuettError::from_status(Stage::Audio, 400, "bad voice").is_transient());
        assert!(!DuettError::from_status(Stage::Audio, 404, "no model").is_transient());
    }
}
