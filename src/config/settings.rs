//! Configuration settings for Duett.

use crate::audio::speaker_token;
use crate::error::{DuettError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub chunking: ChunkingSettings,
    pub embedding: EmbeddingSettings,
    pub llm: LlmSettings,
    pub rag: RagSettings,
    pub script: ScriptSettings,
    pub speech: SpeechSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory where generated podcasts are written.
    pub output_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
    /// Timeout for a single external call, in seconds.
    pub request_timeout_secs: u64,
    /// Retries for transient external call failures.
    pub max_retries: u32,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            output_dir: "~/duett".to_string(),
            log_level: "warn".to_string(),
            request_timeout_secs: 300,
            max_retries: 2,
        }
    }
}

/// Text chunking settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingSettings {
    /// Maximum chunk length in characters.
    pub chunk_size: usize,
    /// Characters repeated from the previous chunk.
    pub chunk_overlap: usize,
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

/// Embedding generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Embedding model to use.
    pub model: String,
    /// Embedding dimensions.
    pub dimensions: u32,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            model: "text-embedding-3-small".to_string(),
            dimensions: 1536,
        }
    }
}

/// Language model settings shared by every prompt stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// Chat model used for questions, answers and the script.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            temperature: 0.7,
        }
    }
}

/// Retrieval settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagSettings {
    /// Chunks retrieved for each question.
    pub top_k_per_question: usize,
    /// Questions kept from the model's list.
    pub max_questions: usize,
}

impl Default for RagSettings {
    fn default() -> Self {
        Self {
            top_k_per_question: 3,
            max_questions: 10,
        }
    }
}

/// Script compilation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptSettings {
    /// Word ceiling requested from the model.
    pub word_limit: usize,
    /// Target episode length in minutes.
    pub target_minutes: u32,
    /// Intro length in seconds.
    pub intro_seconds: u32,
    /// Outro length in seconds.
    pub outro_seconds: u32,
}

impl Default for ScriptSettings {
    fn default() -> Self {
        Self {
            word_limit: 1000,
            target_minutes: 7,
            intro_seconds: 20,
            outro_seconds: 20,
        }
    }
}

/// One podcast host: the name used in the script and the voice that reads it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpeakerSettings {
    /// Display name, written in upper case as the script's speaker token.
    pub name: String,
    /// Voice identifier passed to the speech synthesizer.
    pub voice: String,
}

/// Speech synthesis settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechSettings {
    /// Speech model to use.
    pub model: String,
    /// Playback speed passed to the synthesizer.
    pub speed: f32,
    /// Language code passed to the synthesizer.
    pub language: String,
    /// Lines synthesized at the same time.
    pub max_concurrent: usize,
    /// First host.
    pub speaker_a: SpeakerSettings,
    /// Second host.
    pub speaker_b: SpeakerSettings,
}

impl Default for SpeechSettings {
    fn default() -> Self {
        Self {
            model: "tts-1".to_string(),
            speed: 1.0,
            language: "en-us".to_string(),
            max_concurrent: 1,
            speaker_a: SpeakerSettings {
                name: "Sarah".to_string(),
                voice: "nova".to_string(),
            },
            speaker_b: SpeakerSettings {
                name: "Michael".to_string(),
                voice: "onyx".to_string(),
            },
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: std::collections::HashMap<String, String>,
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        let settings = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Settings::default()
        };

        settings.validate()?;
        Ok(settings)
    }

    /// Reject combinations the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            return Err(DuettError::Config(format!(
                "chunking.chunk_overlap ({}) must be smaller than chunking.chunk_size ({})",
                self.chunking.chunk_overlap, self.chunking.chunk_size
            )));
        }
        if self.rag.top_k_per_question == 0 {
            return Err(DuettError::Config(
                "rag.top_k_per_question must be at least 1".to_string(),
            ));
        }
        if self.speech.speaker_a.name.trim().is_empty()
            || self.speech.speaker_b.name.trim().is_empty()
        {
            return Err(DuettError::Config("speaker names must not be empty".to_string()));
        }
        if speaker_token(&self.speech.speaker_a.name) == speaker_token(&self.speech.speaker_b.name) {
            return Err(DuettError::Config(
                "speech.speaker_a and speech.speaker_b need different names".to_string(),
            ));
        }
        Ok(())
    }

    /// Save settings to the default configuration file.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::default_config_path())
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| DuettError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("duett")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded output directory path.
    pub fn output_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.output_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.chunking.chunk_size, 1000);
        assert_eq!(settings.chunking.chunk_overlap, 200);
        assert_eq!(settings.rag.top_k_per_question, 3);
        assert_eq!(settings.script.word_limit, 1000);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let settings: Settings = toml::from_str(
            r#"
            [chunking]
            chunk_size = 500

            [speech.speaker_b]
            name = "Alex"
            voice = "echo"
            "#,
        )
        .unwrap();

        assert_eq!(settings.chunking.chunk_size, 500);
        assert_eq!(settings.chunking.chunk_overlap, 200);
        assert_eq!(settings.speech.speaker_a.name, "Sarah");
        assert_eq!(settings.speech.speaker_b.voice, "echo");
    }

    #[test]
    fn test_overlap_must_be_smaller_than_size() {
        let mut settings = Settings::default();
        settings.chunking.chunk_overlap = settings.chunking.chunk_size;
        assert!(matches!(settings.validate(), Err(DuettError::Config(_))));
    }

    #[test]
    fn test_speaker_names_must_differ() {
        let mut settings = Settings::default();
        settings.speech.speaker_b.name = "sarah".to_string();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut settings = Settings::default();
        settings.rag.top_k_per_question = 5;
        settings.save_to(&path).unwrap();

        let loaded = Settings::load_from(Some(&path)).unwrap();
        assert_eq!(loaded.rag.top_k_per_question, 5);
    }
}
