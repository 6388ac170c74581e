//! Configuration module for Duett.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{AnswerPrompts, Prompts, QuestionPrompts, ScriptPrompts};
pub use settings::{
    ChunkingSettings, EmbeddingSettings, GeneralSettings, LlmSettings, PromptSettings,
    RagSettings, ScriptSettings, Settings, SpeakerSettings, SpeechSettings,
};
