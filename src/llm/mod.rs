//! Conversational language model access.
//!
//! Model output is free text with no schema guarantee; every stage that calls
//! a [`LanguageModel`] parses the completion itself.

mod openai;

pub use openai::OpenAIChatModel;

use crate::error::Result;
use async_trait::async_trait;

/// A rendered prompt: optional system instructions plus the user message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatPrompt {
    pub system: Option<String>,
    pub user: String,
}

impl ChatPrompt {
    /// A prompt with only a user message.
    pub fn user(user: impl Into<String>) -> Self {
        Self {
            system: None,
            user: user.into(),
        }
    }

    /// Attach system instructions. Blank instructions are dropped.
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        let system = system.into();
        self.system = if system.trim().is_empty() {
            None
        } else {
            Some(system)
        };
        self
    }
}

/// Trait for chat completion backends.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Send one prompt and return the completion text.
    async fn complete(&self, prompt: &ChatPrompt) -> Result<String>;

    /// Model identifier, for logging.
    fn model(&self) -> &str;
}

/// The first `max_chars` characters of a completion, for log lines.
pub fn preview(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}
