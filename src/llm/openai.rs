//! OpenAI chat completions implementation.

use super::{preview, ChatPrompt, LanguageModel};
use crate::error::{DuettError, Result, Stage};
use crate::openai::{api_error, create_client_with_timeout};
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, instrument};

/// OpenAI-based chat model.
pub struct OpenAIChatModel {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    temperature: f32,
}

impl OpenAIChatModel {
    pub fn with_config(model: &str, temperature: f32, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: create_client_with_timeout(timeout)?,
            model: model.to_string(),
            temperature,
        })
    }

    fn build_messages(prompt: &ChatPrompt) -> Result<Vec<ChatCompletionRequestMessage>> {
        let mut messages: Vec<ChatCompletionRequestMessage> = Vec::with_capacity(2);

        if let Some(system) = &prompt.system {
            messages.push(
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(system.clone())
                    .build()
                    .map_err(|e| DuettError::Config(e.to_string()))?
                    .into(),
            );
        }

        messages.push(
            ChatCompletionRequestUserMessageArgs::default()
                .content(prompt.user.clone())
                .build()
                .map_err(|e| DuettError::Config(e.to_string()))?
                .into(),
        );

        Ok(messages)
    }
}

#[async_trait]
impl LanguageModel for OpenAIChatModel {
    #[instrument(skip(self, prompt), fields(model = %self.model, prompt_chars = prompt.user.len()))]
    async fn complete(&self, prompt: &ChatPrompt) -> Result<String> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(Self::build_messages(prompt)?)
            .temperature(self.temperature)
            .build()
            .map_err(|e| DuettError::Config(e.to_string()))?;

        // The policy running this call retags the error with its stage
        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| api_error(Stage::Questions, "Chat completion failed", e))?;

        // A missing message is treated as empty text; each stage decides whether that is usable
        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        debug!("Completion: {}", preview(&content, 300));
        Ok(content)
    }

    fn model(&self) -> &str {
        &self.model
    }
}
