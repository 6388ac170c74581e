//! OpenAI embeddings implementation.

use super::Embedder;
use crate::error::{DuettError, Result, Stage};
use crate::openai::{api_error, create_client_with_timeout};
use async_openai::types::{CreateEmbeddingRequestArgs, EmbeddingInput};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, instrument};

/// Texts sent per embeddings request.
const BATCH_SIZE: usize = 100;

/// OpenAI-based embedder.
pub struct OpenAIEmbedder {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    dimensions: usize,
}

impl OpenAIEmbedder {
    /// Create a new OpenAI embedder with default settings.
    pub fn new() -> Result<Self> {
        Self::with_config("text-embedding-3-small", 1536)
    }

    /// Create a new OpenAI embedder with custom model and dimensions.
    pub fn with_config(model: &str, dimensions: usize) -> Result<Self> {
        Self::with_timeout(model, dimensions, Duration::from_secs(crate::openai::DEFAULT_TIMEOUT_SECS))
    }

    /// Create a new OpenAI embedder with a custom HTTP timeout.
    pub fn with_timeout(model: &str, dimensions: usize, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: create_client_with_timeout(timeout)?,
            model: model.to_string(),
            dimensions,
        })
    }
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    #[instrument(skip(self, text))]
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let embeddings = self.embed_batch(&[text.to_string()]).await?;
        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| DuettError::external(Stage::Indexing, "Empty embedding response"))
    }

    #[instrument(skip(self, texts), fields(count = texts.len()))]
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Generating embeddings for {} texts", texts.len());

        // The API caps inputs per request, so large documents are paged
        let mut all_embeddings = Vec::with_capacity(texts.len());

        for chunk in texts.chunks(BATCH_SIZE) {
            let request = CreateEmbeddingRequestArgs::default()
                .model(&self.model)
                .input(EmbeddingInput::StringArray(chunk.to_vec()))
                .dimensions(self.dimensions as u32)
                .build()
                .map_err(|e| DuettError::Config(format!("Failed to build embedding request: {}", e)))?;

            let response = self
                .client
                .embeddings()
                .create(request)
                .await
                .map_err(|e| api_error(Stage::Indexing, "Embedding API error", e))?;

            // Sort by index to ensure correct order
            let mut embeddings: Vec<_> = response.data.into_iter().collect();
            embeddings.sort_by_key(|e| e.index);

            all_embeddings.extend(embeddings.into_iter().map(|e| e.embedding));
        }

        debug!("Generated {} embeddings", all_embeddings.len());
        Ok(all_embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
