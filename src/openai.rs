//! OpenAI client configuration with sensible defaults.

use crate::error::{DuettError, Result, Stage};
use async_openai::error::{ApiError, OpenAIError};
use async_openai::{config::OpenAIConfig, Client};
use std::time::Duration;

/// Default timeout for OpenAI API requests (5 minutes).
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Create an OpenAI client with a custom timeout.
pub fn create_client_with_timeout(timeout: Duration) -> Result<Client<OpenAIConfig>> {
    let http_client = create_http_client(timeout)?;
    Ok(Client::with_config(OpenAIConfig::default()).with_http_client(http_client))
}

/// Create a plain HTTP client for endpoints called without async-openai.
pub fn create_http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| DuettError::Config(format!("Failed to create HTTP client: {}", e)))
}

/// Read the API key from the environment.
pub fn api_key() -> Option<String> {
    std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.is_empty())
}

/// Convert an async-openai failure into an external call error.
///
/// The client already backs off on 429 and 5xx before giving up, so an
/// `ApiError` is retried only when it still reports overload. Transport
/// errors are retried unless they carry a final status.
pub fn api_error(stage: Stage, context: &str, err: OpenAIError) -> DuettError {
    let message = format!("{}: {}", context, err);
    match &err {
        OpenAIError::Reqwest(e) => match e.status() {
            Some(status) => DuettError::from_status(stage, status.as_u16(), message),
            None => DuettError::external(stage, message),
        },
        OpenAIError::ApiError(api) if is_overloaded(api) => DuettError::external(stage, message),
        _ => DuettError::rejected(stage, message),
    }
}

/// `insufficient_quota` arrives as a 429 too, but only billing fixes it.
fn is_overloaded(api: &ApiError) -> bool {
    let code = api.code.as_deref().unwrap_or_default();
    let kind = api.r#type.as_deref().unwrap_or_default();
    code == "rate_limit_exceeded" || kind == "server_error" || kind == "rate_limit_error"
}
