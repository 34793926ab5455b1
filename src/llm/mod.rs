//! LLM completion clients for reference extraction.
//!
//! This module defines the [`LlmClient`] trait the extraction pipeline talks
//! to, the OpenRouter implementation used in production, the prompt template,
//! and the best-effort JSON extractor applied to model replies. A scripted
//! [`MockLlmClient`] is available for tests.

mod extract;
mod openrouter;
mod prompt;

pub mod mock;

pub use extract::extract_json;
pub use mock::MockLlmClient;
pub use openrouter::OpenRouterClient;
pub use prompt::extraction_prompt;

use async_trait::async_trait;

/// Interface to a chat-completion provider.
///
/// Implementations send one prompt and return the raw completion text. They
/// must not retry internally; bounded retry belongs to the pipeline.
#[async_trait]
pub trait LlmClient: Send + Sync + std::fmt::Debug {
    /// Send a prompt and return the model's raw text reply.
    ///
    /// The API key is supplied per call and must not be stored. The
    /// `request_id` is an opaque correlation id carried into log lines.
    async fn complete(
        &self,
        prompt: &str,
        api_key: &str,
        request_id: &str,
    ) -> Result<String, LlmError>;
}

/// Errors that can occur when calling a completion provider
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// Non-2xx response from the provider
    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// Network, connect, or timeout error
    #[error("Network error: {0}")]
    Network(String),

    /// Response decoded but the expected envelope fields were missing
    #[error("Malformed response envelope: {0}")]
    Envelope(String),
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        LlmError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for LlmError {
    fn from(err: serde_json::Error) -> Self {
        LlmError::Envelope(format!("JSON: {}", err))
    }
}
