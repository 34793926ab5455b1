//! OpenRouter chat-completions client.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::LlmConfig;
use crate::llm::{LlmClient, LlmError};
use crate::utils::HttpClient;

/// Client for the OpenRouter chat-completions endpoint.
///
/// Holds the immutable provider configuration (endpoint, model, sampling,
/// site identity). The API key arrives per call and is never stored. One
/// call is one attempt; the pipeline owns retry.
#[derive(Debug, Clone)]
pub struct OpenRouterClient {
    client: HttpClient,
    config: LlmConfig,
}

impl OpenRouterClient {
    /// Build a client from an explicit configuration value
    pub fn new(config: LlmConfig) -> Result<Self, LlmError> {
        let client = HttpClient::with_timeout(Duration::from_secs(config.timeout_secs))?;
        Ok(Self { client, config })
    }

    /// The model this client sends completions to
    pub fn model(&self) -> &str {
        &self.config.model
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f64,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl LlmClient for OpenRouterClient {
    async fn complete(
        &self,
        prompt: &str,
        api_key: &str,
        request_id: &str,
    ) -> Result<String, LlmError> {
        let body = ChatRequest {
            model: &self.config.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        info!(
            "[{}] sending completion request to {}",
            request_id, self.config.model
        );

        let response = self
            .client
            .client()
            .post(&self.config.api_url)
            .bearer_auth(api_key)
            .header("HTTP-Referer", &self.config.site_url)
            .header("X-Title", &self.config.site_name)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            warn!(
                "[{}] completion request rejected with status {}",
                request_id, status
            );
            return Err(LlmError::Api {
                status: status.as_u16(),
                message: truncate(&message, 200),
            });
        }

        let envelope: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Envelope(e.to_string()))?;

        let content = envelope
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| LlmError::Envelope("response has no choices".to_string()))?;

        debug!("[{}] completion received, {} bytes", request_id, content.len());
        Ok(content)
    }
}

/// Cap upstream error bodies before they reach error messages and logs
fn truncate(text: &str, max: usize) -> String {
    if text.len() <= max {
        return text.to_string();
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}
