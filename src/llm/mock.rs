//! Mock LLM client for testing purposes.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::llm::{LlmClient, LlmError};

/// A mock completion client that replays scripted responses.
///
/// Responses pushed with [`push_reply`](Self::push_reply) or
/// [`push_failure`](Self::push_failure) are consumed in order; once the queue
/// is empty the default reply (if any) is repeated, otherwise every call
/// fails. Call counts and received prompts are recorded for assertions.
#[derive(Debug, Default)]
pub struct MockLlmClient {
    responses: Mutex<VecDeque<Result<String, LlmError>>>,
    default_reply: Mutex<Option<String>>,
    received: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl MockLlmClient {
    /// Create a mock with an empty script. Every call fails until a
    /// response is pushed, which makes a fresh mock an always-failing stub.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful completion.
    pub fn push_reply(&self, content: impl Into<String>) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Ok(content.into()));
    }

    /// Queue a failed completion.
    pub fn push_failure(&self, error: LlmError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    /// Reply to use whenever the queue is empty.
    pub fn set_default_reply(&self, content: impl Into<String>) {
        let mut guard = self.default_reply.lock().unwrap();
        *guard = Some(content.into());
    }

    /// Number of completion calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Prompts received, in call order.
    pub fn received_prompts(&self) -> Vec<String> {
        self.received.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(
        &self,
        prompt: &str,
        _api_key: &str,
        _request_id: &str,
    ) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.received.lock().unwrap().push(prompt.to_string());

        if let Some(scripted) = self.responses.lock().unwrap().pop_front() {
            return scripted;
        }
        if let Some(content) = self.default_reply.lock().unwrap().clone() {
            return Ok(content);
        }
        Err(LlmError::Network("mock response queue exhausted".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_replies_consumed_in_order() {
        let mock = MockLlmClient::new();
        mock.push_reply("first");
        mock.push_failure(LlmError::Network("down".to_string()));
        mock.push_reply("second");

        assert_eq!(mock.complete("p", "k", "r").await.unwrap(), "first");
        assert!(mock.complete("p", "k", "r").await.is_err());
        assert_eq!(mock.complete("p", "k", "r").await.unwrap(), "second");
        assert_eq!(mock.calls(), 3);
    }

    #[tokio::test]
    async fn test_default_reply_when_queue_empty() {
        let mock = MockLlmClient::new();
        mock.set_default_reply("fallback");

        assert_eq!(mock.complete("a", "k", "r").await.unwrap(), "fallback");
        assert_eq!(mock.complete("b", "k", "r").await.unwrap(), "fallback");
        assert_eq!(mock.received_prompts(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_empty_mock_always_fails() {
        let mock = MockLlmClient::new();
        assert!(mock.complete("p", "k", "r").await.is_err());
        assert!(mock.complete("p", "k", "r").await.is_err());
        assert_eq!(mock.calls(), 2);
    }
}
