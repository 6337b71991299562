//! Shared test utilities
//!
//! Mock implementations reused by the test modules of this and downstream crates.

use crate::providers::{LlmAnswer, LlmProvider, ProviderKind, TokenUsage};
use crate::Result;
use async_trait::async_trait;
use std::sync::Mutex;

/// Mock LLM provider for testing
///
/// Answers every prompt with a fixed text and remembers the prompts it received.
pub struct MockLlm {
    name: String,
    response_text: String,
    usage: TokenUsage,
    prompts: Mutex<Vec<String>>,
}

impl MockLlm {
    /// Create a new MockLlm with default response
    pub fn new() -> Self {
        Self::with_response("Test response")
    }

    /// Create a MockLlm with custom response text
    pub fn with_response(response: impl Into<String>) -> Self {
        Self {
            name: "Mock".to_string(),
            response_text: response.into(),
            usage: TokenUsage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            },
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Prompts received so far
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl Default for MockLlm {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LlmProvider for MockLlm {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenAI
    }

    async fn prompt(&self, model: &str, prompt: &str) -> Result<LlmAnswer> {
        self.prompts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(prompt.to_string());

        Ok(LlmAnswer {
            answer: self.response_text.clone(),
            model: model.to_string(),
            usage: self.usage,
            cost: 0.0,
        })
    }
}
