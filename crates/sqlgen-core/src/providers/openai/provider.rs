//! OpenAI provider implementation

use super::{OpenAIConfig, types::*};
use crate::{
    Error, Result,
    providers::provider::{LlmAnswer, LlmProvider, ModelPricing, ProviderKind, ProviderMetadata},
};
use async_trait::async_trait;
use reqwest::Client;

/// OpenAI chat-completions provider
pub struct OpenAIProvider {
    client: Client,
    api_key: String,
    config: OpenAIConfig,
}

impl OpenAIProvider {
    /// Create a new OpenAI provider
    pub fn new(api_key: String, config: OpenAIConfig) -> Self {
        Self {
            client: Client::new(),
            api_key,
            config,
        }
    }

    /// Get static metadata (for factory)
    pub fn static_metadata() -> ProviderMetadata {
        ProviderMetadata {
            kind: ProviderKind::OpenAI,
            display_name: "OpenAI".to_string(),
            models: vec![
                "gpt-4o".to_string(),
                "gpt-4o-mini".to_string(),
                "gpt-4-turbo".to_string(),
            ],
        }
    }

    fn pricing(&self, model: &str) -> ModelPricing {
        self.config.pricing.get(model).copied().unwrap_or_default()
    }

    fn build_request<'a>(model: &'a str, prompt: &'a str) -> CompletionRequest<'a> {
        CompletionRequest {
            model,
            messages: [PromptMessage {
                role: "user",
                content: prompt,
            }],
            stream: false,
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAIProvider {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenAI
    }

    async fn prompt(&self, model: &str, prompt: &str) -> Result<LlmAnswer> {
        let url = format!("{}/chat/completions", self.config.base_url);
        let request = Self::build_request(model, prompt);

        tracing::debug!(provider = %self.config.name, model = %model, "Sending chat completion");

        let resp = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::LLMError(format!("Request failed: {}", e)))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let error_text = resp.text().await.unwrap_or_default();
            return Err(Error::LLMError(format!(
                "OpenAI API error {}: {}",
                status, error_text
            )));
        }

        let completion = resp
            .json::<CompletionResponse>()
            .await
            .map_err(|e| Error::LLMError(format!("Failed to parse response: {}", e)))?;

        let answer = completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| Error::LLMError("OpenAI response contained no answer".to_string()))?;
        let usage = completion.usage.unwrap_or_default();

        Ok(LlmAnswer {
            answer,
            model: completion.model,
            cost: self.pricing(model).cost(&usage),
            usage,
        })
    }
}
