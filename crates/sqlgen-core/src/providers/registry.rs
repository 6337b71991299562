//! Model lookup by display id
//!
//! Every configured model is addressable as `"{provider}: {model}"`, which is
//! also the id recorded with each conversation.

use super::factory::ProviderRegistry;
use super::provider::{LlmAnswer, LlmProvider};
use crate::config::LlmConfig;
use crate::{Error, Result};
use std::sync::Arc;

struct ModelEntry {
    id: String,
    model: String,
    provider: Arc<dyn LlmProvider>,
}

/// Configured language models
#[derive(Default)]
pub struct LlmRegistry {
    entries: Vec<ModelEntry>,
}

impl LlmRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Instantiate every configured provider through the global factory registry
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let mut registry = Self::new();
        for provider_config in &config.providers {
            let provider = ProviderRegistry::global().create(provider_config)?;
            let models: Vec<String> = provider_config
                .models
                .iter()
                .map(|m| m.name.clone())
                .collect();
            registry.add_provider(provider, models);
        }
        tracing::debug!(models = registry.entries.len(), "LLM registry ready");
        Ok(registry)
    }

    /// Register a provider instance serving the given models
    pub fn add_provider(&mut self, provider: Arc<dyn LlmProvider>, models: Vec<String>) {
        for model in models {
            let id = Self::model_id(provider.name(), &model);
            self.entries.retain(|e| e.id != id);
            self.entries.push(ModelEntry {
                id,
                model,
                provider: Arc::clone(&provider),
            });
        }
    }

    pub fn model_id(provider: &str, model: &str) -> String {
        format!("{}: {}", provider, model)
    }

    /// Model ids in configuration order
    pub fn model_ids(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.id.clone()).collect()
    }

    pub fn contains(&self, model_id: &str) -> bool {
        self.entries.iter().any(|e| e.id == model_id)
    }

    /// Send a prompt to the model registered under `model_id`
    pub async fn prompt(&self, model_id: &str, prompt: &str) -> Result<LlmAnswer> {
        let entry = self
            .entries
            .iter()
            .find(|e| e.id == model_id)
            .ok_or_else(|| Error::config_error(format!("Unknown model '{}'", model_id)))?;

        entry.provider.prompt(&entry.model, prompt).await
    }
}
