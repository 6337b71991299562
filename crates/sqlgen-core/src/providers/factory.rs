//! Provider factory and registry
//!
//! Maps each [`ProviderKind`] to the constructor that builds it from a
//! `[[llm.providers]]` entry.

use super::provider::{LlmProvider, ModelPricing, ProviderKind, ProviderMetadata};
use crate::config::LlmProviderConfig;
use crate::{Error, Result};
use dashmap::DashMap;
use once_cell::sync::Lazy;
use std::sync::Arc;

static REGISTRY: Lazy<ProviderRegistry> = Lazy::new(|| {
    let registry = ProviderRegistry::new();
    registry.register(ProviderKind::OpenAI, Box::new(OpenAIFactory));
    registry
});

/// Constructors for every supported [`ProviderKind`]
pub struct ProviderRegistry {
    providers: DashMap<ProviderKind, Box<dyn ProviderFactory>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self {
            providers: DashMap::new(),
        }
    }

    /// Registry with the built-in OpenAI factory
    pub fn global() -> &'static Self {
        &REGISTRY
    }

    /// Add or replace the factory for `kind`
    pub fn register(&self, kind: ProviderKind, factory: Box<dyn ProviderFactory>) {
        self.providers.insert(kind, factory);
    }

    /// Create the provider described by one config entry
    ///
    /// # Errors
    /// Returns a configuration error if no factory handles the kind or the
    /// entry lacks what the provider needs.
    pub fn create(&self, config: &LlmProviderConfig) -> Result<Arc<dyn LlmProvider>> {
        let factory = self.providers.get(&config.kind).ok_or_else(|| {
            Error::config_error(format!("Provider '{}' not found", config.kind))
        })?;

        factory.create(config)
    }

    /// Metadata of every registered kind
    pub fn list_providers(&self) -> Vec<ProviderMetadata> {
        self.providers
            .iter()
            .map(|entry| entry.value().metadata())
            .collect()
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds one provider kind from configuration
pub trait ProviderFactory: Send + Sync {
    fn create(&self, config: &LlmProviderConfig) -> Result<Arc<dyn LlmProvider>>;

    fn metadata(&self) -> ProviderMetadata;
}

struct OpenAIFactory;

impl ProviderFactory for OpenAIFactory {
    fn create(&self, config: &LlmProviderConfig) -> Result<Arc<dyn LlmProvider>> {
        use crate::providers::openai::{OpenAIConfig, OpenAIProvider};

        let api_key = config.api_key.clone().ok_or_else(|| {
            Error::config_error(format!(
                "OpenAI API key not found for provider '{}'. Set api_key in config.toml or OPENAI_API_KEY env var",
                config.name
            ))
        })?;

        let mut openai_config = match config.base_url {
            Some(ref base_url) => OpenAIConfig::with_base_url(config.name.clone(), base_url.clone()),
            None => OpenAIConfig::default(config.name.clone()),
        };

        for model in &config.models {
            openai_config = openai_config.with_model(
                model.name.clone(),
                ModelPricing {
                    prompt_token_cost_per_1000: model.prompt_token_cost_per_1000,
                    output_token_cost_per_1000: model.output_token_cost_per_1000,
                },
            );
        }

        Ok(Arc::new(OpenAIProvider::new(api_key, openai_config)))
    }

    fn metadata(&self) -> ProviderMetadata {
        crate::providers::openai::OpenAIProvider::static_metadata()
    }
}
