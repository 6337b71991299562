//! OpenAI provider
//!
//! Chat completions only; answers are requested without streaming because the
//! generated SQL is parsed from the complete response.

pub mod provider;
pub mod types;

pub use provider::OpenAIProvider;

use super::ModelPricing;
use std::collections::HashMap;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAI configuration
#[derive(Clone, Debug)]
pub struct OpenAIConfig {
    /// Display name used in model ids
    pub name: String,
    /// Base URL for API requests
    pub base_url: String,
    /// Price table per model name
    pub pricing: HashMap<String, ModelPricing>,
}

impl OpenAIConfig {
    /// Create default configuration
    pub fn default(name: impl Into<String>) -> Self {
        Self::with_base_url(name, DEFAULT_BASE_URL)
    }

    /// Create configuration with custom base URL (e.g., for a compatible gateway)
    pub fn with_base_url(name: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            pricing: HashMap::new(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>, pricing: ModelPricing) -> Self {
        self.pricing.insert(model.into(), pricing);
        self
    }
}
