//! Provider trait and answer types

use crate::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Provider implementations known to the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProviderKind {
    #[serde(rename = "openai")]
    OpenAI,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAI => "openai",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(ProviderKind::OpenAI),
            other => Err(Error::config_error(format!(
                "Unknown provider kind '{}'",
                other
            ))),
        }
    }
}

/// Token counts reported by the provider
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Per-model token prices (currency units per 1000 tokens)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelPricing {
    pub prompt_token_cost_per_1000: f64,
    pub output_token_cost_per_1000: f64,
}

impl ModelPricing {
    pub fn cost(&self, usage: &TokenUsage) -> f64 {
        (usage.prompt_tokens as f64 * self.prompt_token_cost_per_1000
            + usage.completion_tokens as f64 * self.output_token_cost_per_1000)
            / 1000.0
    }
}

/// One completed prompt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmAnswer {
    pub answer: String,
    pub model: String,
    pub usage: TokenUsage,
    pub cost: f64,
}

/// Provider metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderMetadata {
    pub kind: ProviderKind,
    /// Display name (e.g., "OpenAI")
    pub display_name: String,
    /// Models the provider is known to serve
    pub models: Vec<String>,
}

/// A chat-completion backend
///
/// One provider instance serves every model configured under it; `model` selects
/// which one answers the prompt.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Configured display name
    fn name(&self) -> &str;

    fn kind(&self) -> ProviderKind;

    /// Send a single user prompt and wait for the full answer
    async fn prompt(&self, model: &str, prompt: &str) -> Result<LlmAnswer>;
}
