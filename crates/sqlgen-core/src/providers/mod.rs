//! LLM provider implementations
//!
//! # Architecture
//!
//! A provider implements [`LlmProvider`] and is built from a `[[llm.providers]]`
//! config entry by the [`ProviderFactory`] registered for its [`ProviderKind`].
//! [`LlmRegistry`] exposes every configured model under a `"{provider}: {model}"` id.
//!
//! # Available Providers
//!
//! - **OpenAI**: chat completions (also any OpenAI-compatible gateway via `base_url`)
//!
//! # Example
//!
//! ```ignore
//! use sqlgen_core::{LlmRegistry, SqlGenConfig};
//!
//! let config = SqlGenConfig::load()?;
//! let llms = LlmRegistry::from_config(&config.llm)?;
//! let answer = llms.prompt("OpenAI: gpt-4o-mini", "Say hi").await?;
//! println!("{} ({} tokens)", answer.answer, answer.usage.total_tokens);
//! ```

pub mod factory;
pub mod provider;
pub mod registry;

// Provider implementations
pub mod openai;

// Tests
#[cfg(test)]
mod provider_tests;

// Re-exports
pub use factory::{ProviderFactory, ProviderRegistry};
pub use provider::{
    LlmAnswer, LlmProvider, ModelPricing, ProviderKind, ProviderMetadata, TokenUsage,
};
pub use registry::LlmRegistry;

pub use openai::OpenAIProvider;
