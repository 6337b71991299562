//! Core types for sqlgen
//!
//! Shared by every other crate: the error type, configuration, table metadata,
//! prompt templates and the LLM provider abstraction.

pub mod config;
pub mod error;
pub mod prompt;
pub mod providers;
pub mod schema;
pub mod testing;

// Re-exports
pub use config::{
    DatabaseConfig, DatabaseEngine, DiscoveryConfig, EmbeddingConfig, EmbeddingModelConfig,
    KeywordConfig, LlmConfig, LlmModelConfig, LlmProviderConfig, ObservabilityConfig,
    SqlGenConfig,
};
pub use error::{Error, Result};
pub use prompt::PromptGenerator;
pub use providers::{LlmAnswer, LlmProvider, LlmRegistry, ProviderKind, TokenUsage};
pub use schema::{
    ColumnDescriptor, ForeignKey, SchemaIndex, TableDescriptor, TableKind, ViewDependency,
};
