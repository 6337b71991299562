//! Runner for SQL generation requests and metadata publishing

pub mod generator;
pub mod pipeline;

pub use generator::{
    Generation, GenerationOutcome, GenerationRequest, NO_TABLES_FOUND, SEARCH_PROVIDER,
    SqlGenerator, SqlGeneratorBuilder, extract_sql, schema_text,
};
pub use pipeline::{PublishFailure, PublishReport, PublishedIndex, publish_all};
