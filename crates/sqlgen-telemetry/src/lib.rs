//! # sqlgen Telemetry
//!
//! OpenTelemetry integration for table discovery and LLM calls.
//!
//! Every discovery request and every LLM call can be recorded as a span with
//! the attribute names defined in [`attributes`].

mod spans;
mod tracer;

pub use spans::{DiscoverySpanAttributes, LLMSpanAttributes, trace_discovery, trace_llm_call};
pub use tracer::{
    DEFAULT_LOG_FILTER, ProcessorBuilder, TelemetryOptions, init_telemetry, init_telemetry_with,
    register_span_processor, tracer_provider,
};

/// OpenTelemetry span attribute constants.
pub mod attributes {
    // Generic AI attributes
    pub const GEN_AI_OPERATION_NAME: &str = "gen_ai.operation.name";
    pub const GEN_AI_SYSTEM: &str = "gen_ai.system";
    pub const GEN_AI_REQUEST_MODEL: &str = "gen_ai.request.model";
    pub const GEN_AI_USAGE_INPUT_TOKENS: &str = "gen_ai.usage.input_tokens";
    pub const GEN_AI_USAGE_OUTPUT_TOKENS: &str = "gen_ai.usage.output_tokens";

    // Database attributes
    pub const DB_NAME: &str = "db.name";

    // sqlgen attributes
    pub const SQLGEN_OPERATION_NAME: &str = "sqlgen.operation.name";
    pub const SQLGEN_QUERY: &str = "sqlgen.query";
    pub const SQLGEN_SIMILARITY_THRESHOLD: &str = "sqlgen.similarity_threshold";
    pub const SQLGEN_MAX_SYNONYMS: &str = "sqlgen.max_synonyms";
    pub const SQLGEN_KEYWORD_COUNT: &str = "sqlgen.keyword_count";
    pub const SQLGEN_TABLE_COUNT: &str = "sqlgen.table_count";
    pub const SQLGEN_CONVERSATION_ID: &str = "sqlgen.conversation_id";
    pub const SQLGEN_LLM_COST: &str = "sqlgen.llm_cost";
    pub const SQLGEN_DURATION_MS: &str = "sqlgen.duration_ms";

    // System name constant
    pub const SYSTEM_NAME: &str = "sqlgen";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attributes_constants() {
        assert_eq!(attributes::GEN_AI_OPERATION_NAME, "gen_ai.operation.name");
        assert_eq!(attributes::GEN_AI_SYSTEM, "gen_ai.system");
        assert_eq!(attributes::SYSTEM_NAME, "sqlgen");
    }
}
