//! Span creation helpers for table discovery and LLM calls

use crate::attributes::*;

/// Attributes for tracing one discovery request
#[derive(Debug, Clone)]
pub struct DiscoverySpanAttributes {
    pub database: String,
    pub query: String,
    pub similarity_threshold: u8,
    pub max_synonyms: usize,
    pub keyword_count: usize,
    pub table_count: usize,
    pub duration_ms: u64,
}

/// Attributes for tracing an LLM call
#[derive(Debug, Clone)]
pub struct LLMSpanAttributes {
    pub model: String,
    pub conversation_id: String,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub cost: f64,
    pub duration_ms: u64,
}

/// Record a span for one discovery request.
pub fn trace_discovery(attrs: DiscoverySpanAttributes) {
    let span = tracing::info_span!(
        "discover_tables",
        { SQLGEN_OPERATION_NAME } = "discover_tables",
        { DB_NAME } = %attrs.database,
        { SQLGEN_QUERY } = %attrs.query,
        { SQLGEN_SIMILARITY_THRESHOLD } = attrs.similarity_threshold as i64,
        { SQLGEN_MAX_SYNONYMS } = attrs.max_synonyms as i64,
        { SQLGEN_KEYWORD_COUNT } = attrs.keyword_count as i64,
        { SQLGEN_TABLE_COUNT } = attrs.table_count as i64,
        { SQLGEN_DURATION_MS } = attrs.duration_ms as i64,
    );

    // Enter and immediately exit the span (it's recorded)
    let _guard = span.enter();
}

/// Record a span for one LLM generation call.
///
/// Follows the OpenTelemetry generative-AI conventions for model and token usage.
pub fn trace_llm_call(attrs: LLMSpanAttributes) {
    let span = tracing::info_span!(
        "call_llm",
        { GEN_AI_SYSTEM } = SYSTEM_NAME,
        { GEN_AI_OPERATION_NAME } = "chat",
        { GEN_AI_REQUEST_MODEL } = %attrs.model,
        { GEN_AI_USAGE_INPUT_TOKENS } = attrs.prompt_tokens as i64,
        { GEN_AI_USAGE_OUTPUT_TOKENS } = attrs.completion_tokens as i64,
        { SQLGEN_CONVERSATION_ID } = %attrs.conversation_id,
        { SQLGEN_LLM_COST } = attrs.cost,
        { SQLGEN_DURATION_MS } = attrs.duration_ms as i64,
    );

    let _guard = span.enter();
}
