use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use sqlgen_core::{Error, LlmAnswer, LlmRegistry, PromptGenerator, Result, TableDescriptor};
use sqlgen_database::{ConversationRecord, Feedback, HistoryStore, QueryRows};
use sqlgen_discovery::DiscoveryOrchestrator;
use sqlgen_telemetry::{LLMSpanAttributes, trace_llm_call};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

/// Label stored with every conversation for the table search that was used
pub const SEARCH_PROVIDER: &str = "fuzzy";

/// Answer recorded when discovery finds nothing
pub const NO_TABLES_FOUND: &str = "No tables found";

static SQL_BLOCK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<SQL>([\s\S]*?)</SQL>").expect("SQL block pattern is valid"));

/// A question to turn into SQL
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub database: String,
    pub question: String,
    /// `"{provider}: {model}"` as listed by [`LlmRegistry::model_ids`]
    pub model_id: String,
    pub similarity_threshold: u8,
    pub max_synonyms: usize,
}

impl GenerationRequest {
    pub fn new(
        database: impl Into<String>,
        question: impl Into<String>,
        model_id: impl Into<String>,
    ) -> Self {
        Self {
            database: database.into(),
            question: question.into(),
            model_id: model_id.into(),
            similarity_threshold: 90,
            max_synonyms: 5,
        }
    }

    pub fn with_similarity_threshold(mut self, threshold: u8) -> Self {
        self.similarity_threshold = threshold;
        self
    }

    pub fn with_max_synonyms(mut self, max_synonyms: usize) -> Self {
        self.max_synonyms = max_synonyms;
        self
    }

    fn rag_parameters(&self) -> String {
        #[derive(Serialize)]
        struct RagParameters {
            similarity_threshold: u8,
            max_synonyms: usize,
        }
        serde_json::to_string(&RagParameters {
            similarity_threshold: self.similarity_threshold,
            max_synonyms: self.max_synonyms,
        })
        .unwrap_or_default()
    }
}

#[derive(Debug, Clone)]
pub enum GenerationOutcome {
    /// Discovery matched no tables; the model was not called
    NoTablesFound,
    /// The model answered without a `<SQL>...</SQL>` block
    Unparsed { response: String },
    Generated {
        sql: String,
        tables: Vec<TableDescriptor>,
        answer: LlmAnswer,
    },
}

/// Outcome of one request plus the id it was recorded under
#[derive(Debug, Clone)]
pub struct Generation {
    pub conversation_id: String,
    pub outcome: GenerationOutcome,
}

impl Generation {
    pub fn sql(&self) -> Option<&str> {
        match &self.outcome {
            GenerationOutcome::Generated { sql, .. } => Some(sql),
            _ => None,
        }
    }
}

/// Render tables as prompt schema text
///
/// One line per table: `schema.table (column type [PK] [NULL], ...)`.
pub fn schema_text(tables: &[TableDescriptor]) -> String {
    tables
        .iter()
        .map(|table| {
            let columns: Vec<String> = table
                .columns
                .iter()
                .map(|column| {
                    let mut text = format!("{} {}", column.name, column.data_type);
                    if column.is_primary_key {
                        text.push_str(" PK");
                    }
                    if column.is_nullable {
                        text.push_str(" NULL");
                    }
                    text
                })
                .collect();
            format!("{} ({})", table.qualified_name(), columns.join(", "))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Statement between the first `<SQL>` and `</SQL>` markers, trimmed
pub fn extract_sql(response: &str) -> Option<String> {
    SQL_BLOCK_RE
        .captures(response)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str().trim().to_string())
}

/// Turns questions into SQL: discovery, prompt, model call, history
pub struct SqlGenerator {
    discovery: DiscoveryOrchestrator,
    llm: Arc<LlmRegistry>,
    prompts: Arc<PromptGenerator>,
    template: String,
    history: Option<Arc<dyn HistoryStore>>,
}

impl SqlGenerator {
    pub fn builder() -> SqlGeneratorBuilder {
        SqlGeneratorBuilder::new()
    }

    pub fn discovery(&self) -> &DiscoveryOrchestrator {
        &self.discovery
    }

    pub fn model_ids(&self) -> Vec<String> {
        self.llm.model_ids()
    }

    pub async fn generate(&self, request: &GenerationRequest) -> Result<Generation> {
        let started = Instant::now();
        let conversation_id = Uuid::new_v4().to_string();

        let matched = self
            .discovery
            .discover(
                &request.database,
                &request.question,
                request.similarity_threshold,
                request.max_synonyms,
            )
            .await?;

        if matched.is_empty() {
            tracing::info!(
                database = %request.database,
                conversation_id = %conversation_id,
                "No tables matched the question"
            );
            let record = self.record(&conversation_id, request, started, NO_TABLES_FOUND, None);
            self.save(record).await;
            return Ok(Generation {
                conversation_id,
                outcome: GenerationOutcome::NoTablesFound,
            });
        }

        let schema = schema_text(&matched.tables);
        let prompt = self.prompts.render(
            &self.template,
            &[("schema", schema.as_str()), ("instruction", request.question.as_str())],
        )?;

        let llm_started = Instant::now();
        let answer = self.llm.prompt(&request.model_id, &prompt).await?;
        trace_llm_call(LLMSpanAttributes {
            model: request.model_id.clone(),
            conversation_id: conversation_id.clone(),
            prompt_tokens: answer.usage.prompt_tokens,
            completion_tokens: answer.usage.completion_tokens,
            cost: answer.cost,
            duration_ms: llm_started.elapsed().as_millis() as u64,
        });

        let record = self.record(&conversation_id, request, started, &answer.answer, Some(&answer));
        self.save(record).await;

        let outcome = match extract_sql(&answer.answer) {
            Some(sql) => {
                tracing::info!(
                    database = %request.database,
                    conversation_id = %conversation_id,
                    tables = matched.tables.len(),
                    total_tokens = answer.usage.total_tokens,
                    "Generated SQL"
                );
                GenerationOutcome::Generated {
                    sql,
                    tables: matched.tables,
                    answer,
                }
            }
            None => {
                tracing::warn!(
                    conversation_id = %conversation_id,
                    "Model response has no SQL block"
                );
                GenerationOutcome::Unparsed {
                    response: answer.answer,
                }
            }
        };

        Ok(Generation {
            conversation_id,
            outcome,
        })
    }

    fn record(
        &self,
        conversation_id: &str,
        request: &GenerationRequest,
        started: Instant,
        answer_text: &str,
        answer: Option<&LlmAnswer>,
    ) -> ConversationRecord {
        let (model, prompt_tokens, completion_tokens, total_tokens, llm_cost) = match answer {
            Some(a) => (
                request.model_id.clone(),
                i64::from(a.usage.prompt_tokens),
                i64::from(a.usage.completion_tokens),
                i64::from(a.usage.total_tokens),
                a.cost,
            ),
            None => ("N/A".to_string(), 0, 0, 0, 0.0),
        };

        ConversationRecord {
            id: conversation_id.to_string(),
            question: request.question.clone(),
            answer: answer_text.to_string(),
            database_name: request.database.clone(),
            model,
            search_provider: SEARCH_PROVIDER.to_string(),
            rag_parameters: request.rag_parameters(),
            response_time: started.elapsed().as_secs_f64(),
            prompt_tokens,
            completion_tokens,
            total_tokens,
            llm_cost,
            timestamp: Utc::now(),
        }
    }

    async fn save(&self, record: ConversationRecord) {
        let Some(history) = &self.history else {
            return;
        };
        if let Err(e) = history.save_conversation(&record).await {
            tracing::warn!(conversation_id = %record.id, error = %e, "Failed to record conversation");
        }
    }

    /// Record +1 / -1 feedback for a conversation
    pub async fn feedback(&self, conversation_id: &str, value: i32) -> Result<Feedback> {
        let feedback = Feedback::try_from(value)?;
        let history = self
            .history
            .as_ref()
            .ok_or_else(|| Error::config_error("No history store configured"))?;
        history.save_feedback(conversation_id, feedback).await?;
        tracing::info!(conversation_id, feedback = feedback.value(), "Feedback registered");
        Ok(feedback)
    }

    /// Run SQL against a database through the catalog
    pub async fn execute_sql(&self, database: &str, sql: &str) -> Result<QueryRows> {
        self.discovery.cache().catalog().execute_sql(database, sql).await
    }
}

pub struct SqlGeneratorBuilder {
    discovery: Option<DiscoveryOrchestrator>,
    llm: Option<Arc<LlmRegistry>>,
    prompts: Option<Arc<PromptGenerator>>,
    template: String,
    history: Option<Arc<dyn HistoryStore>>,
}

impl SqlGeneratorBuilder {
    pub fn new() -> Self {
        Self {
            discovery: None,
            llm: None,
            prompts: None,
            template: "basic_prompt".to_string(),
            history: None,
        }
    }

    pub fn discovery(mut self, discovery: DiscoveryOrchestrator) -> Self {
        self.discovery = Some(discovery);
        self
    }

    pub fn llm(mut self, llm: Arc<LlmRegistry>) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn prompts(mut self, prompts: Arc<PromptGenerator>) -> Self {
        self.prompts = Some(prompts);
        self
    }

    pub fn template(mut self, name: impl Into<String>) -> Self {
        self.template = name.into();
        self
    }

    pub fn history(mut self, history: Arc<dyn HistoryStore>) -> Self {
        self.history = Some(history);
        self
    }

    pub fn build(self) -> Result<SqlGenerator> {
        let discovery = self
            .discovery
            .ok_or_else(|| Error::config_error("Discovery orchestrator is required"))?;
        let llm = self
            .llm
            .ok_or_else(|| Error::config_error("LLM registry is required"))?;
        let prompts = self
            .prompts
            .ok_or_else(|| Error::config_error("Prompt templates are required"))?;

        if !prompts.contains(&self.template) {
            return Err(Error::config_error(format!(
                "Prompt template '{}' not found; available: {:?}",
                self.template,
                prompts.template_names()
            )));
        }

        Ok(SqlGenerator {
            discovery,
            llm,
            prompts,
            template: self.template,
            history: self.history,
        })
    }
}

impl Default for SqlGeneratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
