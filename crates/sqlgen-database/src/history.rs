//! Conversation and feedback history

use crate::control::ControlPool;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlgen_core::{Error, Result};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// One answered (or unanswered) question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ConversationRecord {
    pub id: String,
    pub question: String,
    pub answer: String,
    pub database_name: String,
    pub model: String,
    pub search_provider: String,
    /// Discovery parameters as JSON
    pub rag_parameters: String,
    /// Seconds from request to answer
    pub response_time: f64,
    pub prompt_tokens: i64,
    pub completion_tokens: i64,
    pub total_tokens: i64,
    pub llm_cost: f64,
    pub timestamp: DateTime<Utc>,
}

/// Thumbs up / thumbs down on a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Feedback {
    Positive,
    Negative,
}

impl Feedback {
    pub fn value(&self) -> i32 {
        match self {
            Feedback::Positive => 1,
            Feedback::Negative => -1,
        }
    }
}

impl TryFrom<i32> for Feedback {
    type Error = Error;

    fn try_from(value: i32) -> Result<Self> {
        match value {
            1 => Ok(Feedback::Positive),
            -1 => Ok(Feedback::Negative),
            other => Err(Error::message(format!(
                "Invalid feedback {}: expected 1 or -1",
                other
            ))),
        }
    }
}

#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn save_conversation(&self, record: &ConversationRecord) -> Result<()>;

    async fn conversation(&self, id: &str) -> Result<Option<ConversationRecord>>;

    /// Record feedback, replacing any earlier feedback for the conversation
    async fn save_feedback(&self, conversation_id: &str, feedback: Feedback) -> Result<()>;

    async fn feedback(&self, conversation_id: &str) -> Result<Option<Feedback>>;
}

/// History kept in process memory
#[derive(Clone, Default)]
pub struct InMemoryHistoryStore {
    conversations: Arc<RwLock<HashMap<String, ConversationRecord>>>,
    feedback: Arc<RwLock<HashMap<String, Feedback>>>,
}

impl InMemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn conversation_count(&self) -> usize {
        self.conversations
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .len()
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistoryStore {
    async fn save_conversation(&self, record: &ConversationRecord) -> Result<()> {
        self.conversations
            .write()
            .unwrap_or_else(|p| p.into_inner())
            .insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn conversation(&self, id: &str) -> Result<Option<ConversationRecord>> {
        Ok(self
            .conversations
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .get(id)
            .cloned())
    }

    async fn save_feedback(&self, conversation_id: &str, feedback: Feedback) -> Result<()> {
        self.feedback
            .write()
            .unwrap_or_else(|p| p.into_inner())
            .insert(conversation_id.to_string(), feedback);
        Ok(())
    }

    async fn feedback(&self, conversation_id: &str) -> Result<Option<Feedback>> {
        Ok(self
            .feedback
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .get(conversation_id)
            .copied())
    }
}

/// History in the `conversations` and `feedback` tables of the control database
pub struct SqlHistoryStore {
    pool: ControlPool,
}

impl SqlHistoryStore {
    /// Wrap a control pool; the tables must already exist
    pub fn new(pool: ControlPool) -> Self {
        Self { pool }
    }
}

const INSERT_CONVERSATION_POSTGRES: &str = r#"
INSERT INTO conversations
    (id, question, answer, database_name, model, search_provider, rag_parameters,
     response_time, prompt_tokens, completion_tokens, total_tokens, llm_cost, timestamp)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
"#;

const INSERT_CONVERSATION_SQLITE: &str = r#"
INSERT INTO conversations
    (id, question, answer, database_name, model, search_provider, rag_parameters,
     response_time, prompt_tokens, completion_tokens, total_tokens, llm_cost, timestamp)
VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
"#;

const SELECT_CONVERSATION: &str = r#"
SELECT id, question, answer, database_name, model, search_provider, rag_parameters,
       response_time, prompt_tokens, completion_tokens, total_tokens, llm_cost, timestamp
FROM conversations
"#;

#[async_trait]
impl HistoryStore for SqlHistoryStore {
    async fn save_conversation(&self, record: &ConversationRecord) -> Result<()> {
        macro_rules! bind_record {
            ($query:expr) => {
                $query
                    .bind(&record.id)
                    .bind(&record.question)
                    .bind(&record.answer)
                    .bind(&record.database_name)
                    .bind(&record.model)
                    .bind(&record.search_provider)
                    .bind(&record.rag_parameters)
                    .bind(record.response_time)
                    .bind(record.prompt_tokens)
                    .bind(record.completion_tokens)
                    .bind(record.total_tokens)
                    .bind(record.llm_cost)
                    .bind(record.timestamp)
            };
        }

        match &self.pool {
            ControlPool::Postgres(pool) => {
                bind_record!(sqlx::query(INSERT_CONVERSATION_POSTGRES))
                    .execute(pool)
                    .await
                    .map(|_| ())
            }
            ControlPool::Sqlite(pool) => {
                bind_record!(sqlx::query(INSERT_CONVERSATION_SQLITE))
                    .execute(pool)
                    .await
                    .map(|_| ())
            }
        }
        .map_err(|e| Error::persistence(format!("conversations table: {}", e)))?;

        tracing::debug!(conversation_id = %record.id, "Saved conversation");
        Ok(())
    }

    async fn conversation(&self, id: &str) -> Result<Option<ConversationRecord>> {
        match &self.pool {
            ControlPool::Postgres(pool) => {
                sqlx::query_as(&format!("{} WHERE id = $1", SELECT_CONVERSATION))
                    .bind(id)
                    .fetch_optional(pool)
                    .await
            }
            ControlPool::Sqlite(pool) => {
                sqlx::query_as(&format!("{} WHERE id = ?", SELECT_CONVERSATION))
                    .bind(id)
                    .fetch_optional(pool)
                    .await
            }
        }
        .map_err(|e| Error::persistence(format!("conversations table: {}", e)))
    }

    async fn save_feedback(&self, conversation_id: &str, feedback: Feedback) -> Result<()> {
        let now = Utc::now();
        let result = match &self.pool {
            ControlPool::Postgres(pool) => {
                let mut tx = pool.begin().await.map_err(feedback_error)?;
                sqlx::query("DELETE FROM feedback WHERE conversation_id = $1")
                    .bind(conversation_id)
                    .execute(&mut *tx)
                    .await
                    .map_err(feedback_error)?;
                sqlx::query(
                    "INSERT INTO feedback (conversation_id, feedback, timestamp) VALUES ($1, $2, $3)",
                )
                .bind(conversation_id)
                .bind(feedback.value())
                .bind(now)
                .execute(&mut *tx)
                .await
                .map_err(feedback_error)?;
                tx.commit().await
            }
            ControlPool::Sqlite(pool) => {
                let mut tx = pool.begin().await.map_err(feedback_error)?;
                sqlx::query("DELETE FROM feedback WHERE conversation_id = ?")
                    .bind(conversation_id)
                    .execute(&mut *tx)
                    .await
                    .map_err(feedback_error)?;
                sqlx::query(
                    "INSERT INTO feedback (conversation_id, feedback, timestamp) VALUES (?, ?, ?)",
                )
                .bind(conversation_id)
                .bind(feedback.value())
                .bind(now)
                .execute(&mut *tx)
                .await
                .map_err(feedback_error)?;
                tx.commit().await
            }
        };
        result.map_err(feedback_error)?;

        tracing::info!(conversation_id = %conversation_id, feedback = feedback.value(), "Registered feedback");
        Ok(())
    }

    async fn feedback(&self, conversation_id: &str) -> Result<Option<Feedback>> {
        let value: Option<i32> = match &self.pool {
            ControlPool::Postgres(pool) => {
                sqlx::query_scalar::<_, i32>("SELECT feedback FROM feedback WHERE conversation_id = $1")
                    .bind(conversation_id)
                    .fetch_optional(pool)
                    .await
            }
            ControlPool::Sqlite(pool) => {
                sqlx::query_scalar::<_, i32>("SELECT feedback FROM feedback WHERE conversation_id = ?")
                    .bind(conversation_id)
                    .fetch_optional(pool)
                    .await
            }
        }
        .map_err(feedback_error)?;

        value.map(Feedback::try_from).transpose()
    }
}

fn feedback_error(e: sqlx::Error) -> Error {
    Error::persistence(format!("feedback table: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn record(id: &str) -> ConversationRecord {
        ConversationRecord {
            id: id.to_string(),
            question: "How many films are there?".to_string(),
            answer: "<SQL>SELECT COUNT(*) FROM film</SQL>".to_string(),
            database_name: "sakila".to_string(),
            model: "OpenAI: gpt-4o-mini".to_string(),
            search_provider: "fuzzy".to_string(),
            rag_parameters: r#"{"similarity_threshold":90,"max_synonyms":5}"#.to_string(),
            response_time: 1.25,
            prompt_tokens: 120,
            completion_tokens: 30,
            total_tokens: 150,
            llm_cost: 0.0001,
            timestamp: "2024-05-01T10:00:00Z".parse().unwrap(),
        }
    }

    async fn sql_store() -> SqlHistoryStore {
        let pool = ControlPool::connect_sqlite("sqlite::memory:", Duration::from_secs(5))
            .await
            .unwrap();
        pool.migrate().await.unwrap();
        SqlHistoryStore::new(pool)
    }

    #[test]
    fn test_feedback_values() {
        assert_eq!(Feedback::try_from(1).unwrap(), Feedback::Positive);
        assert_eq!(Feedback::try_from(-1).unwrap(), Feedback::Negative);
        assert!(Feedback::try_from(0).is_err());
        assert!(Feedback::try_from(5).is_err());
        assert_eq!(Feedback::Negative.value(), -1);
    }

    #[tokio::test]
    async fn test_sql_conversation_round_trip() {
        let store = sql_store().await;
        let rec = record("c-1");
        store.save_conversation(&rec).await.unwrap();

        let loaded = store.conversation("c-1").await.unwrap().unwrap();
        assert_eq!(loaded, rec);
        assert!(store.conversation("c-2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_sql_duplicate_conversation_is_persistence_error() {
        let store = sql_store().await;
        store.save_conversation(&record("c-1")).await.unwrap();

        let err = store.save_conversation(&record("c-1")).await.unwrap_err();
        assert!(matches!(err, Error::Persistence(_)));
        assert!(err.to_string().contains("conversations table"));
    }

    #[tokio::test]
    async fn test_sql_feedback_replaces_previous() {
        let store = sql_store().await;
        store.save_conversation(&record("c-1")).await.unwrap();

        store.save_feedback("c-1", Feedback::Positive).await.unwrap();
        store.save_feedback("c-1", Feedback::Negative).await.unwrap();

        assert_eq!(store.feedback("c-1").await.unwrap(), Some(Feedback::Negative));
        assert_eq!(store.feedback("c-9").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_in_memory_history() {
        let store = InMemoryHistoryStore::new();
        store.save_conversation(&record("c-1")).await.unwrap();
        store.save_feedback("c-1", Feedback::Positive).await.unwrap();

        assert_eq!(store.conversation_count(), 1);
        assert_eq!(store.feedback("c-1").await.unwrap(), Some(Feedback::Positive));
    }
}
