//! Database migrations for the control database

use sqlx::{Pool, Postgres, Sqlite};

/// SQL for creating the files table (PostgreSQL)
const CREATE_FILES_TABLE_POSTGRES: &str = r#"
CREATE TABLE IF NOT EXISTS files (
    file_name TEXT NOT NULL PRIMARY KEY,
    file_data BYTEA NOT NULL,
    update_time TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP
);
"#;

/// SQL for creating the files table (SQLite)
const CREATE_FILES_TABLE_SQLITE: &str = r#"
CREATE TABLE IF NOT EXISTS files (
    file_name TEXT NOT NULL PRIMARY KEY,
    file_data BLOB NOT NULL,
    update_time TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);
"#;

/// SQL for creating the conversations table
const CREATE_CONVERSATIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS conversations (
    id TEXT NOT NULL PRIMARY KEY,
    question TEXT NOT NULL,
    answer TEXT NOT NULL,
    database_name TEXT NOT NULL,
    model TEXT NOT NULL,
    search_provider TEXT NOT NULL,
    rag_parameters TEXT NOT NULL,
    response_time DOUBLE PRECISION NOT NULL,
    prompt_tokens BIGINT NOT NULL DEFAULT 0,
    completion_tokens BIGINT NOT NULL DEFAULT 0,
    total_tokens BIGINT NOT NULL DEFAULT 0,
    llm_cost DOUBLE PRECISION NOT NULL DEFAULT 0,
    timestamp TIMESTAMPTZ NOT NULL
);
"#;

/// SQL for creating the feedback table
const CREATE_FEEDBACK_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS feedback (
    conversation_id TEXT NOT NULL PRIMARY KEY,
    feedback INTEGER NOT NULL,
    timestamp TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP
);
"#;

/// Run migrations for PostgreSQL
pub async fn run_postgres_migrations(pool: &Pool<Postgres>) -> Result<(), sqlx::Error> {
    sqlx::query(CREATE_FILES_TABLE_POSTGRES).execute(pool).await?;
    sqlx::query(CREATE_CONVERSATIONS_TABLE).execute(pool).await?;
    sqlx::query(CREATE_FEEDBACK_TABLE).execute(pool).await?;
    Ok(())
}

/// Run migrations for SQLite
pub async fn run_sqlite_migrations(pool: &Pool<Sqlite>) -> Result<(), sqlx::Error> {
    sqlx::query(CREATE_FILES_TABLE_SQLITE).execute(pool).await?;
    sqlx::query(CREATE_CONVERSATIONS_TABLE).execute(pool).await?;
    sqlx::query(CREATE_FEEDBACK_TABLE).execute(pool).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    #[tokio::test]
    async fn test_sqlite_migrations_are_idempotent() {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();

        run_sqlite_migrations(&pool).await.unwrap();
        run_sqlite_migrations(&pool).await.unwrap();

        let tables: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name",
        )
        .fetch_all(&pool)
        .await
        .unwrap();
        assert_eq!(tables, vec!["conversations", "feedback", "files"]);
    }
}
