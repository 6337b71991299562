//! Connection to the control database
//!
//! The control database stores persisted indexes, conversations and feedback.
//! It is always opened read-write, independently of the catalog's read-only flag.

use crate::migrations::{run_postgres_migrations, run_sqlite_migrations};
use sqlgen_core::{Error, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{PgPool, SqlitePool};
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub enum ControlPool {
    Postgres(PgPool),
    Sqlite(SqlitePool),
}

impl ControlPool {
    /// Open (creating if needed) a SQLite control database
    pub async fn connect_sqlite(url: &str, timeout: Duration) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| Error::config_error(format!("Invalid SQLite URL '{}': {}", url, e)))?
            .create_if_missing(true);

        let mut pool_options = SqlitePoolOptions::new().acquire_timeout(timeout);
        if url.contains(":memory:") {
            // An in-memory database lives exactly as long as its single connection
            pool_options = pool_options
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        } else {
            pool_options = pool_options.max_connections(5);
        }

        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(|e| Error::persistence(format!("Failed to open control database: {}", e)))?;

        Ok(ControlPool::Sqlite(pool))
    }

    /// Create the control tables if they do not exist yet
    pub async fn migrate(&self) -> Result<()> {
        let result = match self {
            ControlPool::Postgres(pool) => run_postgres_migrations(pool).await,
            ControlPool::Sqlite(pool) => run_sqlite_migrations(pool).await,
        };
        result.map_err(|e| Error::persistence(format!("Control database migration failed: {}", e)))
    }
}
