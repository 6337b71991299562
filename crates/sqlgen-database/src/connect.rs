//! Wiring of catalog, blob store and history store from configuration

use crate::blob::{BlobStore, InMemoryBlobStore, SqlBlobStore};
use crate::catalog::SchemaCatalog;
use crate::control::ControlPool;
use crate::history::{HistoryStore, InMemoryHistoryStore, SqlHistoryStore};
use crate::postgres::PostgresCatalog;
use crate::sqlite::SqliteCatalog;
use sqlgen_core::{DatabaseConfig, DatabaseEngine, Result};
use std::sync::Arc;
use std::time::Duration;

/// Everything the discovery and generation layers need from the databases
#[derive(Clone)]
pub struct DatabaseServices {
    pub catalog: Arc<dyn SchemaCatalog>,
    pub blobs: Arc<dyn BlobStore>,
    pub history: Arc<dyn HistoryStore>,
}

/// Build the services for the configured engine
///
/// Configuration mistakes fail here. An unreachable control database does not:
/// indexes and history then live in memory for the lifetime of the process.
pub async fn connect(config: &DatabaseConfig) -> Result<DatabaseServices> {
    config.validate()?;

    let (catalog, control): (Arc<dyn SchemaCatalog>, Option<Result<ControlPool>>) =
        match config.engine {
            DatabaseEngine::Postgresql => {
                let catalog = PostgresCatalog::new(config.clone())?;
                let control = ControlPool::Postgres(catalog.control_pool());
                (Arc::new(catalog), Some(Ok(control)))
            }
            DatabaseEngine::Sqlite => {
                let catalog = SqliteCatalog::new(config)?;
                let control = match config.sqlite_control {
                    Some(ref url) => Some(
                        ControlPool::connect_sqlite(url, Duration::from_secs(config.timeout_secs))
                            .await,
                    ),
                    None => None,
                };
                (Arc::new(catalog), control)
            }
        };

    let (blobs, history) = match control {
        Some(Ok(pool)) => match pool.migrate().await {
            Ok(()) => {
                tracing::info!(engine = %config.engine, "Using control database for indexes and history");
                let blobs: Arc<dyn BlobStore> = Arc::new(SqlBlobStore::new(pool.clone()));
                let history: Arc<dyn HistoryStore> = Arc::new(SqlHistoryStore::new(pool));
                (blobs, history)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Control database unavailable, keeping indexes and history in memory");
                in_memory_stores()
            }
        },
        Some(Err(e)) => {
            tracing::warn!(error = %e, "Control database unavailable, keeping indexes and history in memory");
            in_memory_stores()
        }
        None => {
            tracing::info!("No control database configured, keeping indexes and history in memory");
            in_memory_stores()
        }
    };

    Ok(DatabaseServices {
        catalog,
        blobs,
        history,
    })
}

fn in_memory_stores() -> (Arc<dyn BlobStore>, Arc<dyn HistoryStore>) {
    (
        Arc::new(InMemoryBlobStore::new()),
        Arc::new(InMemoryHistoryStore::new()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlgen_core::{Error, SqlGenConfig};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_sqlite_with_control_database() {
        let dir = TempDir::new().unwrap();
        let mut config = SqlGenConfig::test_defaults().database;
        config.sqlite_control = Some(format!(
            "sqlite://{}?mode=rwc",
            dir.path().join("control.db").display()
        ));

        let services = connect(&config).await.unwrap();
        assert_eq!(services.catalog.engine(), DatabaseEngine::Sqlite);

        services.blobs.save("test_table_columns", b"{}").await.unwrap();
        assert_eq!(
            services.blobs.load("test_table_columns").await.unwrap(),
            Some(b"{}".to_vec())
        );
        assert!(dir.path().join("control.db").exists());
    }

    #[tokio::test]
    async fn test_sqlite_without_control_uses_memory() {
        let config = SqlGenConfig::test_defaults().database;
        let services = connect(&config).await.unwrap();
        services.blobs.save("k", b"v").await.unwrap();
        assert_eq!(services.blobs.load("k").await.unwrap(), Some(b"v".to_vec()));
    }

    #[tokio::test]
    async fn test_invalid_config_fails_fast() {
        let mut config = SqlGenConfig::test_defaults().database;
        config.sqlite_databases.clear();
        assert!(matches!(connect(&config).await, Err(Error::Config(_))));
    }
}
