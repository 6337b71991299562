//! Blob store backed by the `files` table of the control database

use super::BlobStore;
use crate::control::ControlPool;
use async_trait::async_trait;
use sqlgen_core::{Error, Result};

pub struct SqlBlobStore {
    pool: ControlPool,
}

impl SqlBlobStore {
    /// Wrap a control pool; the `files` table must already exist
    pub fn new(pool: ControlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BlobStore for SqlBlobStore {
    async fn save(&self, key: &str, data: &[u8]) -> Result<()> {
        let result = match &self.pool {
            ControlPool::Postgres(pool) => {
                let mut tx = pool.begin().await.map_err(persistence)?;
                sqlx::query("DELETE FROM files WHERE file_name = $1")
                    .bind(key)
                    .execute(&mut *tx)
                    .await
                    .map_err(persistence)?;
                sqlx::query("INSERT INTO files (file_name, file_data) VALUES ($1, $2)")
                    .bind(key)
                    .bind(data)
                    .execute(&mut *tx)
                    .await
                    .map_err(persistence)?;
                tx.commit().await
            }
            ControlPool::Sqlite(pool) => {
                let mut tx = pool.begin().await.map_err(persistence)?;
                sqlx::query("DELETE FROM files WHERE file_name = ?")
                    .bind(key)
                    .execute(&mut *tx)
                    .await
                    .map_err(persistence)?;
                sqlx::query("INSERT INTO files (file_name, file_data) VALUES (?, ?)")
                    .bind(key)
                    .bind(data)
                    .execute(&mut *tx)
                    .await
                    .map_err(persistence)?;
                tx.commit().await
            }
        };
        result.map_err(persistence)?;

        tracing::debug!(key = %key, bytes = data.len(), "Saved blob to control database");
        Ok(())
    }

    async fn load(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let data: Option<Vec<u8>> = match &self.pool {
            ControlPool::Postgres(pool) => {
                sqlx::query_scalar::<_, Vec<u8>>("SELECT file_data FROM files WHERE file_name = $1")
                    .bind(key)
                    .fetch_optional(pool)
                    .await
            }
            ControlPool::Sqlite(pool) => {
                sqlx::query_scalar::<_, Vec<u8>>("SELECT file_data FROM files WHERE file_name = ?")
                    .bind(key)
                    .fetch_optional(pool)
                    .await
            }
        }
        .map_err(persistence)?;

        Ok(data)
    }
}

fn persistence(e: sqlx::Error) -> Error {
    Error::persistence(format!("files table: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    async fn store() -> SqlBlobStore {
        let pool = ControlPool::connect_sqlite("sqlite::memory:", Duration::from_secs(5))
            .await
            .unwrap();
        pool.migrate().await.unwrap();
        SqlBlobStore::new(pool)
    }

    #[tokio::test]
    async fn test_save_load_replace() {
        let store = store().await;
        assert_eq!(store.load("sakila_table_columns").await.unwrap(), None);

        store.save("sakila_table_columns", b"first").await.unwrap();
        store.save("sakila_table_columns", b"second").await.unwrap();
        store.save("pagila_table_columns", b"other").await.unwrap();

        assert_eq!(
            store.load("sakila_table_columns").await.unwrap(),
            Some(b"second".to_vec())
        );
        assert_eq!(
            store.load("pagila_table_columns").await.unwrap(),
            Some(b"other".to_vec())
        );
    }

    #[tokio::test]
    async fn test_missing_table_is_persistence_error() {
        let pool = ControlPool::connect_sqlite("sqlite::memory:", Duration::from_secs(5))
            .await
            .unwrap();
        let store = SqlBlobStore::new(pool);
        assert!(matches!(
            store.load("anything").await,
            Err(Error::Persistence(_))
        ));
    }
}
