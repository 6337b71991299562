//! File system blob store implementation

use super::BlobStore;
use async_trait::async_trait;
use sqlgen_core::{Error, Result};
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::fs;

/// File system blob store.
///
/// Each key is one file: `base_path/<key>.blob`. Writes go to a temporary
/// file first and are renamed into place.
pub struct FileSystemBlobStore {
    base_path: PathBuf,
}

impl FileSystemBlobStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    fn blob_path(&self, key: &str) -> PathBuf {
        // Sanitize key for file system
        let safe_key = key.replace(['/', '\\', ':'], "_");
        self.base_path.join(format!("{}.blob", safe_key))
    }
}

#[async_trait]
impl BlobStore for FileSystemBlobStore {
    async fn save(&self, key: &str, data: &[u8]) -> Result<()> {
        fs::create_dir_all(&self.base_path).await.map_err(|e| {
            Error::persistence(format!("Cannot create {:?}: {}", self.base_path, e))
        })?;

        let path = self.blob_path(key);
        let tmp = path.with_extension("blob.tmp");

        fs::write(&tmp, data)
            .await
            .map_err(|e| Error::persistence(format!("Cannot write {:?}: {}", tmp, e)))?;
        fs::rename(&tmp, &path)
            .await
            .map_err(|e| Error::persistence(format!("Cannot replace {:?}: {}", path, e)))?;

        tracing::debug!(key = %key, bytes = data.len(), "Saved blob to file system");
        Ok(())
    }

    async fn load(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.blob_path(key);
        match fs::read(&path).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::persistence(format!("Cannot read {:?}: {}", path, e))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_round_trip_and_missing_key() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileSystemBlobStore::new(temp_dir.path().join("indexes"));

        assert_eq!(store.load("sakila_table_columns").await.unwrap(), None);

        store.save("sakila_table_columns", b"{\"tables\":[]}").await.unwrap();
        store.save("sakila_table_columns", b"{}").await.unwrap();

        assert_eq!(
            store.load("sakila_table_columns").await.unwrap(),
            Some(b"{}".to_vec())
        );
    }

    #[tokio::test]
    async fn test_keys_are_sanitized() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileSystemBlobStore::new(temp_dir.path());

        store.save("../escape:key", b"x").await.unwrap();
        assert!(temp_dir.path().join(".._escape_key.blob").exists());
        assert_eq!(store.load("../escape:key").await.unwrap(), Some(b"x".to_vec()));
    }
}
