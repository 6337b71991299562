//! In-memory blob store implementation

use super::BlobStore;
use async_trait::async_trait;
use sqlgen_core::Result;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// In-memory blob store.
///
/// Used in tests and when no control database is configured.
/// Data is not persisted across restarts.
#[derive(Clone, Default)]
pub struct InMemoryBlobStore {
    blobs: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored keys, sorted
    pub fn keys(&self) -> Vec<String> {
        let blobs = self.blobs.read().unwrap_or_else(|p| p.into_inner());
        let mut keys: Vec<String> = blobs.keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn save(&self, key: &str, data: &[u8]) -> Result<()> {
        let mut blobs = self.blobs.write().unwrap_or_else(|p| p.into_inner());
        blobs.insert(key.to_string(), data.to_vec());
        Ok(())
    }

    async fn load(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let blobs = self.blobs.read().unwrap_or_else(|p| p.into_inner());
        Ok(blobs.get(key).cloned())
    }
}
