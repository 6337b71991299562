//! Blob storage for persisted schema indexes
//!
//! A blob is an opaque byte string stored under a key. Saving under an existing
//! key replaces the previous value.

mod filesystem;
mod memory;
mod sql;

pub use filesystem::FileSystemBlobStore;
pub use memory::InMemoryBlobStore;
pub use sql::SqlBlobStore;

use async_trait::async_trait;
use sqlgen_core::Result;

/// The blob storage service trait.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store bytes under a key, replacing any previous value.
    async fn save(&self, key: &str, data: &[u8]) -> Result<()>;

    /// Load the bytes stored under a key. A missing key is `Ok(None)`.
    async fn load(&self, key: &str) -> Result<Option<Vec<u8>>>;
}
