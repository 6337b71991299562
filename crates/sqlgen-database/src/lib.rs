//! Database adapters for sqlgen
//!
//! Schema catalogs for PostgreSQL and SQLite, blob stores for persisted schema
//! indexes, and the conversation/feedback history.

pub mod blob;
pub mod catalog;
pub mod connect;
pub mod control;
pub mod history;
pub mod migrations;
pub mod postgres;
pub mod sqlite;

// Re-exports
pub use blob::{BlobStore, FileSystemBlobStore, InMemoryBlobStore, SqlBlobStore};
pub use catalog::{QueryRows, SchemaCatalog};
pub use connect::{DatabaseServices, connect};
pub use control::ControlPool;
pub use history::{
    ConversationRecord, Feedback, HistoryStore, InMemoryHistoryStore, SqlHistoryStore,
};
pub use postgres::PostgresCatalog;
pub use sqlite::SqliteCatalog;
