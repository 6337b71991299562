//! Process-wide cache of schema indexes
//!
//! Entries are keyed by database name and never expire. A missing entry is
//! filled from the blob store when a persisted copy exists, otherwise by
//! introspecting the database; a forced refresh always introspects. Builds are
//! single-flight per database name.

use dashmap::DashMap;
use sqlgen_core::{Error, Result, SchemaIndex};
use sqlgen_database::{BlobStore, SchemaCatalog};
use std::sync::{Arc, RwLock};
use std::time::Instant;
use tokio::sync::Mutex;

pub struct SchemaIndexCache {
    catalog: Arc<dyn SchemaCatalog>,
    blobs: Option<Arc<dyn BlobStore>>,
    entries: DashMap<String, Arc<SchemaIndex>>,
    build_locks: DashMap<String, Arc<Mutex<()>>>,
    current: RwLock<Option<String>>,
}

impl SchemaIndexCache {
    /// Cache persisting every built index to `blobs`
    pub fn new(catalog: Arc<dyn SchemaCatalog>, blobs: Arc<dyn BlobStore>) -> Self {
        Self {
            catalog,
            blobs: Some(blobs),
            entries: DashMap::new(),
            build_locks: DashMap::new(),
            current: RwLock::new(None),
        }
    }

    /// Cache that only ever introspects
    pub fn without_persistence(catalog: Arc<dyn SchemaCatalog>) -> Self {
        Self {
            catalog,
            blobs: None,
            entries: DashMap::new(),
            build_locks: DashMap::new(),
            current: RwLock::new(None),
        }
    }

    pub fn catalog(&self) -> &Arc<dyn SchemaCatalog> {
        &self.catalog
    }

    /// The index of `database`, building it on a miss or when `force_refresh` is set
    ///
    /// Introspection failures are [`Error::Introspection`] and leave any
    /// existing entry untouched.
    pub async fn get_index(&self, database: &str, force_refresh: bool) -> Result<Arc<SchemaIndex>> {
        if !force_refresh && let Some(index) = self.cached(database) {
            tracing::debug!(database, "Schema index cache hit");
            return Ok(index);
        }

        let lock = self
            .build_locks
            .entry(database.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        // Another caller may have finished the build while we waited
        if !force_refresh {
            if let Some(index) = self.cached(database) {
                tracing::debug!(database, "Schema index built by concurrent caller");
                return Ok(index);
            }
            if let Some(index) = self.load_persisted(database).await {
                let index = Arc::new(index);
                self.entries.insert(database.to_string(), index.clone());
                return Ok(index);
            }
        }

        let index = match self.build(database).await {
            Ok(index) => Arc::new(index),
            Err(e) => {
                // Forget the lock unless another caller is waiting on it
                self.build_locks
                    .remove_if(database, |_, entry| Arc::strong_count(entry) <= 2);
                return Err(e);
            }
        };
        self.entries.insert(database.to_string(), index.clone());
        Ok(index)
    }

    /// Introspect and persist; persistence failures are logged only
    async fn build(&self, database: &str) -> Result<SchemaIndex> {
        let started = Instant::now();
        let index = self.catalog.introspect(database).await.map_err(|e| {
            if e.is_introspection() {
                e
            } else {
                Error::introspection(database, e)
            }
        })?;

        tracing::info!(
            database,
            tables = index.len(),
            foreign_keys = index.foreign_keys.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Built schema index"
        );

        if let Some(blobs) = &self.blobs {
            let key = SchemaIndex::storage_key(database);
            let saved = match index.to_bytes() {
                Ok(bytes) => blobs.save(&key, &bytes).await,
                Err(e) => Err(e),
            };
            if let Err(e) = saved {
                tracing::warn!(database, key = %key, error = %e, "Failed to persist schema index");
            }
        }

        Ok(index)
    }

    async fn load_persisted(&self, database: &str) -> Option<SchemaIndex> {
        let blobs = self.blobs.as_ref()?;
        let key = SchemaIndex::storage_key(database);

        match blobs.load(&key).await {
            Ok(Some(bytes)) => match SchemaIndex::from_bytes(&bytes) {
                Ok(index) => {
                    tracing::debug!(database, tables = index.len(), "Loaded persisted schema index");
                    Some(index)
                }
                Err(e) => {
                    tracing::warn!(
                        database,
                        key = %key,
                        error = %e,
                        "Persisted schema index is unreadable; introspecting instead"
                    );
                    None
                }
            },
            Ok(None) => {
                tracing::debug!(database, "No persisted schema index");
                None
            }
            Err(e) => {
                tracing::warn!(
                    database,
                    key = %key,
                    error = %e,
                    "Failed to load persisted schema index; introspecting instead"
                );
                None
            }
        }
    }

    /// The cached entry, without any I/O
    pub fn cached(&self, database: &str) -> Option<Arc<SchemaIndex>> {
        self.entries.get(database).map(|entry| entry.value().clone())
    }

    pub fn cached_databases(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Drop the entry for `database`; true if there was one
    pub fn invalidate(&self, database: &str) -> bool {
        self.entries.remove(database).is_some()
    }

    pub fn current_database(&self) -> Option<String> {
        self.current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Make `database` the target of unqualified operations
    ///
    /// Switching to the current database does nothing. The index is built
    /// only when nothing is cached for the new target; if that build fails the
    /// previous target stays current.
    pub async fn set_current_database(&self, database: &str) -> Result<()> {
        if self.current_database().as_deref() == Some(database) {
            tracing::debug!(database, "Database already current");
            return Ok(());
        }

        self.get_index(database, false).await?;

        *self
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(database.to_string());
        tracing::info!(database, "Switched current database");
        Ok(())
    }

    /// Index of the current database
    pub async fn current_index(&self) -> Result<Arc<SchemaIndex>> {
        let database = self
            .current_database()
            .ok_or_else(|| Error::config_error("No current database selected"))?;
        self.get_index(&database, false).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeCatalog, sakila_index, single_table_index};
    use async_trait::async_trait;
    use mockall::mock;
    use mockall::predicate::eq;
    use sqlgen_database::InMemoryBlobStore;
    use std::time::Duration;

    mock! {
        pub Blobs {}

        #[async_trait]
        impl BlobStore for Blobs {
            async fn save(&self, key: &str, data: &[u8]) -> Result<()>;
            async fn load(&self, key: &str) -> Result<Option<Vec<u8>>>;
        }
    }

    fn catalog() -> Arc<FakeCatalog> {
        Arc::new(FakeCatalog::new(vec![
            sakila_index(),
            single_table_index("pagila", "payment"),
        ]))
    }

    fn table_columns(index: &SchemaIndex) -> Vec<(String, Vec<String>)> {
        index
            .tables
            .iter()
            .map(|t| (t.name.clone(), t.column_names().map(str::to_string).collect()))
            .collect()
    }

    #[tokio::test]
    async fn test_second_lookup_is_a_cache_hit() {
        let catalog = catalog();
        let cache = SchemaIndexCache::without_persistence(catalog.clone());

        let first = cache.get_index("sakila", false).await.unwrap();
        let second = cache.get_index("sakila", false).await.unwrap();

        assert_eq!(catalog.introspections(), 1);
        assert_eq!(table_columns(&first), table_columns(&second));
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_force_refresh_introspects_and_persists() {
        let catalog = catalog();
        let blobs = Arc::new(InMemoryBlobStore::new());
        let cache = SchemaIndexCache::new(catalog.clone(), blobs.clone());

        cache.get_index("sakila", false).await.unwrap();
        cache.get_index("sakila", true).await.unwrap();
        assert_eq!(catalog.introspections(), 2);

        let stored = blobs.load("sakila_table_columns").await.unwrap().unwrap();
        assert_eq!(SchemaIndex::from_bytes(&stored).unwrap().tables, sakila_index().tables);
    }

    #[tokio::test]
    async fn test_persisted_index_avoids_introspection() {
        let catalog = catalog();
        let blobs = Arc::new(InMemoryBlobStore::new());
        blobs
            .save("sakila_table_columns", &sakila_index().to_bytes().unwrap())
            .await
            .unwrap();

        let cache = SchemaIndexCache::new(catalog.clone(), blobs);
        let index = cache.get_index("sakila", false).await.unwrap();

        assert_eq!(catalog.introspections(), 0);
        assert_eq!(index.len(), 4);
    }

    #[tokio::test]
    async fn test_corrupt_blob_falls_back_to_introspection() {
        let catalog = catalog();
        let blobs = Arc::new(InMemoryBlobStore::new());
        blobs.save("sakila_table_columns", b"not json").await.unwrap();

        let cache = SchemaIndexCache::new(catalog.clone(), blobs);
        let index = cache.get_index("sakila", false).await.unwrap();

        assert_eq!(catalog.introspections(), 1);
        assert_eq!(index.len(), 4);
    }

    #[tokio::test]
    async fn test_blob_store_failures_do_not_break_lookup() {
        let mut blobs = MockBlobs::new();
        blobs
            .expect_load()
            .with(eq("sakila_table_columns"))
            .times(1)
            .returning(|_| Err(Error::persistence("connection reset")));
        blobs
            .expect_save()
            .withf(|key, data| key == "sakila_table_columns" && !data.is_empty())
            .times(1)
            .returning(|_, _| Err(Error::persistence("disk full")));

        let catalog = catalog();
        let cache = SchemaIndexCache::new(catalog.clone(), Arc::new(blobs));
        let index = cache.get_index("sakila", false).await.unwrap();

        assert_eq!(catalog.introspections(), 1);
        assert_eq!(index.database, "sakila");
        assert!(cache.cached("sakila").is_some());
    }

    #[tokio::test]
    async fn test_introspection_failure_is_distinguishable() {
        let catalog = catalog();
        catalog.set_unreachable("sakila");
        let cache = SchemaIndexCache::without_persistence(catalog.clone());

        let err = cache.get_index("sakila", false).await.unwrap_err();
        assert!(err.is_introspection());
        assert!(cache.cached("sakila").is_none());

        let err = cache.get_index("missing", false).await.unwrap_err();
        assert!(err.is_introspection());
    }

    #[tokio::test]
    async fn test_failed_builds_leave_no_lock_behind() {
        let catalog = catalog();
        let cache = SchemaIndexCache::without_persistence(catalog.clone());

        for name in ["missing", "also_missing", "nope"] {
            assert!(cache.get_index(name, false).await.is_err());
        }
        assert!(cache.build_locks.is_empty());

        cache.get_index("sakila", false).await.unwrap();
        assert_eq!(cache.build_locks.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_previous_entry() {
        let catalog = catalog();
        let cache = SchemaIndexCache::without_persistence(catalog.clone());
        cache.get_index("sakila", false).await.unwrap();

        catalog.set_unreachable("sakila");
        assert!(cache.get_index("sakila", true).await.is_err());
        assert_eq!(cache.cached("sakila").unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_set_current_database() {
        let catalog = catalog();
        let cache = SchemaIndexCache::without_persistence(catalog.clone());
        assert!(cache.current_index().await.is_err());

        cache.set_current_database("sakila").await.unwrap();
        assert_eq!(catalog.introspections(), 1);
        assert_eq!(cache.current_database().as_deref(), Some("sakila"));

        // Switching to the current database is a no-op
        cache.set_current_database("sakila").await.unwrap();
        assert_eq!(catalog.introspections(), 1);

        cache.set_current_database("pagila").await.unwrap();
        assert_eq!(catalog.introspections(), 2);

        // Switching back finds the cached entry
        cache.set_current_database("sakila").await.unwrap();
        assert_eq!(catalog.introspections(), 2);
        assert_eq!(cache.current_index().await.unwrap().database, "sakila");
        assert_eq!(cache.cached_databases(), vec!["pagila", "sakila"]);
    }

    #[tokio::test]
    async fn test_failed_switch_keeps_current_database() {
        let catalog = catalog();
        let cache = SchemaIndexCache::without_persistence(catalog.clone());
        cache.set_current_database("sakila").await.unwrap();

        assert!(cache.set_current_database("missing").await.is_err());
        assert_eq!(cache.current_database().as_deref(), Some("sakila"));
    }

    #[tokio::test]
    async fn test_invalidate_forces_rebuild() {
        let catalog = catalog();
        let cache = SchemaIndexCache::without_persistence(catalog.clone());
        cache.get_index("sakila", false).await.unwrap();

        assert!(cache.invalidate("sakila"));
        assert!(!cache.invalidate("sakila"));
        cache.get_index("sakila", false).await.unwrap();
        assert_eq!(catalog.introspections(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_misses_introspect_once() {
        let catalog = Arc::new(
            FakeCatalog::new(vec![sakila_index()]).with_delay(Duration::from_millis(50)),
        );
        let cache = Arc::new(SchemaIndexCache::new(
            catalog.clone(),
            Arc::new(InMemoryBlobStore::new()),
        ));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                tokio::spawn(async move { cache.get_index("sakila", false).await })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap().len(), 4);
        }

        assert_eq!(catalog.introspections(), 1);
    }
}
