//! Test doubles for discovery
//!
//! Fixed taggers, a scripted schema catalog that counts introspections, and a
//! small hand-built embedding space around the sakila sample schema.

use crate::embeddings::EmbeddingSpace;
use crate::tagger::{PosTagger, TaggedToken};
use async_trait::async_trait;
use sqlgen_core::{DatabaseEngine, Error, Result, SchemaIndex, TableDescriptor, TableKind};
use sqlgen_database::{QueryRows, SchemaCatalog};
use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Tagger returning the same tokens for any input
pub struct StaticTagger {
    tokens: Vec<TaggedToken>,
}

impl StaticTagger {
    pub fn new(tokens: Vec<TaggedToken>) -> Self {
        Self { tokens }
    }
}

impl PosTagger for StaticTagger {
    fn tag(&self, _text: &str) -> Vec<TaggedToken> {
        self.tokens.clone()
    }
}

/// In-memory catalog serving prepared indexes
///
/// Each `introspect` call is counted and can be delayed to widen race windows.
pub struct FakeCatalog {
    indexes: BTreeMap<String, SchemaIndex>,
    unreachable: Mutex<HashSet<String>>,
    delay: Option<Duration>,
    introspections: AtomicUsize,
}

impl FakeCatalog {
    pub fn new(indexes: impl IntoIterator<Item = SchemaIndex>) -> Self {
        Self {
            indexes: indexes
                .into_iter()
                .map(|index| (index.database.clone(), index))
                .collect(),
            unreachable: Mutex::new(HashSet::new()),
            delay: None,
            introspections: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Make introspection of `database` fail from now on
    pub fn set_unreachable(&self, database: &str) {
        self.unreachable
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(database.to_string());
    }

    pub fn introspections(&self) -> usize {
        self.introspections.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SchemaCatalog for FakeCatalog {
    fn engine(&self) -> DatabaseEngine {
        DatabaseEngine::Sqlite
    }

    async fn list_databases(&self) -> Result<Vec<String>> {
        Ok(self.indexes.keys().cloned().collect())
    }

    async fn introspect(&self, database: &str) -> Result<SchemaIndex> {
        self.introspections.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let unreachable = self
            .unreachable
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains(database);
        if unreachable {
            return Err(Error::introspection(
                database,
                anyhow::anyhow!("connection refused"),
            ));
        }

        self.indexes.get(database).cloned().ok_or_else(|| {
            Error::introspection(
                database,
                anyhow::anyhow!("database \"{}\" does not exist", database),
            )
        })
    }

    async fn execute_sql(&self, database: &str, sql: &str) -> Result<QueryRows> {
        if !self.indexes.contains_key(database) {
            return Err(Error::Query {
                database: database.to_string(),
                message: format!("unknown database, cannot run: {}", sql),
            });
        }
        Ok(QueryRows {
            columns: vec!["count".to_string()],
            rows: vec![vec![serde_json::json!(1)]],
        })
    }
}

/// A cut-down sakila catalog: film, customer, rental and a view
pub fn sakila_index() -> SchemaIndex {
    let film = TableDescriptor::new("public", "film", TableKind::Table)
        .column("film_id", "integer", true, false)
        .column("title", "text", false, false)
        .column("description", "text", false, true)
        .column("release_year", "integer", false, true)
        .column("rental_duration", "smallint", false, false)
        .column("rental_rate", "numeric", false, false)
        .column("length", "smallint", false, true)
        .column("rating", "text", false, true);
    let customer = TableDescriptor::new("public", "customer", TableKind::Table)
        .column("customer_id", "integer", true, false)
        .column("store_id", "smallint", false, false)
        .column("first_name", "text", false, false)
        .column("last_name", "text", false, false)
        .column("email", "text", false, true)
        .column("active", "boolean", false, false)
        .column("create_date", "date", false, false);
    let rental = TableDescriptor::new("public", "rental", TableKind::Table)
        .column("rental_id", "integer", true, false)
        .column("rental_date", "timestamp", false, false)
        .column("inventory_id", "integer", false, false)
        .column("customer_id", "smallint", false, false)
        .column("return_date", "timestamp", false, true);
    let actor = TableDescriptor::new("public", "actor", TableKind::Table)
        .column("actor_id", "integer", true, false)
        .column("first_name", "text", false, false)
        .column("last_name", "text", false, false);

    SchemaIndex::new("sakila", vec![film, customer, rental, actor])
}

/// Index named `database` with a single table
pub fn single_table_index(database: &str, table: &str) -> SchemaIndex {
    SchemaIndex::new(
        database,
        vec![
            TableDescriptor::new("", table, TableKind::Table).column("id", "INTEGER", true, false),
        ],
    )
}

const CLUSTERS: &[&[&str]] = &[
    &["film", "movie", "movies", "films", "picture", "cinema", "video"],
    &["rental", "rentals", "rent", "lease", "hire", "borrowing"],
    &["number", "count", "total", "amount", "quantity", "figure"],
    &["customer", "client", "patron", "buyer", "shopper", "consumer"],
    &["actor", "actress", "performer", "star", "cast", "artist"],
];

/// Embedding space of five orthogonal word clusters
///
/// Every cluster has at least six members, so the five nearest neighbours of
/// any word stay inside its own cluster.
pub fn movie_space() -> EmbeddingSpace {
    let dimension = CLUSTERS.len() + 1;
    let entries = CLUSTERS.iter().enumerate().flat_map(|(axis, words)| {
        words.iter().enumerate().map(move |(rank, word)| {
            let mut vector = vec![0.0f32; dimension];
            vector[axis] = 1.0;
            vector[dimension - 1] = 0.05 * rank as f32;
            (*word, vector)
        })
    });
    EmbeddingSpace::from_vectors("movie-space", entries)
        .unwrap_or_else(|e| panic!("fixture space is valid: {}", e))
}
