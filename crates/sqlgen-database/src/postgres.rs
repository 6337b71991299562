//! PostgreSQL schema catalog

use crate::catalog::{group_columns, ColumnRow, QueryRows, SchemaCatalog};
use anyhow::anyhow;
use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use sqlgen_core::{
    DatabaseConfig, DatabaseEngine, Error, ForeignKey, Result, SchemaIndex, ViewDependency,
};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgRow};
use sqlx::{Column, PgPool, Row, TypeInfo};
use std::time::{Duration, Instant};

const DATABASES_QUERY: &str = r#"
SELECT datname::text AS datname
FROM pg_database
WHERE datistemplate = false
ORDER BY datname
"#;

const COLUMNS_QUERY: &str = r#"
SELECT
    c.table_schema::text AS table_schema,
    c.table_name::text AS table_name,
    t.table_type::text AS table_type,
    c.column_name::text AS column_name,
    c.data_type::text AS data_type,
    EXISTS (
        SELECT 1
        FROM information_schema.table_constraints tco
        JOIN information_schema.key_column_usage kcu
            ON kcu.constraint_name = tco.constraint_name
            AND kcu.constraint_schema = tco.constraint_schema
        WHERE tco.constraint_type = 'PRIMARY KEY'
          AND kcu.table_schema = c.table_schema
          AND kcu.table_name = c.table_name
          AND kcu.column_name = c.column_name
    ) AS is_primary_key,
    (c.is_nullable = 'YES') AS is_nullable
FROM information_schema.columns c
JOIN information_schema.tables t
    ON c.table_catalog = t.table_catalog
    AND c.table_schema = t.table_schema
    AND c.table_name = t.table_name
WHERE c.table_schema <> ALL($1::text[])
ORDER BY c.table_schema, c.table_name, c.ordinal_position
"#;

const FOREIGN_KEYS_QUERY: &str = r#"
SELECT
    tc.table_schema::text AS source_schema,
    tc.table_name::text AS source_table,
    kcu.column_name::text AS source_column,
    ccu.table_schema::text AS target_schema,
    ccu.table_name::text AS target_table,
    ccu.column_name::text AS target_column
FROM information_schema.table_constraints AS tc
JOIN information_schema.key_column_usage AS kcu
    ON tc.constraint_name = kcu.constraint_name
    AND tc.table_schema = kcu.table_schema
JOIN information_schema.constraint_column_usage AS ccu
    ON ccu.constraint_name = tc.constraint_name
    AND ccu.constraint_schema = tc.constraint_schema
WHERE tc.constraint_type = 'FOREIGN KEY'
  AND tc.table_schema <> ALL($1::text[])
ORDER BY 1, 2, 3
"#;

const VIEW_DEPENDENCIES_QUERY: &str = r#"
SELECT DISTINCT
    vn.nspname::text AS view_schema,
    v.relname::text AS view_name,
    tn.nspname::text AS table_schema,
    t.relname::text AS table_name
FROM pg_catalog.pg_depend d
JOIN pg_catalog.pg_rewrite r ON d.objid = r.oid
JOIN pg_catalog.pg_class v ON r.ev_class = v.oid
JOIN pg_catalog.pg_namespace vn ON v.relnamespace = vn.oid
JOIN pg_catalog.pg_class t ON d.refobjid = t.oid
JOIN pg_catalog.pg_namespace tn ON t.relnamespace = tn.oid
WHERE v.relkind = 'v'
  AND t.relkind = 'r'
  AND vn.nspname <> ALL($1::text[])
ORDER BY 1, 2, 3, 4
"#;

#[derive(Debug, sqlx::FromRow)]
struct ForeignKeyRow {
    source_schema: String,
    source_table: String,
    source_column: String,
    target_schema: String,
    target_table: String,
    target_column: String,
}

#[derive(Debug, sqlx::FromRow)]
struct ViewDependencyRow {
    view_schema: String,
    view_name: String,
    table_schema: String,
    table_name: String,
}

/// PostgreSQL catalog
///
/// Holds one pool per database name; pools are created on first use and every
/// call names its target database explicitly.
pub struct PostgresCatalog {
    config: DatabaseConfig,
    pools: DashMap<String, PgPool>,
}

impl PostgresCatalog {
    pub fn new(config: DatabaseConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            pools: DashMap::new(),
        })
    }

    fn connect_options(&self, database: &str, read_only: bool) -> PgConnectOptions {
        let mut options = PgConnectOptions::new()
            .host(&self.config.host)
            .port(self.config.port)
            .database(database)
            .application_name("sqlgen");

        if let Some(ref user) = self.config.user {
            options = options.username(user);
        }
        if let Some(ref password) = self.config.password {
            options = options.password(password);
        }
        if read_only {
            options = options.options([("default_transaction_read_only", "on")]);
        }
        options
    }

    /// Pool for a database, created lazily (no connection is opened here)
    fn pool(&self, database: &str) -> PgPool {
        self.pools
            .entry(database.to_string())
            .or_insert_with(|| {
                tracing::debug!(database = %database, "Creating PostgreSQL pool");
                PgPoolOptions::new()
                    .max_connections(self.config.max_connections)
                    .acquire_timeout(Duration::from_secs(self.config.timeout_secs))
                    .connect_lazy_with(self.connect_options(database, self.config.read_only))
            })
            .clone()
    }

    /// Drop the pool of a database that could not be read, so names that
    /// never resolve do not accumulate pools
    fn evict(&self, database: &str) {
        if self.pools.remove(database).is_some() {
            tracing::debug!(database = %database, "Dropped PostgreSQL pool");
        }
    }

    fn ensure_searchable(&self, database: &str) -> std::result::Result<(), String> {
        if self.config.is_searchable(database) {
            Ok(())
        } else {
            Err(format!("Database '{}' is excluded from discovery", database))
        }
    }

    /// Read-write pool on the control database (blob and history storage)
    pub fn control_pool(&self) -> PgPool {
        PgPoolOptions::new()
            .max_connections(self.config.max_connections)
            .acquire_timeout(Duration::from_secs(self.config.timeout_secs))
            .connect_lazy_with(self.connect_options(&self.config.control_database, false))
    }
}

#[async_trait]
impl SchemaCatalog for PostgresCatalog {
    fn engine(&self) -> DatabaseEngine {
        DatabaseEngine::Postgresql
    }

    async fn list_databases(&self) -> Result<Vec<String>> {
        let control = &self.config.control_database;
        let pool = self.pool(control);

        let names: Vec<String> = sqlx::query_scalar(DATABASES_QUERY)
            .fetch_all(&pool)
            .await
            .map_err(|e| Error::introspection(control.clone(), anyhow!("Failed to list databases: {}", e)))?;

        Ok(names
            .into_iter()
            .filter(|name| self.config.is_searchable(name))
            .collect())
    }

    async fn introspect(&self, database: &str) -> Result<SchemaIndex> {
        let started = Instant::now();
        self.ensure_searchable(database)
            .map_err(|message| Error::introspection(database, anyhow!(message)))?;
        let pool = self.pool(database);
        let system_schemas = self.config.system_schemas.clone();

        let catalog = read_catalog(&pool, &system_schemas).await;
        let (columns, foreign_keys, view_dependencies) = match catalog {
            Ok(rows) => rows,
            Err(e) => {
                self.evict(database);
                return Err(Error::introspection(database, e));
            }
        };

        let mut index = SchemaIndex::new(database, group_columns(columns));
        index.foreign_keys = foreign_keys
            .into_iter()
            .map(|fk| ForeignKey {
                source_schema: fk.source_schema,
                source_table: fk.source_table,
                source_column: fk.source_column,
                target_schema: fk.target_schema,
                target_table: fk.target_table,
                target_column: fk.target_column,
            })
            .collect();
        index.view_dependencies = view_dependencies
            .into_iter()
            .map(|dep| ViewDependency {
                view_schema: dep.view_schema,
                view_name: dep.view_name,
                table_schema: dep.table_schema,
                table_name: dep.table_name,
            })
            .collect();

        tracing::info!(
            database = %database,
            tables = index.len(),
            foreign_keys = index.foreign_keys.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Introspected PostgreSQL database"
        );

        Ok(index)
    }

    async fn execute_sql(&self, database: &str, sql: &str) -> Result<QueryRows> {
        tracing::debug!(database = %database, sql = %sql, "Executing PostgreSQL query");

        self.ensure_searchable(database).map_err(|message| Error::Query {
            database: database.to_string(),
            message,
        })?;

        let pool = self.pool(database);
        let rows = sqlx::query(sql).fetch_all(&pool).await.map_err(|e| {
            if is_connection_failure(&e) {
                self.evict(database);
            }
            Error::Query {
                database: database.to_string(),
                message: e.to_string(),
            }
        })?;

        Ok(rows_to_json(&rows))
    }
}

type CatalogRows = (Vec<ColumnRow>, Vec<ForeignKeyRow>, Vec<ViewDependencyRow>);

async fn read_catalog(pool: &PgPool, system_schemas: &[String]) -> anyhow::Result<CatalogRows> {
    let columns: Vec<ColumnRow> = sqlx::query_as(COLUMNS_QUERY)
        .bind(system_schemas)
        .fetch_all(pool)
        .await
        .map_err(|e| anyhow!("Failed to read columns: {}", e))?;

    let foreign_keys: Vec<ForeignKeyRow> = sqlx::query_as(FOREIGN_KEYS_QUERY)
        .bind(system_schemas)
        .fetch_all(pool)
        .await
        .map_err(|e| anyhow!("Failed to read foreign keys: {}", e))?;

    let view_dependencies: Vec<ViewDependencyRow> = sqlx::query_as(VIEW_DEPENDENCIES_QUERY)
        .bind(system_schemas)
        .fetch_all(pool)
        .await
        .map_err(|e| anyhow!("Failed to read view dependencies: {}", e))?;

    Ok((columns, foreign_keys, view_dependencies))
}

/// Errors meaning the pool cannot reach the database at all
/// (`3D000` is PostgreSQL's "database does not exist")
fn is_connection_failure(error: &sqlx::Error) -> bool {
    match error {
        sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::Tls(_) => true,
        sqlx::Error::Database(db) => db.code().as_deref() == Some("3D000"),
        _ => false,
    }
}

fn rows_to_json(rows: &[PgRow]) -> QueryRows {
    let columns = rows
        .first()
        .map(|row| {
            row.columns()
                .iter()
                .map(|c| c.name().to_string())
                .collect()
        })
        .unwrap_or_default();

    let rows = rows
        .iter()
        .map(|row| (0..row.len()).map(|i| decode_value(row, i)).collect())
        .collect();

    QueryRows { columns, rows }
}

/// Decode one cell into JSON, trying the common PostgreSQL types in turn
fn decode_value(row: &PgRow, index: usize) -> Value {
    if let Ok(v) = row.try_get::<Option<String>, _>(index) {
        return v.map(Value::String).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<i64>, _>(index) {
        return v.map(Value::from).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<i32>, _>(index) {
        return v.map(Value::from).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<i16>, _>(index) {
        return v.map(Value::from).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<f64>, _>(index) {
        return v.map(Value::from).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<f32>, _>(index) {
        return v.map(Value::from).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<bool>, _>(index) {
        return v.map(Value::Bool).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(index) {
        return v.map(|d| Value::String(d.to_rfc3339())).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<chrono::NaiveDateTime>, _>(index) {
        return v.map(|d| Value::String(d.to_string())).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<chrono::NaiveDate>, _>(index) {
        return v.map(|d| Value::String(d.to_string())).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<Value>, _>(index) {
        return v.unwrap_or(Value::Null);
    }

    let type_name = row.column(index).type_info().name().to_string();
    Value::String(format!("<{}>", type_name))
}
