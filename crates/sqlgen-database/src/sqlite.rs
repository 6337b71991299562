//! SQLite schema catalog
//!
//! Each configured name maps to one SQLite database file. SQLite has no schemas,
//! so every table is reported with an empty schema.

use crate::catalog::{ColumnRow, QueryRows, SchemaCatalog, group_columns};
use anyhow::anyhow;
use async_trait::async_trait;
use dashmap::DashMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use sqlgen_core::{
    DatabaseConfig, DatabaseEngine, Error, ForeignKey, Result, SchemaIndex, ViewDependency,
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Row, SqlitePool, TypeInfo};
use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;
use std::time::{Duration, Instant};

const OBJECTS_QUERY: &str = r#"
SELECT name, type, COALESCE(sql, '') AS sql
FROM sqlite_master
WHERE type IN ('table', 'view')
  AND name NOT LIKE 'sqlite_%'
ORDER BY name
"#;

/// Relations named after FROM or JOIN in a view definition
static VIEW_SOURCE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\b(?:from|join)\s+[\["`]?([A-Za-z_][A-Za-z0-9_]*)"#)
        .expect("view source pattern is valid")
});

#[derive(Debug, sqlx::FromRow)]
struct ObjectRow {
    name: String,
    #[sqlx(rename = "type")]
    kind: String,
    sql: String,
}

#[derive(Debug, sqlx::FromRow)]
struct TableInfoRow {
    name: String,
    #[sqlx(rename = "type")]
    data_type: String,
    notnull: i64,
    pk: i64,
}

#[derive(Debug, sqlx::FromRow)]
struct ForeignKeyListRow {
    table: String,
    from: String,
    to: Option<String>,
}

/// SQLite catalog over a fixed set of named database URLs
pub struct SqliteCatalog {
    databases: BTreeMap<String, String>,
    excluded: Vec<String>,
    read_only: bool,
    max_connections: u32,
    timeout: Duration,
    pools: DashMap<String, SqlitePool>,
}

impl SqliteCatalog {
    pub fn new(config: &DatabaseConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            databases: config.sqlite_databases.clone(),
            excluded: config.excluded_databases.clone(),
            read_only: config.read_only,
            max_connections: config.max_connections,
            timeout: Duration::from_secs(config.timeout_secs),
            pools: DashMap::new(),
        })
    }

    fn pool(&self, database: &str) -> Result<SqlitePool> {
        if let Some(pool) = self.pools.get(database) {
            return Ok(pool.clone());
        }

        let url = self.databases.get(database).ok_or_else(|| {
            Error::introspection(database, anyhow!("Unknown SQLite database '{}'", database))
        })?;

        let mut options = SqliteConnectOptions::from_str(url)
            .map_err(|e| Error::config_error(format!("Invalid SQLite URL '{}': {}", url, e)))?;
        if self.read_only {
            options = options.read_only(true).create_if_missing(false);
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(self.max_connections)
            .acquire_timeout(self.timeout)
            .connect_lazy_with(options);

        tracing::debug!(database = %database, "Creating SQLite pool");
        Ok(self
            .pools
            .entry(database.to_string())
            .or_insert(pool)
            .clone())
    }

    async fn read_columns(pool: &SqlitePool, objects: &[ObjectRow]) -> sqlx::Result<Vec<ColumnRow>> {
        let mut columns = Vec::new();
        for object in objects {
            let pragma = format!("PRAGMA table_info({})", quote_identifier(&object.name));
            let infos: Vec<TableInfoRow> = sqlx::query_as(&pragma).fetch_all(pool).await?;
            for info in infos {
                columns.push(ColumnRow {
                    table_schema: String::new(),
                    table_name: object.name.clone(),
                    table_type: object.kind.clone(),
                    column_name: info.name,
                    data_type: info.data_type,
                    is_primary_key: info.pk > 0,
                    is_nullable: info.notnull == 0 && info.pk == 0,
                });
            }
        }
        Ok(columns)
    }

    async fn read_foreign_keys(
        pool: &SqlitePool,
        index: &SchemaIndex,
    ) -> sqlx::Result<Vec<ForeignKey>> {
        let mut foreign_keys = Vec::new();
        for table in index.tables.iter().filter(|t| t.kind == sqlgen_core::TableKind::Table) {
            let pragma = format!("PRAGMA foreign_key_list({})", quote_identifier(&table.name));
            let rows: Vec<ForeignKeyListRow> = sqlx::query_as(&pragma).fetch_all(pool).await?;
            for row in rows {
                // A missing target column refers to the target's primary key
                let target_column = row.to.unwrap_or_else(|| {
                    index
                        .find_table(&row.table)
                        .and_then(|t| t.primary_key().first().map(|c| c.to_string()))
                        .unwrap_or_default()
                });
                foreign_keys.push(ForeignKey {
                    source_schema: String::new(),
                    source_table: table.name.clone(),
                    source_column: row.from,
                    target_schema: String::new(),
                    target_table: row.table,
                    target_column,
                });
            }
        }
        Ok(foreign_keys)
    }
}

#[async_trait]
impl SchemaCatalog for SqliteCatalog {
    fn engine(&self) -> DatabaseEngine {
        DatabaseEngine::Sqlite
    }

    async fn list_databases(&self) -> Result<Vec<String>> {
        Ok(self
            .databases
            .keys()
            .filter(|name| !self.excluded.contains(name))
            .cloned()
            .collect())
    }

    async fn introspect(&self, database: &str) -> Result<SchemaIndex> {
        let started = Instant::now();
        let pool = self.pool(database)?;

        let objects: Vec<ObjectRow> = sqlx::query_as(OBJECTS_QUERY)
            .fetch_all(&pool)
            .await
            .map_err(|e| Error::introspection(database, anyhow!("Failed to read sqlite_master: {}", e)))?;

        let columns = Self::read_columns(&pool, &objects)
            .await
            .map_err(|e| Error::introspection(database, anyhow!("Failed to read columns: {}", e)))?;

        let mut index = SchemaIndex::new(database, group_columns(columns));

        index.foreign_keys = Self::read_foreign_keys(&pool, &index)
            .await
            .map_err(|e| {
                Error::introspection(database, anyhow!("Failed to read foreign keys: {}", e))
            })?;

        let base_tables: BTreeSet<String> = objects
            .iter()
            .filter(|o| o.kind == "table")
            .map(|o| o.name.to_lowercase())
            .collect();
        index.view_dependencies = objects
            .iter()
            .filter(|o| o.kind == "view")
            .flat_map(|view| {
                view_sources(&view.sql, &base_tables)
                    .into_iter()
                    .map(move |table| ViewDependency {
                        view_schema: String::new(),
                        view_name: view.name.clone(),
                        table_schema: String::new(),
                        table_name: table,
                    })
            })
            .collect();

        tracing::info!(
            database = %database,
            tables = index.len(),
            foreign_keys = index.foreign_keys.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Introspected SQLite database"
        );

        Ok(index)
    }

    async fn execute_sql(&self, database: &str, sql: &str) -> Result<QueryRows> {
        tracing::debug!(database = %database, sql = %sql, "Executing SQLite query");

        let pool = self.pool(database).map_err(|e| Error::Query {
            database: database.to_string(),
            message: e.to_string(),
        })?;

        let rows = sqlx::query(sql)
            .fetch_all(&pool)
            .await
            .map_err(|e| Error::Query {
                database: database.to_string(),
                message: e.to_string(),
            })?;

        Ok(rows_to_json(&rows))
    }
}

/// Quote an identifier for use inside a PRAGMA
fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Base tables a view definition reads from, in first-mention order
fn view_sources(view_sql: &str, base_tables: &BTreeSet<String>) -> Vec<String> {
    let mut seen = BTreeSet::new();
    VIEW_SOURCE_RE
        .captures_iter(view_sql)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
        .filter(|name| base_tables.contains(&name.to_lowercase()))
        .filter(|name| seen.insert(name.to_lowercase()))
        .collect()
}

fn rows_to_json(rows: &[SqliteRow]) -> QueryRows {
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

fn decode_value(row: &SqliteRow, index: usize) -> Value {
    if let Ok(v) = row.try_get::<Option<i64>, _>(index) {
        return v.map(Value::from).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<f64>, _>(index) {
        return v.map(Value::from).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<String>, _>(index) {
        return v.map(Value::String).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<Vec<u8>>, _>(index) {
        return v
            .map(|bytes| Value::String(format!("<{} bytes>", bytes.len())))
            .unwrap_or(Value::Null);
    }

    let type_name = row.column(index).type_info().name().to_string();
    Value::String(format!("<{}>", type_name))
}
