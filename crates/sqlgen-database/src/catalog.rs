//! Schema catalog trait and shared row types

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlgen_core::{
    ColumnDescriptor, DatabaseEngine, Result, SchemaIndex, TableDescriptor, TableKind,
};

/// Source of database names, table metadata and query execution
#[async_trait]
pub trait SchemaCatalog: Send + Sync {
    fn engine(&self) -> DatabaseEngine;

    /// Databases offered for discovery (administrative databases excluded)
    async fn list_databases(&self) -> Result<Vec<String>>;

    /// Read the table, column, key and view metadata of one database
    ///
    /// Failures are [`sqlgen_core::Error::Introspection`]; an unreachable
    /// database never yields an empty index.
    async fn introspect(&self, database: &str) -> Result<SchemaIndex>;

    /// Run arbitrary SQL against one database
    ///
    /// A failing statement is [`sqlgen_core::Error::Query`].
    async fn execute_sql(&self, database: &str, sql: &str) -> Result<QueryRows>;
}

/// Tabular result of [`SchemaCatalog::execute_sql`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryRows {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<serde_json::Value>>,
}

impl QueryRows {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// One column as returned by an introspection query
#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct ColumnRow {
    pub table_schema: String,
    pub table_name: String,
    pub table_type: String,
    pub column_name: String,
    pub data_type: String,
    pub is_primary_key: bool,
    pub is_nullable: bool,
}

/// Fold column rows into tables
///
/// Rows of one table must be contiguous; column order is kept.
pub(crate) fn group_columns(rows: impl IntoIterator<Item = ColumnRow>) -> Vec<TableDescriptor> {
    let mut tables: Vec<TableDescriptor> = Vec::new();

    for row in rows {
        let same_table = tables
            .last()
            .is_some_and(|t| t.schema == row.table_schema && t.name == row.table_name);

        if !same_table {
            tables.push(TableDescriptor::new(
                row.table_schema.clone(),
                row.table_name.clone(),
                table_kind(&row.table_type),
            ));
        }

        if let Some(table) = tables.last_mut() {
            table.columns.push(ColumnDescriptor {
                name: row.column_name,
                data_type: row.data_type,
                is_primary_key: row.is_primary_key,
                is_nullable: row.is_nullable,
            });
        }
    }

    tables
}

/// Map engine table-type labels to [`TableKind`]
pub(crate) fn table_kind(label: &str) -> TableKind {
    match label.to_ascii_uppercase().as_str() {
        "VIEW" => TableKind::View,
        _ => TableKind::Table,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(schema: &str, table: &str, kind: &str, column: &str, pk: bool) -> ColumnRow {
        ColumnRow {
            table_schema: schema.to_string(),
            table_name: table.to_string(),
            table_type: kind.to_string(),
            column_name: column.to_string(),
            data_type: "integer".to_string(),
            is_primary_key: pk,
            is_nullable: !pk,
        }
    }

    #[test]
    fn test_group_columns_keeps_order() {
        let tables = group_columns(vec![
            row("public", "film", "BASE TABLE", "film_id", true),
            row("public", "film", "BASE TABLE", "title", false),
            row("public", "film_list", "VIEW", "fid", false),
            row("sales", "film", "BASE TABLE", "id", true),
        ]);

        assert_eq!(tables.len(), 3);
        assert_eq!(tables[0].qualified_name(), "public.film");
        assert_eq!(
            tables[0].column_names().collect::<Vec<_>>(),
            vec!["film_id", "title"]
        );
        assert_eq!(tables[0].primary_key(), vec!["film_id"]);
        assert_eq!(tables[1].kind, TableKind::View);
        assert_eq!(tables[2].qualified_name(), "sales.film");
    }

    #[test]
    fn test_table_kind_labels() {
        assert_eq!(table_kind("VIEW"), TableKind::View);
        assert_eq!(table_kind("view"), TableKind::View);
        assert_eq!(table_kind("BASE TABLE"), TableKind::Table);
        assert_eq!(table_kind("table"), TableKind::Table);
    }
}
