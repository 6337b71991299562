//! Table metadata types
//!
//! A [`SchemaIndex`] is the catalog of one database: every table and view with
//! its columns, plus foreign-key and view-dependency edges. It is what table
//! discovery searches and what gets persisted between process restarts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Whether a relation is a base table or a view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableKind {
    Table,
    View,
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableKind::Table => write!(f, "table"),
            TableKind::View => write!(f, "view"),
        }
    }
}

/// One column of a table or view
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub name: String,
    pub data_type: String,
    pub is_primary_key: bool,
    pub is_nullable: bool,
}

/// Structured metadata for one table or view
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDescriptor {
    /// Empty for engines without schemas (SQLite)
    pub schema: String,
    pub name: String,
    pub kind: TableKind,
    /// Columns in declaration order
    pub columns: Vec<ColumnDescriptor>,
}

impl TableDescriptor {
    pub fn new(schema: impl Into<String>, name: impl Into<String>, kind: TableKind) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
            kind,
            columns: Vec::new(),
        }
    }

    /// Append a column (builder style, mostly for fixtures)
    pub fn column(
        mut self,
        name: impl Into<String>,
        data_type: impl Into<String>,
        is_primary_key: bool,
        is_nullable: bool,
    ) -> Self {
        self.columns.push(ColumnDescriptor {
            name: name.into(),
            data_type: data_type.into(),
            is_primary_key,
            is_nullable,
        });
        self
    }

    /// `schema.name`, or just `name` when there is no schema
    pub fn qualified_name(&self) -> String {
        if self.schema.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.schema, self.name)
        }
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn primary_key(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.is_primary_key)
            .map(|c| c.name.as_str())
            .collect()
    }
}

/// A foreign-key edge between two columns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
    pub source_schema: String,
    pub source_table: String,
    pub source_column: String,
    pub target_schema: String,
    pub target_table: String,
    pub target_column: String,
}

/// A view reading from a base table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewDependency {
    pub view_schema: String,
    pub view_name: String,
    pub table_schema: String,
    pub table_name: String,
}

/// The table catalog of a single database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaIndex {
    pub database: String,
    pub tables: Vec<TableDescriptor>,
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKey>,
    #[serde(default)]
    pub view_dependencies: Vec<ViewDependency>,
    pub built_at: DateTime<Utc>,
}

impl SchemaIndex {
    pub fn new(database: impl Into<String>, tables: Vec<TableDescriptor>) -> Self {
        Self {
            database: database.into(),
            tables,
            foreign_keys: Vec::new(),
            view_dependencies: Vec::new(),
            built_at: Utc::now(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn table(&self, schema: &str, name: &str) -> Option<&TableDescriptor> {
        self.tables
            .iter()
            .find(|t| t.schema == schema && t.name == name)
    }

    /// First table with the given name in any schema
    pub fn find_table(&self, name: &str) -> Option<&TableDescriptor> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// Foreign keys leaving the given table
    pub fn foreign_keys_from(&self, schema: &str, table: &str) -> Vec<&ForeignKey> {
        self.foreign_keys
            .iter()
            .filter(|fk| fk.source_schema == schema && fk.source_table == table)
            .collect()
    }

    /// Base tables a view reads from
    pub fn view_sources(&self, schema: &str, view: &str) -> Vec<&ViewDependency> {
        self.view_dependencies
            .iter()
            .filter(|dep| dep.view_schema == schema && dep.view_name == view)
            .collect()
    }

    /// Blob key the index is persisted under
    pub fn storage_key(database: &str) -> String {
        format!("{}_table_columns", database)
    }

    /// Serialize for the blob store
    pub fn to_bytes(&self) -> crate::Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Deserialize a blob written by [`SchemaIndex::to_bytes`]
    pub fn from_bytes(bytes: &[u8]) -> crate::Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SchemaIndex {
        let film = TableDescriptor::new("public", "film", TableKind::Table)
            .column("film_id", "integer", true, false)
            .column("title", "text", false, false);
        let rental = TableDescriptor::new("public", "rental", TableKind::Table)
            .column("rental_id", "integer", true, false)
            .column("film_id", "integer", false, true);
        let mut index = SchemaIndex::new("sakila", vec![film, rental]);
        index.foreign_keys.push(ForeignKey {
            source_schema: "public".into(),
            source_table: "rental".into(),
            source_column: "film_id".into(),
            target_schema: "public".into(),
            target_table: "film".into(),
            target_column: "film_id".into(),
        });
        index
    }

    #[test]
    fn test_qualified_name() {
        let t = TableDescriptor::new("public", "film", TableKind::Table);
        assert_eq!(t.qualified_name(), "public.film");
        let t = TableDescriptor::new("", "film", TableKind::View);
        assert_eq!(t.qualified_name(), "film");
    }

    #[test]
    fn test_lookup_helpers() {
        let index = sample();
        assert_eq!(index.len(), 2);
        assert!(index.table("public", "film").is_some());
        assert!(index.table("other", "film").is_none());
        assert_eq!(index.find_table("rental").unwrap().primary_key(), vec!["rental_id"]);
        assert_eq!(index.foreign_keys_from("public", "rental").len(), 1);
        assert!(index.foreign_keys_from("public", "film").is_empty());
    }

    #[test]
    fn test_blob_round_trip_is_lossless() {
        let index = sample();
        let bytes = index.to_bytes().unwrap();
        let restored = SchemaIndex::from_bytes(&bytes).unwrap();
        assert_eq!(restored, index);
    }

    #[test]
    fn test_storage_key() {
        assert_eq!(SchemaIndex::storage_key("sakila"), "sakila_table_columns");
    }

    #[test]
    fn test_kind_serializes_lowercase() {
        let json = serde_json::to_string(&TableKind::View).unwrap();
        assert_eq!(json, "\"view\"");
    }
}
