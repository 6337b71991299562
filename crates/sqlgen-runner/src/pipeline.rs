//! Metadata publishing job
//!
//! Rebuilds and persists the schema index of every searchable database so
//! that later discovery requests start from the blob store.

use serde::Serialize;
use sqlgen_core::Result;
use sqlgen_database::SchemaCatalog;
use sqlgen_discovery::SchemaIndexCache;
use std::time::Instant;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublishedIndex {
    pub database: String,
    pub tables: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublishFailure {
    pub database: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PublishReport {
    pub published: Vec<PublishedIndex>,
    pub failed: Vec<PublishFailure>,
}

impl PublishReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Force-refresh the index of every database the catalog lists
///
/// A failing database is reported and skipped. Only a failure to list the
/// databases aborts the job.
pub async fn publish_all(
    catalog: &dyn SchemaCatalog,
    cache: &SchemaIndexCache,
) -> Result<PublishReport> {
    let started = Instant::now();
    let databases = catalog.list_databases().await?;
    let mut report = PublishReport::default();

    for database in databases {
        match cache.get_index(&database, true).await {
            Ok(index) => {
                tracing::info!(database = %database, tables = index.len(), "Published schema index");
                report.published.push(PublishedIndex {
                    database,
                    tables: index.len(),
                });
            }
            Err(e) => {
                tracing::warn!(database = %database, error = %e, "Failed to publish schema index");
                report.failed.push(PublishFailure {
                    database,
                    error: e.to_string(),
                });
            }
        }
    }

    tracing::info!(
        published = report.published.len(),
        failed = report.failed.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Metadata publishing finished"
    );
    Ok(report)
}
