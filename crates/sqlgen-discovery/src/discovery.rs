//! Table discovery: question in, relevant tables out

use crate::index::SchemaIndexCache;
use crate::keywords::KeywordExtractor;
use crate::matcher::FuzzyMatcher;
use crate::synonyms::SynonymExpander;
use sqlgen_core::{Error, Result, SqlGenConfig, TableDescriptor};
use sqlgen_database::DatabaseServices;
use sqlgen_telemetry::{DiscoverySpanAttributes, trace_discovery};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

/// Tables judged relevant to a question
///
/// `tables` are in index order; an empty list is a normal outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    pub database: String,
    /// Expanded, deduplicated keywords that were searched
    pub keywords: Vec<String>,
    pub tables: Vec<TableDescriptor>,
}

impl MatchResult {
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn table_names(&self) -> Vec<&str> {
        self.tables.iter().map(|t| t.name.as_str()).collect()
    }
}

/// Runs keyword extraction, synonym expansion, index lookup and matching
#[derive(Clone)]
pub struct DiscoveryOrchestrator {
    extractor: KeywordExtractor,
    expander: Arc<SynonymExpander>,
    cache: Arc<SchemaIndexCache>,
}

impl DiscoveryOrchestrator {
    pub fn new(
        extractor: KeywordExtractor,
        expander: Arc<SynonymExpander>,
        cache: Arc<SchemaIndexCache>,
    ) -> Self {
        Self {
            extractor,
            expander,
            cache,
        }
    }

    /// Wire up the configured tagger, startup embedding space and a cache
    /// persisting to the services' blob store
    pub async fn from_config(config: &SqlGenConfig, services: &DatabaseServices) -> Result<Self> {
        let extractor = KeywordExtractor::from_config(&config.keywords)?;
        let expander = SynonymExpander::from_config(&config.embeddings).await?;
        let cache = SchemaIndexCache::new(services.catalog.clone(), services.blobs.clone());
        Ok(Self::new(extractor, Arc::new(expander), Arc::new(cache)))
    }

    pub fn cache(&self) -> &Arc<SchemaIndexCache> {
        &self.cache
    }

    pub fn expander(&self) -> &Arc<SynonymExpander> {
        &self.expander
    }

    /// Keywords of `query` plus their synonyms, deduplicated in first-seen order
    pub fn expand_keywords(&self, query: &str, max_synonyms: usize) -> Vec<String> {
        let keywords = self.extractor.extract(query);

        let mut seen = HashSet::new();
        let mut expanded = Vec::new();
        for keyword in &keywords {
            let candidates = std::iter::once(keyword.clone())
                .chain(self.expander.expand(keyword, max_synonyms));
            for candidate in candidates {
                if seen.insert(candidate.clone()) {
                    expanded.push(candidate);
                }
            }
        }
        expanded
    }

    /// Tables of `database` relevant to `query`
    ///
    /// `similarity_threshold` must be within 0-100; matches need a score
    /// strictly above it.
    pub async fn discover(
        &self,
        database: &str,
        query: &str,
        similarity_threshold: u8,
        max_synonyms: usize,
    ) -> Result<MatchResult> {
        if similarity_threshold > 100 {
            return Err(Error::config_error(format!(
                "Similarity threshold must be between 0 and 100, got {}",
                similarity_threshold
            )));
        }

        let started = Instant::now();
        let keywords = self.expand_keywords(query, max_synonyms);
        let index = self.cache.get_index(database, false).await?;

        let tables: Vec<TableDescriptor> = FuzzyMatcher::new(similarity_threshold)
            .match_tables(&index, &keywords)
            .into_iter()
            .cloned()
            .collect();

        let duration_ms = started.elapsed().as_millis() as u64;
        tracing::debug!(
            database,
            keywords = keywords.len(),
            tables = tables.len(),
            duration_ms,
            "Discovered tables"
        );
        trace_discovery(DiscoverySpanAttributes {
            database: database.to_string(),
            query: query.to_string(),
            similarity_threshold,
            max_synonyms,
            keyword_count: keywords.len(),
            table_count: tables.len(),
            duration_ms,
        });

        Ok(MatchResult {
            database: database.to_string(),
            keywords,
            tables,
        })
    }
}
