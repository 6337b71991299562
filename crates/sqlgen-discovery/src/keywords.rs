//! Keyword extraction from natural-language questions

use crate::inflect::singular_noun;
use crate::tagger::{LexiconTagger, PosTag, PosTagger};
use sqlgen_core::{KeywordConfig, Result};
use std::sync::Arc;

/// Tags kept as keywords
pub const KEYWORD_TAGS: [PosTag; 3] = [PosTag::Noun, PosTag::Propn, PosTag::Num];

/// Pulls the content words out of a question
///
/// Keeps tokens tagged NOUN, PROPN or NUM in query order, then appends the
/// singular of every kept plural. The output may contain duplicates.
#[derive(Clone)]
pub struct KeywordExtractor {
    tagger: Arc<dyn PosTagger>,
}

impl KeywordExtractor {
    pub fn new(tagger: Arc<dyn PosTagger>) -> Self {
        Self { tagger }
    }

    /// Built-in lexicon tagger, extended from `lexicon_path` when configured
    ///
    /// A lexicon that cannot be loaded is [`sqlgen_core::Error::Model`].
    pub fn from_config(config: &KeywordConfig) -> Result<Self> {
        let tagger = match &config.lexicon_path {
            Some(path) => LexiconTagger::from_file(path)?,
            None => LexiconTagger::new(),
        };
        Ok(Self::new(Arc::new(tagger)))
    }

    pub fn extract(&self, query: &str) -> Vec<String> {
        if query.trim().is_empty() {
            return Vec::new();
        }

        let mut keywords: Vec<String> = self
            .tagger
            .tag(query)
            .into_iter()
            .filter(|token| KEYWORD_TAGS.contains(&token.tag))
            .map(|token| token.text)
            .collect();

        let singulars: Vec<String> = keywords
            .iter()
            .filter_map(|keyword| singular_noun(keyword))
            .collect();
        keywords.extend(singulars);

        tracing::debug!(query, keywords = ?keywords, "Extracted keywords");
        keywords
    }
}

impl Default for KeywordExtractor {
    fn default() -> Self {
        Self::new(Arc::new(LexiconTagger::new()))
    }
}
