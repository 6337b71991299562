//! # sqlgen Discovery
//!
//! Finds the tables of a database that are relevant to a natural-language
//! question:
//!
//! 1. [`KeywordExtractor`] keeps the nouns, proper nouns and numbers of the
//!    question and adds singular forms of plurals.
//! 2. [`SynonymExpander`] adds nearest neighbours from a word-embedding space.
//! 3. [`SchemaIndexCache`] supplies the table catalog of the database.
//! 4. [`FuzzyMatcher`] keeps the tables whose name or columns resemble a keyword.
//!
//! [`DiscoveryOrchestrator`] runs the four steps in order.

pub mod discovery;
pub mod embeddings;
pub mod index;
pub mod inflect;
pub mod keywords;
pub mod matcher;
pub mod synonyms;
pub mod tagger;
pub mod testing;

pub use discovery::{DiscoveryOrchestrator, MatchResult};
pub use embeddings::EmbeddingSpace;
pub use index::SchemaIndexCache;
pub use inflect::singular_noun;
pub use keywords::KeywordExtractor;
pub use matcher::{FuzzyMatcher, partial_ratio};
pub use synonyms::SynonymExpander;
pub use tagger::{LexiconTagger, PosTag, PosTagger, TaggedToken};
