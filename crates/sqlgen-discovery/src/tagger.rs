//! Part-of-speech tagging
//!
//! Keyword extraction only needs to tell content words (nouns, proper nouns,
//! numbers) apart from everything else, so the bundled [`LexiconTagger`] is a
//! closed-class lexicon plus a handful of shape rules. A larger lexicon can be
//! layered on top from a file.

use once_cell::sync::Lazy;
use regex::Regex;
use sqlgen_core::{Error, Result};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Universal part-of-speech tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PosTag {
    Adj,
    Adp,
    Adv,
    Aux,
    Cconj,
    Det,
    Intj,
    Noun,
    Num,
    Part,
    Pron,
    Propn,
    Punct,
    Sconj,
    Sym,
    Verb,
    X,
}

impl PosTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            PosTag::Adj => "ADJ",
            PosTag::Adp => "ADP",
            PosTag::Adv => "ADV",
            PosTag::Aux => "AUX",
            PosTag::Cconj => "CCONJ",
            PosTag::Det => "DET",
            PosTag::Intj => "INTJ",
            PosTag::Noun => "NOUN",
            PosTag::Num => "NUM",
            PosTag::Part => "PART",
            PosTag::Pron => "PRON",
            PosTag::Propn => "PROPN",
            PosTag::Punct => "PUNCT",
            PosTag::Sconj => "SCONJ",
            PosTag::Sym => "SYM",
            PosTag::Verb => "VERB",
            PosTag::X => "X",
        }
    }
}

impl fmt::Display for PosTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PosTag {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ADJ" => Ok(PosTag::Adj),
            "ADP" => Ok(PosTag::Adp),
            "ADV" => Ok(PosTag::Adv),
            "AUX" => Ok(PosTag::Aux),
            "CCONJ" | "CONJ" => Ok(PosTag::Cconj),
            "DET" => Ok(PosTag::Det),
            "INTJ" => Ok(PosTag::Intj),
            "NOUN" => Ok(PosTag::Noun),
            "NUM" => Ok(PosTag::Num),
            "PART" => Ok(PosTag::Part),
            "PRON" => Ok(PosTag::Pron),
            "PROPN" => Ok(PosTag::Propn),
            "PUNCT" => Ok(PosTag::Punct),
            "SCONJ" => Ok(PosTag::Sconj),
            "SYM" => Ok(PosTag::Sym),
            "VERB" => Ok(PosTag::Verb),
            "X" => Ok(PosTag::X),
            other => Err(Error::model(format!("Unknown part-of-speech tag: {}", other))),
        }
    }
}

/// A token with its tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedToken {
    pub text: String,
    pub tag: PosTag,
}

impl TaggedToken {
    pub fn new(text: impl Into<String>, tag: PosTag) -> Self {
        Self {
            text: text.into(),
            tag,
        }
    }
}

/// Splits text into tokens and assigns each one a tag
pub trait PosTagger: Send + Sync {
    fn tag(&self, text: &str) -> Vec<TaggedToken>;
}

static TOKEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\d+(?:[.,]\d+)*\b|[\p{L}\p{N}_]+(?:-[\p{L}\p{N}_]+)*|['’][\p{L}]+|[^\s\p{L}\p{N}]",
    )
    .expect("token pattern is valid")
});

/// Split text into word, number, clitic and punctuation tokens
pub fn tokenize(text: &str) -> Vec<&str> {
    TOKEN_RE.find_iter(text).map(|m| m.as_str()).collect()
}

const CLOSED_CLASS: &[(PosTag, &[&str])] = &[
    (
        PosTag::Det,
        &[
            "a", "an", "the", "this", "that", "these", "those", "each", "every", "all", "any",
            "some", "no", "which", "what", "whatever", "another", "both", "either", "neither",
        ],
    ),
    (
        PosTag::Pron,
        &[
            "i", "me", "my", "mine", "you", "your", "yours", "he", "him", "his", "she", "her",
            "hers", "it", "its", "we", "us", "our", "ours", "they", "them", "their", "theirs",
            "who", "whom", "whose", "someone", "anyone", "everyone", "something", "anything",
            "everything", "nothing", "one", "ones", "themselves", "itself",
        ],
    ),
    (
        PosTag::Adp,
        &[
            "of", "in", "on", "at", "by", "for", "with", "from", "to", "into", "onto", "per",
            "during", "between", "over", "under", "about", "after", "before", "since", "until",
            "without", "within", "across", "among", "through", "throughout", "against", "via",
            "above", "below", "like", "near", "upon", "except", "including",
        ],
    ),
    (PosTag::Cconj, &["and", "or", "but", "nor", "yet", "plus", "versus", "vs"]),
    (
        PosTag::Sconj,
        &["if", "than", "because", "while", "whether", "although", "though", "unless", "as"],
    ),
    (
        PosTag::Aux,
        &[
            "is", "are", "was", "were", "be", "been", "being", "am", "do", "does", "did",
            "have", "has", "had", "will", "would", "can", "could", "should", "may", "might",
            "must", "shall", "'s", "'re", "'ve", "'ll", "'d", "'m",
        ],
    ),
    (PosTag::Part, &["not", "n't", "'t"]),
    (
        PosTag::Adv,
        &[
            "how", "when", "where", "why", "there", "here", "then", "now", "ever", "never",
            "very", "also", "only", "just", "too", "again", "already", "still", "often",
            "always", "most", "least", "more", "less", "currently", "recently", "together",
            "ago", "yesterday", "today", "overall", "respectively",
        ],
    ),
    (
        PosTag::Adj,
        &[
            "top", "bottom", "highest", "lowest", "largest", "smallest", "biggest", "greatest",
            "best", "worst", "first", "last", "total", "average", "many", "much", "few",
            "fewer", "new", "old", "recent", "latest", "earliest", "longest", "shortest",
            "different", "distinct", "unique", "maximum", "minimum", "max", "min", "mean",
            "greater", "higher", "lower", "larger", "smaller", "popular", "active",
            "inactive", "available", "same", "other", "own", "such", "several", "whole",
            "current", "previous", "next", "monthly", "yearly", "daily", "weekly", "annual",
            "cumulative", "overdue",
        ],
    ),
    (
        PosTag::Verb,
        &[
            "show", "list", "give", "find", "get", "count", "return", "display", "tell",
            "rank", "sort", "compute", "calculate", "fetch", "retrieve", "select", "include",
            "exclude", "compare", "make", "made", "pay", "paid", "spend", "spent", "sell",
            "sold", "buy", "bought", "rent", "rented", "watch", "watched", "live", "lives",
            "belong", "belongs", "contain", "contains", "want", "need", "know", "see", "appear",
            "appears", "appeared", "starring", "ordered", "grouped", "sorted", "based", "took",
            "take", "taken", "placed", "returned", "joined", "use", "used", "work", "works",
        ],
    ),
    (PosTag::Intj, &["please", "hi", "hello", "thanks"]),
    (
        PosTag::Num,
        &[
            "zero", "one", "two", "three", "four", "five", "six", "seven", "eight", "nine",
            "ten", "eleven", "twelve", "thirteen", "fourteen", "fifteen", "sixteen",
            "seventeen", "eighteen", "nineteen", "twenty", "thirty", "forty", "fifty",
            "sixty", "seventy", "eighty", "ninety", "hundred", "thousand", "million",
            "billion", "dozen",
        ],
    ),
];

/// Lexicon-driven tagger
///
/// Lookup is case-insensitive. Words missing from the lexicon are tagged by
/// shape: numerals are NUM, punctuation is PUNCT, capitalised words after the
/// first token are PROPN, everything else is NOUN.
#[derive(Debug, Clone)]
pub struct LexiconTagger {
    lexicon: HashMap<String, PosTag>,
}

impl Default for LexiconTagger {
    fn default() -> Self {
        Self::new()
    }
}

impl LexiconTagger {
    /// Tagger with the built-in closed-class lexicon
    pub fn new() -> Self {
        let mut lexicon = HashMap::new();
        for (tag, words) in CLOSED_CLASS {
            for word in *words {
                // "one" is listed twice; the numeral reading wins
                lexicon.insert((*word).to_string(), *tag);
            }
        }
        Self { lexicon }
    }

    /// Built-in lexicon extended with entries from a `word<TAB>TAG` file
    ///
    /// Blank lines and lines starting with `#` are skipped. File entries
    /// override the built-in ones. Any read or parse failure is
    /// [`Error::Model`].
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::model(format!("Failed to read lexicon {}: {}", path.display(), e))
        })?;

        let mut tagger = Self::new();
        for (line_no, line) in contents.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (word, tag) = line.split_once('\t').ok_or_else(|| {
                Error::model(format!(
                    "{}:{}: expected word<TAB>TAG",
                    path.display(),
                    line_no + 1
                ))
            })?;
            let tag = tag.parse::<PosTag>().map_err(|e| {
                Error::model(format!("{}:{}: {}", path.display(), line_no + 1, e))
            })?;
            tagger.lexicon.insert(word.trim().to_lowercase(), tag);
        }

        tracing::debug!(
            path = %path.display(),
            entries = tagger.lexicon.len(),
            "Loaded tagger lexicon"
        );
        Ok(tagger)
    }

    /// Add or replace entries (builder style)
    pub fn with_entries<'a>(mut self, entries: impl IntoIterator<Item = (&'a str, PosTag)>) -> Self {
        for (word, tag) in entries {
            self.lexicon.insert(word.to_lowercase(), tag);
        }
        self
    }

    fn classify(&self, token: &str, position: usize) -> PosTag {
        let lower = token.to_lowercase();
        if let Some(tag) = self.lexicon.get(&lower) {
            return *tag;
        }

        let mut chars = token.chars();
        let Some(first) = chars.next() else {
            return PosTag::X;
        };

        if first.is_ascii_digit() {
            return PosTag::Num;
        }
        if !first.is_alphanumeric() && first != '_' {
            return match first {
                '$' | '%' | '+' | '=' | '<' | '>' | '#' | '€' | '£' | '*' => PosTag::Sym,
                _ => PosTag::Punct,
            };
        }
        if position > 0 && first.is_uppercase() {
            return PosTag::Propn;
        }
        PosTag::Noun
    }
}

impl PosTagger for LexiconTagger {
    fn tag(&self, text: &str) -> Vec<TaggedToken> {
        tokenize(text)
            .into_iter()
            .enumerate()
            .map(|(position, token)| TaggedToken::new(token, self.classify(token, position)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn tags(tagger: &LexiconTagger, text: &str) -> Vec<(String, PosTag)> {
        tagger
            .tag(text)
            .into_iter()
            .map(|t| (t.text, t.tag))
            .collect()
    }

    #[test]
    fn test_tokenize() {
        assert_eq!(
            tokenize("Top 5 movies, by customer's rentals?"),
            vec!["Top", "5", "movies", ",", "by", "customer", "'s", "rentals", "?"]
        );
        assert_eq!(tokenize("revenue in 2005 was 3.5%"), vec!["revenue", "in", "2005", "was", "3.5", "%"]);
        assert_eq!(tokenize("year-over-year 5th"), vec!["year-over-year", "5th"]);
        assert!(tokenize("   ").is_empty());
    }

    #[test]
    fn test_tag_rental_question() {
        let tagger = LexiconTagger::new();
        let tagged = tags(&tagger, "Top 5 movies by number of rentals");
        assert_eq!(
            tagged,
            vec![
                ("Top".to_string(), PosTag::Adj),
                ("5".to_string(), PosTag::Num),
                ("movies".to_string(), PosTag::Noun),
                ("by".to_string(), PosTag::Adp),
                ("number".to_string(), PosTag::Noun),
                ("of".to_string(), PosTag::Adp),
                ("rentals".to_string(), PosTag::Noun),
            ]
        );
    }

    #[test]
    fn test_capitalised_words_are_proper_nouns() {
        let tagger = LexiconTagger::new();
        let tagged = tags(&tagger, "Customers living in Canada");
        assert_eq!(tagged[0].1, PosTag::Noun);
        assert_eq!(tagged[3], ("Canada".to_string(), PosTag::Propn));
    }

    #[test]
    fn test_number_words_and_symbols() {
        let tagger = LexiconTagger::new();
        let tagged = tags(&tagger, "show ten payments over $ 5");
        assert_eq!(tagged[1].1, PosTag::Num);
        assert_eq!(tagged[4].1, PosTag::Sym);
        assert_eq!(tagged[5].1, PosTag::Num);
    }

    #[test]
    fn test_lexicon_file_overrides_builtin() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# extra entries").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "top\tNOUN").unwrap();
        writeln!(file, "Starring\tverb").unwrap();

        let tagger = LexiconTagger::from_file(file.path()).unwrap();
        let tagged = tags(&tagger, "top films starring Penelope");
        assert_eq!(tagged[0].1, PosTag::Noun);
        assert_eq!(tagged[2].1, PosTag::Verb);
        assert_eq!(tagged[3].1, PosTag::Propn);
    }

    #[test]
    fn test_bad_lexicon_is_model_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "film\tTHING").unwrap();
        let err = LexiconTagger::from_file(file.path()).unwrap_err();
        assert!(matches!(err, Error::Model(_)));
        assert!(err.to_string().contains(":1:"));

        let err = LexiconTagger::from_file(Path::new("/nonexistent/lexicon.tsv")).unwrap_err();
        assert!(matches!(err, Error::Model(_)));
    }

    #[test]
    fn test_tag_round_trips_through_str() {
        for tag in [PosTag::Noun, PosTag::Propn, PosTag::Num, PosTag::Cconj] {
            assert_eq!(tag.as_str().parse::<PosTag>().unwrap(), tag);
        }
    }
}
