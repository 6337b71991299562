//! Fuzzy matching of keywords against table and column names

use sqlgen_core::{SchemaIndex, TableDescriptor};
use strsim::normalized_levenshtein;

/// Best similarity (0-100) between the shorter string and any window of the longer one
///
/// Both strings are case-folded one character at a time first, so a case
/// difference never changes the length being compared. The window is the length of the shorter
/// string and slides over every start position of the longer one, so windows
/// near the end are cut short. Each window is scored with normalized
/// Levenshtein similarity; the best score is rounded to a percentage. A
/// substring match scores 100. An empty string scores 0.
pub fn partial_ratio(a: &str, b: &str) -> u8 {
    let a = fold_case(a);
    let b = fold_case(b);
    if a.is_empty() || b.is_empty() {
        return 0;
    }

    let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    let needle: String = short.iter().collect();

    let mut best = 0.0f64;
    for start in 0..long.len() {
        let end = (start + short.len()).min(long.len());
        let window: String = long[start..end].iter().collect();
        let score = normalized_levenshtein(&needle, &window);
        if score > best {
            best = score;
            if best >= 1.0 {
                break;
            }
        }
    }

    (best * 100.0).round() as u8
}

// `str::to_lowercase` may expand a character ('İ' becomes "i\u{307}")
fn fold_case(s: &str) -> Vec<char> {
    s.chars()
        .map(|c| c.to_lowercase().next().unwrap_or(c))
        .collect()
}

/// Selects the tables of an index whose name or columns resemble a keyword
#[derive(Debug, Clone, Copy)]
pub struct FuzzyMatcher {
    similarity_threshold: u8,
}

impl Default for FuzzyMatcher {
    fn default() -> Self {
        Self {
            similarity_threshold: 90,
        }
    }
}

impl FuzzyMatcher {
    /// Matcher accepting scores strictly above `similarity_threshold`
    ///
    /// Scores never exceed 100, so a threshold of 100 or more matches nothing.
    pub fn new(similarity_threshold: u8) -> Self {
        Self {
            similarity_threshold,
        }
    }

    pub fn threshold(&self) -> u8 {
        self.similarity_threshold
    }

    fn is_match(&self, keyword: &str, candidate: &str) -> bool {
        partial_ratio(keyword, candidate) > self.similarity_threshold
    }

    /// True when any keyword matches the table name or any of its column names
    pub fn matches_table(&self, table: &TableDescriptor, keywords: &[String]) -> bool {
        keywords.iter().any(|keyword| {
            self.is_match(keyword, &table.name)
                || table.column_names().any(|column| self.is_match(keyword, column))
        })
    }

    /// Matching tables in index order
    pub fn match_tables<'a>(
        &self,
        index: &'a SchemaIndex,
        keywords: &[String],
    ) -> Vec<&'a TableDescriptor> {
        if keywords.is_empty() {
            return Vec::new();
        }
        index
            .tables
            .iter()
            .filter(|table| self.matches_table(table, keywords))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::sakila_index;

    fn keywords(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    fn names(tables: Vec<&TableDescriptor>) -> Vec<&str> {
        tables.into_iter().map(|t| t.name.as_str()).collect()
    }

    #[test]
    fn test_partial_ratio_basics() {
        assert_eq!(partial_ratio("film", "film"), 100);
        assert_eq!(partial_ratio("FILM", "film"), 100);
        assert_eq!(partial_ratio("film", "film_id"), 100);
        assert_eq!(partial_ratio("film_id", "film"), 100);
        assert_eq!(partial_ratio("rental", "rentals"), 100);
        assert_eq!(partial_ratio("", "film"), 0);
        assert_eq!(partial_ratio("film", ""), 0);
    }

    #[test]
    fn test_case_difference_keeps_full_score() {
        assert_eq!(partial_ratio("İstanbul", "istanbul"), 100);
        assert_eq!(partial_ratio("STRASSE", "strasse"), 100);
        assert_eq!(partial_ratio("Ärzte", "ärzte_id"), 100);
    }

    #[test]
    fn test_partial_ratio_degrades_with_edits() {
        let one_edit = partial_ratio("rentel", "rental");
        let two_edits = partial_ratio("rentxx", "rental");
        assert_eq!(one_edit, 83);
        assert!(two_edits < one_edit);
        assert!(partial_ratio("invoice", "customer") < 50);
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let index = crate::testing::single_table_index("shop", "rentals");
        let rental = keywords(&["rental"]);

        assert!(FuzzyMatcher::new(100).match_tables(&index, &rental).is_empty());
        assert_eq!(names(FuzzyMatcher::new(99).match_tables(&index, &rental)), vec!["rentals"]);
    }

    #[test]
    fn test_exact_table_name_matches_below_100() {
        let index = sakila_index();
        for threshold in 0..100u8 {
            let matched = FuzzyMatcher::new(threshold).match_tables(&index, &keywords(&["customer"]));
            assert!(
                matched.iter().any(|t| t.name == "customer"),
                "threshold {}",
                threshold
            );
        }
    }

    #[test]
    fn test_column_names_match() {
        let index = sakila_index();
        let matched = FuzzyMatcher::default().match_tables(&index, &keywords(&["email"]));
        assert_eq!(names(matched), vec!["customer"]);
    }

    #[test]
    fn test_tables_keep_index_order() {
        let index = sakila_index();
        let matched = FuzzyMatcher::default().match_tables(&index, &keywords(&["rental", "film"]));
        assert_eq!(names(matched), vec!["film", "rental"]);
    }

    #[test]
    fn test_no_keywords_match_nothing() {
        let index = sakila_index();
        assert!(FuzzyMatcher::new(0).match_tables(&index, &[]).is_empty());
    }
}
