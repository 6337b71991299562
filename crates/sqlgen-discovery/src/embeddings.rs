//! Static word-embedding spaces
//!
//! An [`EmbeddingSpace`] is an immutable vocabulary of unit-length vectors read
//! from a GloVe or word2vec text file. Nearest neighbours are found by brute
//! force over the whole vocabulary.

use sqlgen_core::{Error, Result};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

#[derive(Debug, Clone)]
pub struct EmbeddingSpace {
    name: String,
    dimension: usize,
    words: Vec<String>,
    index: HashMap<String, usize>,
    /// Row-major, `words.len() * dimension`
    vectors: Vec<f32>,
}

fn is_word2vec_header(line: &str) -> bool {
    let fields: Vec<&str> = line.split_whitespace().collect();
    fields.len() == 2 && fields.iter().all(|f| f.parse::<usize>().is_ok())
}

impl EmbeddingSpace {
    /// Build a space from in-memory vectors
    ///
    /// Every vector must have the same non-zero length. Later duplicates of a
    /// word are ignored.
    pub fn from_vectors<I, S>(name: impl Into<String>, entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, Vec<f32>)>,
        S: Into<String>,
    {
        let name = name.into();
        let mut space = Self {
            name,
            dimension: 0,
            words: Vec::new(),
            index: HashMap::new(),
            vectors: Vec::new(),
        };

        for (word, vector) in entries {
            space.push(word.into(), vector)?;
        }

        if space.words.is_empty() {
            return Err(Error::model(format!(
                "Embedding space '{}' has no vectors",
                space.name
            )));
        }
        Ok(space)
    }

    /// Read a GloVe (`word v1 v2 ...`) or word2vec text file
    ///
    /// A leading word2vec `count dimension` header line is skipped.
    pub fn load(name: impl Into<String>, path: &Path) -> Result<Self> {
        let name = name.into();
        let started = std::time::Instant::now();
        let file = File::open(path).map_err(|e| {
            Error::model(format!(
                "Failed to read embedding space '{}' from {}: {}",
                name,
                path.display(),
                e
            ))
        })?;

        let space = Self::read(name, BufReader::new(file))?;

        tracing::info!(
            model = %space.name,
            words = space.len(),
            dimension = space.dimension,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Loaded embedding space"
        );
        Ok(space)
    }

    /// Parse vectors line by line from any buffered reader
    pub fn read(name: impl Into<String>, reader: impl BufRead) -> Result<Self> {
        let mut space = Self {
            name: name.into(),
            dimension: 0,
            words: Vec::new(),
            index: HashMap::new(),
            vectors: Vec::new(),
        };

        for (line_no, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| {
                Error::model(format!("{}: line {}: {}", space.name, line_no + 1, e))
            })?;
            if line_no == 0 && is_word2vec_header(&line) {
                continue;
            }
            let mut fields = line.split_whitespace();
            let Some(word) = fields.next() else {
                continue;
            };

            let vector = fields
                .map(str::parse::<f32>)
                .collect::<std::result::Result<Vec<f32>, _>>()
                .map_err(|e| {
                    Error::model(format!("line {}: bad vector component: {}", line_no + 1, e))
                })?;
            space.push(word.to_string(), vector)?;
        }

        if space.words.is_empty() {
            return Err(Error::model(format!(
                "Embedding space '{}' has no vectors",
                space.name
            )));
        }
        space.vectors.shrink_to_fit();
        Ok(space)
    }

    fn push(&mut self, word: String, mut vector: Vec<f32>) -> Result<()> {
        if vector.is_empty() {
            return Err(Error::model(format!("Empty vector for '{}'", word)));
        }
        if self.dimension == 0 {
            self.dimension = vector.len();
        } else if vector.len() != self.dimension {
            return Err(Error::model(format!(
                "Vector for '{}' has {} components, expected {}",
                word,
                vector.len(),
                self.dimension
            )));
        }
        if self.index.contains_key(&word) {
            return Ok(());
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|v| *v /= norm);
        }

        self.index.insert(word.clone(), self.words.len());
        self.words.push(word);
        self.vectors.extend(vector);
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Exact match first, then the lowercased word (GloVe vocabularies are lowercase)
    fn lookup(&self, word: &str) -> Option<usize> {
        self.index
            .get(word)
            .or_else(|| self.index.get(&word.to_lowercase()))
            .copied()
    }

    pub fn contains(&self, word: &str) -> bool {
        self.lookup(word).is_some()
    }

    fn row(&self, i: usize) -> &[f32] {
        &self.vectors[i * self.dimension..(i + 1) * self.dimension]
    }

    /// Cosine similarity of two words, if both are known
    pub fn similarity(&self, a: &str, b: &str) -> Option<f32> {
        let (a, b) = (self.lookup(a)?, self.lookup(b)?);
        Some(dot(self.row(a), self.row(b)))
    }

    /// The `topn` nearest words by cosine similarity, most similar first
    ///
    /// The word itself is excluded. Unknown words have no neighbours.
    pub fn most_similar(&self, word: &str, topn: usize) -> Vec<(String, f32)> {
        let Some(target) = self.lookup(word) else {
            return Vec::new();
        };
        if topn == 0 {
            return Vec::new();
        }

        let query = self.row(target);
        let mut scored: Vec<(usize, f32)> = (0..self.words.len())
            .filter(|&i| i != target)
            .map(|i| (i, dot(query, self.row(i))))
            .collect();

        let by_score = |a: &(usize, f32), b: &(usize, f32)| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0));
        if scored.len() > topn {
            scored.select_nth_unstable_by(topn - 1, by_score);
            scored.truncate(topn);
        }
        scored.sort_by(by_score);

        scored
            .into_iter()
            .map(|(i, score)| (self.words[i].clone(), score))
            .collect()
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}
