use std::collections::HashMap;
use std::io::BufRead;
use std::path::Path;

use thiserror::Error;
use tracing::info;

use super::SemanticSimilarity;
use crate::error::ReferenceError;

/// Word embeddings from a GloVe/word2vec text file: `word v1 v2 ... vn` per
/// line. A word2vec `count dim` header line is skipped.
#[derive(Debug, Default)]
pub struct WordVectors {
    dim: usize,
    vectors: HashMap<String, Vec<f32>>,
}

impl WordVectors {
    pub fn load(path: &Path) -> Result<Self, ReferenceError> {
        let read_err = |source| ReferenceError::Read {
            path: path.to_path_buf(),
            source,
        };
        let file = std::fs::File::open(path).map_err(read_err)?;
        let vectors = WordVectors::from_reader(std::io::BufReader::new(file)).map_err(|e| match e {
            VectorsError::Io(source) => read_err(source),
            VectorsError::Line { line, reason } => ReferenceError::Vectors {
                path: path.to_path_buf(),
                line,
                reason,
            },
        })?;
        info!(words = vectors.len(), dim = vectors.dim, "Loaded word vectors");
        Ok(vectors)
    }

    fn from_reader<R: BufRead>(reader: R) -> Result<Self, VectorsError> {
        let mut out = WordVectors::default();
        for (idx, line) in reader.lines().enumerate() {
            let line = line.map_err(VectorsError::Io)?;
            let mut parts = line.split_whitespace();
            let Some(word) = parts.next() else {
                continue;
            };
            let values = parts
                .map(str::parse::<f32>)
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| VectorsError::Line {
                    line: idx + 1,
                    reason: e.to_string(),
                })?;
            if idx == 0 && values.len() == 1 && word.parse::<usize>().is_ok() {
                continue;
            }
            if out.dim == 0 {
                out.dim = values.len();
            }
            if values.len() != out.dim || out.dim == 0 {
                return Err(VectorsError::Line {
                    line: idx + 1,
                    reason: format!("expected {} components, found {}", out.dim, values.len()),
                });
            }
            out.vectors.insert(word.to_lowercase(), values);
        }
        Ok(out)
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn get(&self, word: &str) -> Option<&[f32]> {
        self.vectors.get(&word.to_lowercase()).map(Vec::as_slice)
    }
}

#[derive(Debug, Error)]
enum VectorsError {
    #[error(transparent)]
    Io(std::io::Error),
    #[error("line {line}: {reason}")]
    Line { line: usize, reason: String },
}

impl SemanticSimilarity for WordVectors {
    fn similarity(&self, token: &str, term: &str) -> Option<f32> {
        let a = self.get(token)?;
        let Some(b) = self.get(term) else {
            return Some(0.0);
        };
        Some(cosine(a, b))
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

/// Normalized edit similarity between lower-cased words. Tokens without a
/// letter have no representation.
#[derive(Debug, Default, Clone, Copy)]
pub struct LexicalSimilarity;

impl SemanticSimilarity for LexicalSimilarity {
    fn similarity(&self, token: &str, term: &str) -> Option<f32> {
        if !token.chars().any(char::is_alphabetic) {
            return None;
        }
        Some(strsim::normalized_levenshtein(&token.to_lowercase(), &term.to_lowercase()) as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VECTORS: &str = "\
3 3
skills 1.0 0.0 0.0
abilities 0.9 0.1 0.0
banana 0.0 0.0 1.0
";

    #[test]
    fn cosine_over_vectors() {
        let v = WordVectors::from_reader(VECTORS.as_bytes()).unwrap();
        assert_eq!(v.len(), 3);
        let s = v.similarity("Abilities", "skills").unwrap();
        assert!(s > 0.99 && s <= 1.0);
        assert_eq!(v.similarity("banana", "skills"), Some(0.0));
        assert_eq!(v.similarity("unknown", "skills"), None);
        assert_eq!(v.similarity("banana", "unknown"), Some(0.0));
    }

    #[test]
    fn ragged_rows_rejected() {
        let bad = "skills 1.0 0.0\nbanana 0.5\n";
        match WordVectors::from_reader(bad.as_bytes()) {
            Err(e @ VectorsError::Line { line: 2, .. }) => {
                assert_eq!(e.to_string(), "line 2: expected 2 components, found 1")
            }
            _ => panic!("expected a line error"),
        }
    }

    #[test]
    fn lexical_fallback() {
        let s = LexicalSimilarity;
        assert!(s.similarity("Skill", "skills").unwrap() >= 0.75);
        assert!(s.similarity("experienced", "experience").unwrap() >= 0.75);
        assert!(s.similarity("banana", "skills").unwrap() < 0.75);
        assert_eq!(s.similarity("42", "skills"), None);
    }
}
