use std::path::PathBuf;

use thiserror::Error;

/// Startup failures while loading reference data. These are fatal: the
/// pipeline cannot run without its taxonomy and title list.
#[derive(Debug, Error)]
pub enum ReferenceError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse skill taxonomy {path}: {source}")]
    Taxonomy {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to parse salary histograms {path}: {source}")]
    Histograms {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("canonical title list {0} is empty")]
    EmptyTitles(PathBuf),
    #[error("word vector file {path} line {line}: {reason}")]
    Vectors {
        path: PathBuf,
        line: usize,
        reason: String,
    },
}

/// A single input document that could not be turned into a record.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("line {line}: invalid document json: {source}")]
    Decode {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("line {line}: document has no link")]
    MissingLink { line: usize },
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
    /// Rows for `keys` were deleted but the replacement insert failed, so
    /// the table is missing them until the batch is ingested again.
    #[error("deleted rows for {keys} keys but insert failed: {source}")]
    PartialUpsert {
        keys: usize,
        #[source]
        source: rusqlite::Error,
    },
}
