use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ReforgeError>;

/// Everything that can abort a run
#[derive(Debug, Error)]
pub enum ReforgeError {
    #[error("input file not found: {}", path.display())]
    MissingFile { path: PathBuf },

    #[error("invalid JSON in {} at line {line}, column {column}: {source}", path.display())]
    MalformedJson {
        path: PathBuf,
        line: usize,
        column: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("expected {expected} at the document root, found {found}")]
    ShapeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("an output path is required for this rule")]
    MissingOutput,

    #[error("invalid lookup table: {0}")]
    InvalidTable(String),

    #[error("invalid job file {0}")]
    InvalidConfig(String),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize JSON: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl ReforgeError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ReforgeError::Io {
            path: path.into(),
            source,
        }
    }
}
