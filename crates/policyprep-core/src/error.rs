// crates/policyprep-core/src/error.rs

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("file not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    #[error("no files starting with '{prefix}' in {}", dir.display())]
    NoMatchingFiles { dir: PathBuf, prefix: String },

    #[error("malformed CSV in {}: {message}", path.display())]
    MalformedCsv { path: PathBuf, message: String },

    #[error("column '{column}' row {row}: cannot parse '{value}' as {expected}")]
    InvalidValue {
        column: &'static str,
        row: usize,
        value: String,
        expected: &'static str,
    },

    #[error("column '{column}' row {row}: value is missing")]
    MissingValue { column: &'static str, row: usize },

    #[error("expected column '{column}' is absent")]
    Schema { column: String },

    #[error("column '{column}' has type {found}, expected {expected}")]
    ColumnType {
        column: &'static str,
        found: String,
        expected: &'static str,
    },

    #[error("{origin} has no '{key}' join column")]
    JoinKey { origin: String, key: &'static str },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Polars operation failed: {0}")]
    Polars(#[from] polars::error::PolarsError),
}

impl PipelineError {
    /// Broad category the error belongs to, used in log lines and exit reporting.
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::FileNotFound { .. } | PipelineError::NoMatchingFiles { .. } => {
                ErrorKind::FileNotFound
            }
            PipelineError::MalformedCsv { .. }
            | PipelineError::InvalidValue { .. }
            | PipelineError::MissingValue { .. } => ErrorKind::Parse,
            PipelineError::Schema { .. } | PipelineError::ColumnType { .. } => ErrorKind::Schema,
            PipelineError::JoinKey { .. } => ErrorKind::JoinKey,
            PipelineError::Config(_) => ErrorKind::Config,
            PipelineError::Io(_) | PipelineError::Polars(_) => ErrorKind::Internal,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    FileNotFound,
    Parse,
    Schema,
    JoinKey,
    Config,
    Internal,
}

pub type Result<T> = std::result::Result<T, PipelineError>;
