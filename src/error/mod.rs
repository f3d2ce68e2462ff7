//! Error handling for the episode pipeline.
//!
//! Per-record data problems are never errors here: they are counted and
//! excluded by the builders. This type covers the failures that stop a stage,
//! such as unreadable tables, bad configuration and worker failures.

use std::io;
use std::path::PathBuf;

use arrow_schema::ArrowError;
use parquet::errors::ParquetError;

/// Specialized error type for the episode pipeline
#[derive(Debug, thiserror::Error)]
pub enum NhError {
    /// Error opening, reading or writing a file
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Error processing Arrow data
    #[error("Arrow error: {0}")]
    Arrow(#[from] ArrowError),

    /// Error processing Parquet data
    #[error("Parquet error: {0}")]
    Parquet(#[from] ParquetError),

    /// Error reading or writing JSON documents
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Error converting between row structs and record batches
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_arrow::Error),

    /// A required column is absent from an input table
    #[error("Column not found: {column}")]
    ColumnNotFound { column: String },

    /// A column exists but holds the wrong Arrow type
    #[error("Invalid data type for column {column}, expected {expected}")]
    InvalidDataType { column: String, expected: String },

    /// Invalid study configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Two drug-observable episodes of one NH episode touch or overlap
    #[error("Merge defect for beneficiary {bene_id}, NH episode {episode_id}: {detail}")]
    MergeDefect {
        bene_id: String,
        episode_id: u32,
        detail: String,
    },

    /// A day-level worker failed
    #[error("Worker {partition_index} of run {run_id} failed: {message}")]
    Worker {
        run_id: String,
        partition_index: usize,
        message: String,
    },
}

impl NhError {
    /// Wrap an IO error with the path it concerns
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Shorthand for a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, NhError>;
