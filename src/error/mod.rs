//! Error handling for the readmission pipeline.

pub mod util;

use std::io;

use arrow::error::ArrowError;
use parquet::errors::ParquetError;

use crate::algorithm::events::chunked::FoldState;

/// Errors raised by the pipeline stages
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Error opening, reading or writing a file
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Error processing Arrow data
    #[error("Arrow error: {0}")]
    Arrow(#[from] ArrowError),

    /// Error processing Parquet data
    #[error("Parquet error: {0}")]
    Parquet(#[from] ParquetError),

    /// Error reading or writing JSON configuration and summaries
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A rule table pattern failed to compile
    #[error("Pattern error: {0}")]
    Pattern(#[from] regex::Error),

    /// An expected column is absent or has an unusable type
    #[error("Schema error in {table}: {message}")]
    SchemaMismatch {
        /// Table or artifact the column was expected in
        table: String,
        /// What was wrong
        message: String,
    },

    /// A chunk of an event source could not be read or conformed.
    ///
    /// Carries everything folded before the failing chunk so the caller can
    /// checkpoint it and resume instead of starting over.
    #[error("Failed to read chunk {chunk_index} of {source_name}: {cause}")]
    ChunkFailed {
        /// Name of the event source
        source_name: String,
        /// Zero-based index of the failing chunk
        chunk_index: usize,
        /// Underlying failure
        #[source]
        cause: Box<PipelineError>,
        /// Fold state accumulated from the chunks before the failure
        partial: Box<FoldState>,
    },

    /// A blocking load task panicked or was cancelled
    #[error("Task error: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// Configuration values that cannot be used
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// A pipeline invariant does not hold on the produced data
    #[error("Validation error: {0}")]
    Validation(String),
}

impl PipelineError {
    /// Shorthand for a schema mismatch on `table`
    pub fn schema(table: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SchemaMismatch {
            table: table.into(),
            message: message.into(),
        }
    }
}

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;
