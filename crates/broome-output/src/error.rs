//! Error types for input and output operations.

use thiserror::Error;

/// Result type for output operations.
pub type Result<T> = std::result::Result<T, OutputError>;

/// Errors that can occur while reading event files or writing results.
#[derive(Debug, Error)]
pub enum OutputError {
    /// CSV serialization error.
    #[error("CSV serialization error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization error.
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Polars error.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialized output was not valid UTF-8.
    #[error("Encoding error: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),

    /// A required column is absent from the event file.
    #[error("Missing column: {0}")]
    MissingColumn(String),

}

/// Why a row of the event file cannot be studied.
///
/// Rows are rejected one at a time; the rest of the file is still processed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    /// A required cell is empty.
    #[error("Missing {column} in row {row}")]
    MissingValue {
        /// Column name
        column: String,
        /// Zero-based row of the event file
        row: usize,
    },

    /// An event date could not be parsed.
    #[error("Invalid date {value:?} in row {row}")]
    InvalidDate {
        /// Zero-based row of the event file
        row: usize,
        /// Raw cell content
        value: String,
    },
}
