//! Error types for the haul_data crate

use thiserror::Error;

/// Custom error types for the haul_data crate
#[derive(Debug, Error)]
pub enum DataError {
    /// Error related to parsing sheet contents
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Error related to data validation
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Error from IO operations
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error from CSV decoding
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, DataError>;
