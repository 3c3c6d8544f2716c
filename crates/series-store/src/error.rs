//! Error types for the time-series store.

use thiserror::Error;

/// Errors that can occur while reading or writing series.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Failed to open an existing array.
    #[error("failed to open series: {0}")]
    OpenFailed(String),

    /// Failed to read data from an array.
    #[error("failed to read series data: {0}")]
    ReadFailed(String),

    /// Failed to create or write an array.
    #[error("failed to write series data: {0}")]
    WriteFailed(String),

    /// Buffer length does not match the declared dimensions.
    #[error("shape mismatch: expected {expected} values, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    /// A requested range exceeds the array dimensions.
    #[error("range {requested} is outside {dimension} of length {length}")]
    OutOfBounds {
        dimension: &'static str,
        requested: String,
        length: usize,
    },

    /// Batches did not arrive contiguously or did not cover the array.
    #[error("batch sequence error: {0}")]
    BatchSequence(String),

    /// Invalid metadata in the array.
    #[error("invalid series metadata: {0}")]
    InvalidMetadata(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// Filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Create an OpenFailed error.
    pub fn open_failed(msg: impl Into<String>) -> Self {
        Self::OpenFailed(msg.into())
    }

    /// Create a ReadFailed error.
    pub fn read_failed(msg: impl Into<String>) -> Self {
        Self::ReadFailed(msg.into())
    }

    /// Create a WriteFailed error.
    pub fn write_failed(msg: impl Into<String>) -> Self {
        Self::WriteFailed(msg.into())
    }

    /// Create an InvalidMetadata error.
    pub fn invalid_metadata(msg: impl Into<String>) -> Self {
        Self::InvalidMetadata(msg.into())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidMetadata(err.to_string())
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
