//! Error types for the ingestion crate.

use cmip_catalog::CatalogError;
use netcdf_parser::NetCdfError;
use series_store::StoreError;
use thiserror::Error;

/// Errors from fetching an archive off the mirrors.
#[derive(Error, Debug)]
pub enum FetchError {
    /// The mirror does not have the resource; the next mirror is tried.
    #[error("not found: {url}")]
    NotFound { url: String },

    /// Connection, timeout or body transfer failure.
    #[error("network error fetching {url}: {message}")]
    TransientNetwork { url: String, message: String },

    /// Any non-success status other than 404.
    #[error("server returned {status} for {url}")]
    Server { url: String, status: u16 },

    /// Every mirror answered not-found.
    #[error("{uri} not found on any of {attempts} mirrors")]
    FetchFailed { uri: String, attempts: usize },

    /// The HTTP client could not be built.
    #[error("invalid fetch configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FetchError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, FetchError::NotFound { .. })
    }
}

/// Errors that can occur while converting a task.
#[derive(Error, Debug)]
pub enum IngestionError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("failed to decode archive: {0}")]
    Decode(#[from] NetCdfError),

    #[error("series store error: {0}")]
    Store(#[from] StoreError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// Inputs of a derivation or stitch disagree in grid or time axis.
    #[error("input mismatch: {0}")]
    InputMismatch(String),

    /// Source time steps do not add up to the target series length.
    #[error("time axis mismatch: sources cover {actual} steps, expected {expected}")]
    TimeAxisMismatch { expected: usize, actual: usize },

    /// A model needs surface elevation but publishes none.
    #[error("no surface elevation available for {0}")]
    ElevationUnavailable(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A blocking conversion job panicked or was cancelled.
    #[error("conversion task failed to complete: {0}")]
    TaskPanicked(String),

    #[error("Failed to access file: {0}")]
    Io(#[from] std::io::Error),
}

impl From<tokio::task::JoinError> for IngestionError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::TaskPanicked(err.to_string())
    }
}

/// Result type for ingestion operations.
pub type Result<T> = std::result::Result<T, IngestionError>;
