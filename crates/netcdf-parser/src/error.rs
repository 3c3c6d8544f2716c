//! Error types for archive decoding.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for archive decoding.
pub type NetCdfResult<T> = Result<T, NetCdfError>;

/// Errors raised while decoding an archive.
///
/// All variants except `Io` indicate that an archive does not have the
/// structure the catalog promised; they are not worth retrying.
#[derive(Error, Debug)]
pub enum NetCdfError {
    /// The archive could not be opened as NetCDF.
    #[error("failed to open {path}: {message}")]
    Open { path: PathBuf, message: String },

    /// The named variable is absent.
    #[error("field '{field}' not found in {path}")]
    FieldNotFound { path: PathBuf, field: String },

    /// The variable is neither `(lat, lon)` nor `(time, lat, lon)`.
    #[error("field '{field}' in {path} has unexpected dimensions {dims:?}")]
    UnexpectedDimensionality {
        path: PathBuf,
        field: String,
        dims: Vec<usize>,
    },

    /// Reading values failed.
    #[error("failed to read '{field}' from {path}: {message}")]
    Read {
        path: PathBuf,
        field: String,
        message: String,
    },

    /// File I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl NetCdfError {
    /// Whether the error points at a malformed or unexpected archive.
    pub fn is_format_error(&self) -> bool {
        !matches!(self, NetCdfError::Io(_))
    }
}
