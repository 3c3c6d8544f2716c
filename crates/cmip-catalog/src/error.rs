//! Error types for catalog lookups.

use thiserror::Error;

/// Errors raised when parsing catalog identifiers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// Unknown model name.
    #[error("unknown model '{0}'")]
    UnknownModel(String),

    /// Unknown variable name.
    #[error("unknown variable '{0}'")]
    UnknownVariable(String),

    /// Month outside 1..=12.
    #[error("invalid month {0}")]
    InvalidMonth(u32),
}

/// Result type for catalog operations.
pub type Result<T> = std::result::Result<T, CatalogError>;
