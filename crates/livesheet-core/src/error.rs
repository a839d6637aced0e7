//! Error types for livesheet-core

use thiserror::Error;

/// Result type alias using [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by local validation. None of these are ever retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Malformed cell or range address
    #[error("Invalid cell address: {0}")]
    InvalidAddress(String),

    /// Section configuration or data that cannot be written
    #[error("Invalid section: {0}")]
    InvalidSection(String),

    /// Malformed merge column range
    #[error("Invalid merge spec: {0}")]
    InvalidMerge(String),

    /// Malformed document location
    #[error("Invalid document location: {0}")]
    InvalidLocation(String),
}
