//! Error types for the core domain.

use thiserror::Error;

/// Core domain error type.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid checksum: {0}")]
    InvalidHash(String),

    #[error("invalid file name: {0}")]
    InvalidName(String),

    #[error("invalid folder id: {0}")]
    InvalidFolder(String),

    #[error("unknown document type: {0}")]
    UnknownDocType(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
