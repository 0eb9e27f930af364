//! Upload error taxonomy.

use coffer_core::Checksum;
use coffer_metadata::MetadataError;
use coffer_storage::StorageError;
use thiserror::Error;

/// Kind of an upload failure, without its diagnostic context.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    UnsupportedDocumentType,
    InvalidRequest,
    PathConflict,
    StoreUnavailable,
    ChecksumMismatch,
    IoFailure,
    PersistFailure,
    RollbackFailure,
}

/// Why moving bytes from the request body into the byte store stopped.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("reading upload body: {0}")]
    Read(#[source] std::io::Error),

    #[error("writing to byte store: {0}")]
    Write(#[source] StorageError),

    #[error("upload cancelled")]
    Cancelled,

    #[error("upload deadline exceeded")]
    DeadlineExceeded,
}

/// A compensating action that did not complete.
#[derive(Debug, Error)]
pub enum RollbackError {
    #[error("removing written bytes: {0}")]
    Bytes(#[source] StorageError),

    #[error("deleting record {id}: {source}")]
    Record {
        id: String,
        #[source]
        source: MetadataError,
    },
}

/// Upload failure.
///
/// Every variant except [`UploadError::RollbackFailure`] is a primary error.
/// A rollback failure wraps the primary error that triggered the rollback,
/// which stays reachable through [`UploadError::primary`].
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("unsupported document type: {0:?}")]
    UnsupportedDocumentType(String),

    #[error("invalid upload request: {0}")]
    InvalidRequest(String),

    #[error("no free path for {name:?} in folder {folder_id} after {attempts} attempts")]
    PathConflict {
        folder_id: String,
        name: String,
        attempts: u32,
    },

    #[error("{store} store unavailable: {reason}")]
    StoreUnavailable { store: &'static str, reason: String },

    #[error("checksum mismatch for {path}: expected {expected}, computed {actual}")]
    ChecksumMismatch {
        path: String,
        expected: Checksum,
        actual: Checksum,
        bytes_written: u64,
    },

    #[error("transfer to {path} failed after {bytes_written} bytes: {source}")]
    IoFailure {
        path: String,
        bytes_written: u64,
        #[source]
        source: TransferError,
    },

    #[error("persisting record for {path} failed: {source}")]
    PersistFailure {
        path: String,
        #[source]
        source: MetadataError,
    },

    #[error("{primary}; rollback of {path} failed: {rollback}")]
    RollbackFailure {
        primary: Box<UploadError>,
        path: String,
        #[source]
        rollback: RollbackError,
    },
}

impl UploadError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnsupportedDocumentType(_) => ErrorKind::UnsupportedDocumentType,
            Self::InvalidRequest(_) => ErrorKind::InvalidRequest,
            Self::PathConflict { .. } => ErrorKind::PathConflict,
            Self::StoreUnavailable { .. } => ErrorKind::StoreUnavailable,
            Self::ChecksumMismatch { .. } => ErrorKind::ChecksumMismatch,
            Self::IoFailure { .. } => ErrorKind::IoFailure,
            Self::PersistFailure { .. } => ErrorKind::PersistFailure,
            Self::RollbackFailure { .. } => ErrorKind::RollbackFailure,
        }
    }

    /// The error that made the upload fail.
    ///
    /// For a rollback failure this is the error that triggered the rollback.
    pub fn primary(&self) -> &UploadError {
        match self {
            Self::RollbackFailure { primary, .. } => primary,
            other => other,
        }
    }

    /// Path of bytes left behind by a failed rollback, needing out-of-band cleanup.
    pub fn orphaned_path(&self) -> Option<&str> {
        match self {
            Self::RollbackFailure { path, .. } => Some(path),
            _ => None,
        }
    }

    pub(crate) fn byte_store(err: StorageError) -> Self {
        match err {
            StorageError::InvalidKey(reason) => Self::InvalidRequest(reason),
            other => Self::StoreUnavailable {
                store: "byte",
                reason: other.to_string(),
            },
        }
    }
}

/// Result type for upload operations.
pub type UploadResult<T> = std::result::Result<T, UploadError>;
