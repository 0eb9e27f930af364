//! Byte store abstraction and backends for coffer.
//!
//! This crate provides:
//! - The byte store contract (exclusive create, remove, existence checks)
//! - Streaming writers for file contents
//! - Backends: local filesystem and in-memory

pub mod backends;
pub mod error;
pub mod traits;

pub use backends::{filesystem::FilesystemBackend, memory::MemoryBackend};
pub use error::{StorageError, StorageResult};
pub use traits::{ByteStore, FileWriter, ObjectMeta};

use coffer_core::config::StorageConfig;
use std::sync::Arc;

/// Create a byte store from configuration.
pub async fn from_config(config: &StorageConfig) -> StorageResult<Arc<dyn ByteStore>> {
    match config {
        StorageConfig::Filesystem { path } => {
            let backend = FilesystemBackend::new(path).await?;
            Ok(Arc::new(backend))
        }
        StorageConfig::Memory => {
            tracing::warn!("Using in-memory byte store; file contents will not survive restart");
            Ok(Arc::new(MemoryBackend::new()))
        }
    }
}
