//! Document store abstraction and implementations for coffer.
//!
//! File records live here, apart from the bytes they describe:
//! - The document store contract with store-assigned revisions
//! - SQLite and in-memory implementations

pub mod error;
pub mod memory;
pub mod store;

pub use error::{MetadataError, MetadataResult};
pub use memory::MemoryStore;
pub use store::{DocumentStore, SqliteStore, StoredDoc, first_rev, new_doc_id};

use coffer_core::config::MetadataConfig;
use std::sync::Arc;

/// Create a document store from configuration.
pub async fn from_config(config: &MetadataConfig) -> MetadataResult<Arc<dyn DocumentStore>> {
    match config {
        MetadataConfig::Sqlite {
            path,
            busy_timeout_secs,
        } => {
            let store = SqliteStore::new(path, *busy_timeout_secs).await?;
            Ok(Arc::new(store) as Arc<dyn DocumentStore>)
        }
        MetadataConfig::Memory => {
            tracing::warn!("Using in-memory document store; records will not survive restart");
            Ok(Arc::new(MemoryStore::new()) as Arc<dyn DocumentStore>)
        }
    }
}
