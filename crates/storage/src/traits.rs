//! Storage trait definitions.

use crate::error::StorageResult;
use async_trait::async_trait;
use bytes::Bytes;

/// Byte store holding raw file contents at a key.
///
/// Keys are `/`-separated relative paths. Implementations must make
/// [`ByteStore::create`] exclusive: two concurrent creators of the same key
/// never both succeed.
#[async_trait]
pub trait ByteStore: Send + Sync + 'static {
    /// Check if an object exists.
    async fn exists(&self, key: &str) -> StorageResult<bool>;

    /// Get an object's metadata without fetching content.
    async fn head(&self, key: &str) -> StorageResult<ObjectMeta>;

    /// Get an object's content.
    async fn get(&self, key: &str) -> StorageResult<Bytes>;

    /// Create a new object and open it for writing.
    ///
    /// The key becomes visible immediately. Fails with
    /// [`StorageError::AlreadyExists`](crate::StorageError::AlreadyExists)
    /// if the key is taken.
    async fn create(&self, key: &str) -> StorageResult<Box<dyn FileWriter>>;

    /// Remove an object. Fails with `NotFound` if it does not exist.
    async fn remove(&self, key: &str) -> StorageResult<()>;

    /// List object keys with a prefix.
    async fn list(&self, prefix: &str) -> StorageResult<Vec<String>>;

    /// Get the name of this storage backend.
    ///
    /// Used for logging.
    fn backend_name(&self) -> &'static str;

    /// Verify storage backend connectivity.
    ///
    /// The default implementation returns Ok(()), suitable for backends that
    /// don't require connectivity verification.
    async fn health_check(&self) -> StorageResult<()> {
        Ok(())
    }
}

/// Metadata about a stored object.
#[derive(Clone, Debug)]
pub struct ObjectMeta {
    /// Object size in bytes.
    pub size: u64,
    /// Last modification time (if available).
    pub last_modified: Option<std::time::SystemTime>,
}

/// Writable handle on a freshly created object.
///
/// Bytes written are part of the object even if [`FileWriter::finish`] is
/// never called; dropping a writer does not remove the object.
#[async_trait]
pub trait FileWriter: Send {
    /// Write a chunk of data.
    async fn write(&mut self, data: Bytes) -> StorageResult<()>;

    /// Flush to durable storage and return the total bytes written.
    async fn finish(self: Box<Self>) -> StorageResult<u64>;
}
