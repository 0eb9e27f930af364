//! In-memory storage backend.

use crate::error::{StorageError, StorageResult};
use crate::traits::{ByteStore, FileWriter, ObjectMeta};
use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;

/// Byte store keeping every object in process memory.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    objects: Arc<DashMap<String, Vec<u8>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    fn check_key(key: &str) -> StorageResult<()> {
        if key.is_empty()
            || key.starts_with('/')
            || key.split('/').any(|part| part.is_empty() || part == "." || part == "..")
        {
            return Err(StorageError::InvalidKey(format!(
                "not a normalized relative key: {key:?}"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl ByteStore for MemoryBackend {
    async fn exists(&self, key: &str) -> StorageResult<bool> {
        Self::check_key(key)?;
        Ok(self.objects.contains_key(key))
    }

    async fn head(&self, key: &str) -> StorageResult<ObjectMeta> {
        Self::check_key(key)?;
        let data = self
            .objects
            .get(key)
            .ok_or_else(|| StorageError::NotFound(key.to_string()))?;
        Ok(ObjectMeta {
            size: data.len() as u64,
            last_modified: None,
        })
    }

    async fn get(&self, key: &str) -> StorageResult<Bytes> {
        Self::check_key(key)?;
        self.objects
            .get(key)
            .map(|data| Bytes::copy_from_slice(&data))
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn create(&self, key: &str) -> StorageResult<Box<dyn FileWriter>> {
        Self::check_key(key)?;
        match self.objects.entry(key.to_string()) {
            Entry::Occupied(_) => Err(StorageError::AlreadyExists(key.to_string())),
            Entry::Vacant(slot) => {
                slot.insert(Vec::new());
                Ok(Box::new(MemoryWriter {
                    objects: self.objects.clone(),
                    key: key.to_string(),
                    bytes_written: 0,
                }))
            }
        }
    }

    async fn remove(&self, key: &str) -> StorageResult<()> {
        Self::check_key(key)?;
        self.objects
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn list(&self, prefix: &str) -> StorageResult<Vec<String>> {
        let dir_prefix = format!("{}/", prefix.trim_end_matches('/'));
        let mut keys: Vec<String> = self
            .objects
            .iter()
            .map(|entry| entry.key().clone())
            .filter(|key| prefix.is_empty() || key == prefix || key.starts_with(&dir_prefix))
            .collect();
        keys.sort();
        Ok(keys)
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

/// Writer appending directly into the shared object map.
struct MemoryWriter {
    objects: Arc<DashMap<String, Vec<u8>>>,
    key: String,
    bytes_written: u64,
}

#[async_trait]
impl FileWriter for MemoryWriter {
    async fn write(&mut self, data: Bytes) -> StorageResult<()> {
        let mut object = self.objects.get_mut(&self.key).ok_or_else(|| {
            StorageError::Io(std::io::Error::other(format!(
                "object removed while being written: {}",
                self.key
            )))
        })?;
        object.extend_from_slice(&data);
        self.bytes_written += data.len() as u64;
        Ok(())
    }

    async fn finish(self: Box<Self>) -> StorageResult<u64> {
        if !self.objects.contains_key(&self.key) {
            return Err(StorageError::NotFound(self.key.clone()));
        }
        Ok(self.bytes_written)
    }
}
