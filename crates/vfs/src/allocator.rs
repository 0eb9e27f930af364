//! Storage path allocation for new files.

use crate::error::{UploadError, UploadResult};
use coffer_core::candidate_path;
use coffer_storage::ByteStore;
use std::sync::Arc;

/// A storage path that was free when it was checked.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Allocation {
    pub path: String,
    /// Candidate index the path was derived from.
    pub attempt: u32,
}

/// Picks storage paths for new files that do not collide with existing bytes.
///
/// Allocation only plans: nothing is created or reserved. Another upload can
/// take the path before it is created, so the create step must be exclusive
/// and callers retry from the next candidate on collision.
pub struct PathAllocator {
    store: Arc<dyn ByteStore>,
    max_attempts: u32,
    /// Byte limit for the last path component of every candidate.
    max_name_len: usize,
}

impl PathAllocator {
    pub fn new(store: Arc<dyn ByteStore>, max_attempts: u32, max_name_len: usize) -> Self {
        Self {
            store,
            max_attempts: max_attempts.max(1),
            max_name_len,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// First free path for `name` inside `folder_id`.
    pub async fn allocate(&self, folder_id: &str, name: &str) -> UploadResult<Allocation> {
        self.allocate_from(folder_id, name, 0).await
    }

    /// First free path among candidates `first..max_attempts`.
    #[tracing::instrument(skip(self), fields(backend = self.store.backend_name()))]
    pub async fn allocate_from(
        &self,
        folder_id: &str,
        name: &str,
        first: u32,
    ) -> UploadResult<Allocation> {
        for attempt in first..self.max_attempts {
            let path = candidate_path(folder_id, name, attempt, self.max_name_len);
            if !self
                .store
                .exists(&path)
                .await
                .map_err(UploadError::byte_store)?
            {
                return Ok(Allocation { path, attempt });
            }
            tracing::debug!(path = %path, "Candidate path taken");
        }

        Err(UploadError::PathConflict {
            folder_id: folder_id.to_string(),
            name: name.to_string(),
            attempts: self.max_attempts,
        })
    }
}
