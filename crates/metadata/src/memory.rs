//! In-memory document store.

use crate::error::{MetadataError, MetadataResult};
use crate::store::{DocumentStore, StoredDoc, prepare_create, require_id};
use async_trait::async_trait;
use coffer_core::Persistable;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

/// Document store keeping every document in process memory.
#[derive(Default)]
pub struct MemoryStore {
    docs: DashMap<(String, String), StoredDoc>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of documents across all types.
    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn create_doc(&self, doc: &mut dyn Persistable) -> MetadataResult<()> {
        let (id, rev, body) = prepare_create(doc)?;
        let doc_type = doc.doc_type();

        match self.docs.entry((doc_type.to_string(), id.clone())) {
            Entry::Occupied(_) => Err(MetadataError::Conflict(format!(
                "{doc_type} {id} already exists"
            ))),
            Entry::Vacant(slot) => {
                slot.insert(StoredDoc {
                    doc_type: doc_type.to_string(),
                    id,
                    rev: rev.clone(),
                    body,
                });
                doc.set_rev(rev);
                Ok(())
            }
        }
    }

    async fn delete_doc(&self, doc: &dyn Persistable) -> MetadataResult<()> {
        let id = require_id(doc)?;
        let key = (doc.doc_type().to_string(), id.to_string());

        match self.docs.entry(key) {
            Entry::Vacant(_) => Err(MetadataError::NotFound(format!(
                "{} {id}",
                doc.doc_type()
            ))),
            Entry::Occupied(existing) => {
                if let Some(rev) = doc.rev()
                    && rev != existing.get().rev
                {
                    return Err(MetadataError::Conflict(format!(
                        "{} {id} is at revision {}, not {rev}",
                        doc.doc_type(),
                        existing.get().rev
                    )));
                }
                existing.remove();
                Ok(())
            }
        }
    }

    async fn get_doc(&self, doc_type: &str, id: &str) -> MetadataResult<Option<StoredDoc>> {
        Ok(self
            .docs
            .get(&(doc_type.to_string(), id.to_string()))
            .map(|entry| entry.value().clone()))
    }

    async fn list_docs(&self, doc_type: &str) -> MetadataResult<Vec<StoredDoc>> {
        let mut docs: Vec<StoredDoc> = self
            .docs
            .iter()
            .filter(|entry| entry.key().0 == doc_type)
            .map(|entry| entry.value().clone())
            .collect();
        docs.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(docs)
    }
}
