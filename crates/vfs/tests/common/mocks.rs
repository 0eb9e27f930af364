use async_trait::async_trait;
use bytes::Bytes;
use coffer_core::Persistable;
use coffer_metadata::{DocumentStore, MetadataError, MetadataResult, StoredDoc};
use coffer_storage::{ByteStore, FileWriter, ObjectMeta, StorageError, StorageResult};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::time::Duration;

/// Byte store wrapper that counts calls and injects failures.
#[allow(dead_code)]
pub struct InstrumentedByteStore {
    inner: Arc<dyn ByteStore>,
    pub exists_calls: AtomicUsize,
    pub create_calls: AtomicUsize,
    pub remove_calls: AtomicUsize,
    /// Report every key as free, as if another upload created it between
    /// the existence check and the create.
    stale_exists: AtomicBool,
    fail_exists: AtomicBool,
    fail_remove: AtomicBool,
}

#[allow(dead_code)]
impl InstrumentedByteStore {
    pub fn new(inner: Arc<dyn ByteStore>) -> Self {
        Self {
            inner,
            exists_calls: AtomicUsize::new(0),
            create_calls: AtomicUsize::new(0),
            remove_calls: AtomicUsize::new(0),
            stale_exists: AtomicBool::new(false),
            fail_exists: AtomicBool::new(false),
            fail_remove: AtomicBool::new(false),
        }
    }

    pub fn set_stale_exists(&self, on: bool) {
        self.stale_exists.store(on, Ordering::SeqCst);
    }

    pub fn set_fail_exists(&self, on: bool) {
        self.fail_exists.store(on, Ordering::SeqCst);
    }

    pub fn set_fail_remove(&self, on: bool) {
        self.fail_remove.store(on, Ordering::SeqCst);
    }

    pub fn total_calls(&self) -> usize {
        self.exists_calls.load(Ordering::SeqCst)
            + self.create_calls.load(Ordering::SeqCst)
            + self.remove_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ByteStore for InstrumentedByteStore {
    async fn exists(&self, key: &str) -> StorageResult<bool> {
        self.exists_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_exists.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("injected exists failure".to_string()));
        }
        if self.stale_exists.load(Ordering::SeqCst) {
            return Ok(false);
        }
        self.inner.exists(key).await
    }

    async fn head(&self, key: &str) -> StorageResult<ObjectMeta> {
        self.inner.head(key).await
    }

    async fn get(&self, key: &str) -> StorageResult<Bytes> {
        self.inner.get(key).await
    }

    async fn create(&self, key: &str) -> StorageResult<Box<dyn FileWriter>> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.create(key).await
    }

    async fn remove(&self, key: &str) -> StorageResult<()> {
        self.remove_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_remove.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("injected remove failure".to_string()));
        }
        self.inner.remove(key).await
    }

    async fn list(&self, prefix: &str) -> StorageResult<Vec<String>> {
        self.inner.list(prefix).await
    }

    fn backend_name(&self) -> &'static str {
        "instrumented"
    }
}

/// How an injected document create failure behaves.
#[allow(dead_code)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CreateFailure {
    /// Fail without storing anything.
    Reject,
    /// Store the record, then report an error as if the response was lost.
    StoreThenFail,
    /// Sleep before storing, so a deadline can expire first.
    Slow(Duration),
}

/// Document store wrapper that counts calls and injects failures.
#[allow(dead_code)]
pub struct InstrumentedDocumentStore {
    inner: Arc<dyn DocumentStore>,
    pub create_calls: AtomicUsize,
    pub delete_calls: AtomicUsize,
    create_failure: std::sync::Mutex<Option<CreateFailure>>,
    fail_delete: AtomicBool,
}

#[allow(dead_code)]
impl InstrumentedDocumentStore {
    pub fn new(inner: Arc<dyn DocumentStore>) -> Self {
        Self {
            inner,
            create_calls: AtomicUsize::new(0),
            delete_calls: AtomicUsize::new(0),
            create_failure: std::sync::Mutex::new(None),
            fail_delete: AtomicBool::new(false),
        }
    }

    pub fn set_create_failure(&self, failure: Option<CreateFailure>) {
        *self.create_failure.lock().unwrap() = failure;
    }

    pub fn set_fail_delete(&self, on: bool) {
        self.fail_delete.store(on, Ordering::SeqCst);
    }

    pub fn total_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst) + self.delete_calls.load(Ordering::SeqCst)
    }

    pub async fn count(&self, doc_type: &str) -> usize {
        self.inner.list_docs(doc_type).await.unwrap().len()
    }
}

#[async_trait]
impl DocumentStore for InstrumentedDocumentStore {
    async fn create_doc(&self, doc: &mut dyn Persistable) -> MetadataResult<()> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        let failure = *self.create_failure.lock().unwrap();
        match failure {
            None => self.inner.create_doc(doc).await,
            Some(CreateFailure::Reject) => Err(MetadataError::Unavailable(
                "injected create failure".to_string(),
            )),
            Some(CreateFailure::StoreThenFail) => {
                self.inner.create_doc(doc).await?;
                Err(MetadataError::Io(std::io::Error::new(
                    std::io::ErrorKind::ConnectionReset,
                    "injected lost response",
                )))
            }
            Some(CreateFailure::Slow(delay)) => {
                tokio::time::sleep(delay).await;
                self.inner.create_doc(doc).await
            }
        }
    }

    async fn delete_doc(&self, doc: &dyn Persistable) -> MetadataResult<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(MetadataError::Unavailable(
                "injected delete failure".to_string(),
            ));
        }
        self.inner.delete_doc(doc).await
    }

    async fn get_doc(&self, doc_type: &str, id: &str) -> MetadataResult<Option<StoredDoc>> {
        self.inner.get_doc(doc_type, id).await
    }

    async fn list_docs(&self, doc_type: &str) -> MetadataResult<Vec<StoredDoc>> {
        self.inner.list_docs(doc_type).await
    }
}
