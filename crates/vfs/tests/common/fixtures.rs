use bytes::Bytes;
use coffer_core::config::UploadConfig;
use coffer_core::{ChecksumAlgorithm, FILE_DOC_TYPE, FileDoc};
use coffer_metadata::{DocumentStore, MemoryStore, SqliteStore};
use coffer_storage::{ByteStore, FilesystemBackend, MemoryBackend};
use coffer_vfs::{BodyStream, UploadRequest, Uploader};
use std::sync::Arc;
use tempfile::TempDir;

use super::mocks::{InstrumentedByteStore, InstrumentedDocumentStore};

/// Raw SHA-256 digest of `data`.
#[allow(dead_code)]
pub fn sha256(data: &[u8]) -> Vec<u8> {
    ChecksumAlgorithm::Sha256.compute(data).as_bytes().to_vec()
}

/// Generate deterministic test data using a seeded pseudo-random generator.
#[allow(dead_code)]
pub fn seeded_bytes(seed: u64, len: usize) -> Bytes {
    let mut data = vec![0u8; len];
    let mut state = seed;

    for chunk in data.chunks_mut(8) {
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
        let bytes = state.to_le_bytes();
        for (i, byte) in chunk.iter_mut().enumerate() {
            *byte = bytes[i % 8];
        }
    }

    Bytes::from(data)
}

/// Body delivering `data` in chunks of `chunk_size` bytes.
#[allow(dead_code)]
pub fn chunked_body(data: Bytes, chunk_size: usize) -> BodyStream {
    let chunks: Vec<std::io::Result<Bytes>> = (0..data.len())
        .step_by(chunk_size.max(1))
        .map(|start| Ok(data.slice(start..(start + chunk_size).min(data.len()))))
        .collect();
    Box::pin(futures::stream::iter(chunks))
}

/// File upload request for `data` with its correct SHA-256 digest.
#[allow(dead_code)]
pub fn file_request(folder_id: &str, name: &str, data: Bytes) -> UploadRequest {
    let checksum = sha256(&data);
    let size = data.len() as i64;
    UploadRequest::file(folder_id, name, checksum, chunked_body(data, 4096)).with_size(size)
}

/// An uploader wired to instrumented stores.
#[allow(dead_code)]
pub struct Harness {
    pub storage: Arc<InstrumentedByteStore>,
    pub metadata: Arc<InstrumentedDocumentStore>,
    pub uploader: Uploader,
    _dir: Option<TempDir>,
}

#[allow(dead_code)]
impl Harness {
    /// In-memory stores with default configuration.
    pub fn memory() -> Self {
        Self::memory_with(UploadConfig::default())
    }

    pub fn memory_with(config: UploadConfig) -> Self {
        Self::build(
            Arc::new(MemoryBackend::new()),
            Arc::new(MemoryStore::new()),
            config,
            None,
        )
    }

    /// Filesystem byte store and SQLite document store in a temporary directory.
    pub async fn on_disk() -> Self {
        let dir = TempDir::new().unwrap();
        let storage = FilesystemBackend::new(dir.path().join("files")).await.unwrap();
        let metadata = SqliteStore::new(dir.path().join("metadata.db"), 5)
            .await
            .unwrap();
        Self::build(
            Arc::new(storage),
            Arc::new(metadata),
            UploadConfig::default(),
            Some(dir),
        )
    }

    fn build(
        storage: Arc<dyn ByteStore>,
        metadata: Arc<dyn DocumentStore>,
        config: UploadConfig,
        dir: Option<TempDir>,
    ) -> Self {
        let storage = Arc::new(InstrumentedByteStore::new(storage));
        let metadata = Arc::new(InstrumentedDocumentStore::new(metadata));
        let uploader = Uploader::new(storage.clone(), metadata.clone(), config);
        Self {
            storage,
            metadata,
            uploader,
            _dir: dir,
        }
    }

    /// All records currently visible in the document store.
    pub async fn records(&self) -> Vec<FileDoc> {
        self.metadata
            .list_docs(FILE_DOC_TYPE)
            .await
            .unwrap()
            .into_iter()
            .map(|stored| FileDoc::from_document(stored.body).unwrap())
            .collect()
    }

    /// Assert that every visible record points at bytes matching its checksum
    /// and size.
    pub async fn assert_records_consistent(&self) {
        for doc in self.records().await {
            let data = self.storage.get(&doc.path).await.unwrap();
            assert_eq!(
                sha256(&data),
                doc.attributes.checksum.as_bytes(),
                "digest of {} does not match its record",
                doc.path
            );
            assert_eq!(data.len() as u64, doc.attributes.size);
        }
    }
}
