//! Upload orchestration: allocate, write and verify, persist, roll back.

use crate::allocator::PathAllocator;
use crate::copy::{CopyOutcome, copy_and_verify};
use crate::error::{RollbackError, UploadError, UploadResult};
use crate::request::UploadRequest;
use coffer_core::{
    Checksum, Classification, Classifier, DocType, ExtensionClassifier, FileAttributes, FileDoc,
    Persistable, config::UploadConfig, validate_folder_id, validate_name,
};
use coffer_metadata::{DocumentStore, MetadataError, new_doc_id};
use coffer_storage::{ByteStore, FileWriter};
use std::sync::Arc;
use std::time::Duration;
use time::OffsetDateTime;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Upper bound on each compensating step. Rollback ignores the upload
/// deadline and the caller's cancellation.
const ROLLBACK_STEP_TIMEOUT: Duration = Duration::from_secs(30);

/// Stores new files across the byte store and the document store.
///
/// Bytes are written first and the record second. Any failure after the
/// destination was created removes the bytes again, so a visible record
/// always points at complete, verified bytes. When a compensating step fails
/// the upload reports [`UploadError::RollbackFailure`], which may leave
/// orphaned bytes but never a record without bytes.
pub struct Uploader {
    storage: Arc<dyn ByteStore>,
    metadata: Arc<dyn DocumentStore>,
    classifier: Arc<dyn Classifier>,
    allocator: PathAllocator,
    config: UploadConfig,
}

impl Uploader {
    pub fn new(
        storage: Arc<dyn ByteStore>,
        metadata: Arc<dyn DocumentStore>,
        config: UploadConfig,
    ) -> Self {
        let allocator = PathAllocator::new(
            storage.clone(),
            config.max_path_attempts,
            config.max_name_len,
        );
        Self {
            storage,
            metadata,
            classifier: Arc::new(ExtensionClassifier),
            allocator,
            config,
        }
    }

    /// Replace the default extension-based classifier.
    pub fn with_classifier(mut self, classifier: Arc<dyn Classifier>) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn config(&self) -> &UploadConfig {
        &self.config
    }

    /// Store a new file and return its persisted record.
    pub async fn upload(&self, request: UploadRequest) -> UploadResult<FileDoc> {
        self.upload_with_cancel(request, &CancellationToken::new()).await
    }

    /// Like [`Uploader::upload`], stopping the transfer when `cancel` fires.
    ///
    /// A cancelled upload is rolled back and reported as an I/O failure.
    /// Dropping the returned future instead skips the rollback.
    #[tracing::instrument(
        skip(self, request, cancel),
        fields(folder = %request.folder_id, name = %request.name)
    )]
    pub async fn upload_with_cancel(
        &self,
        request: UploadRequest,
        cancel: &CancellationToken,
    ) -> UploadResult<FileDoc> {
        let expected = match self.validate(&request) {
            Ok(expected) => expected,
            Err(e) => {
                tracing::warn!(error = %e, "Rejected upload request");
                return Err(e);
            }
        };
        let deadline = request
            .deadline
            .or_else(|| self.config.timeout().map(|timeout| Instant::now() + timeout));

        let UploadRequest {
            name,
            folder_id,
            size,
            tags,
            executable,
            class,
            mime,
            body,
            ..
        } = request;

        let (path, writer) = match self.open_destination(&folder_id, &name, deadline).await {
            Ok(destination) => destination,
            Err(e) => {
                tracing::warn!(error = %e, "Could not allocate storage path");
                return Err(e);
            }
        };
        tracing::debug!(path = %path, "Created destination");

        let report = copy_and_verify(
            body,
            writer,
            self.config.checksum_algorithm,
            &expected,
            cancel,
            deadline,
        )
        .await;
        let bytes_written = report.bytes_written;

        match report.outcome {
            CopyOutcome::Success => {}
            CopyOutcome::ChecksumMismatch { actual } => {
                tracing::warn!(
                    path = %path,
                    expected = %expected,
                    actual = %actual,
                    bytes_written,
                    "Checksum mismatch, rolling back"
                );
                let primary = UploadError::ChecksumMismatch {
                    path: path.clone(),
                    expected,
                    actual,
                    bytes_written,
                };
                return Err(self.rollback(primary, &path, None).await);
            }
            CopyOutcome::IoFailure(source) => {
                tracing::warn!(
                    path = %path,
                    bytes_written,
                    error = %source,
                    "Transfer failed, rolling back"
                );
                let primary = UploadError::IoFailure {
                    path: path.clone(),
                    bytes_written,
                    source,
                };
                return Err(self.rollback(primary, &path, None).await);
            }
        }

        if let Some(declared) = size
            && u64::try_from(declared).ok() != Some(bytes_written)
        {
            tracing::warn!(
                path = %path,
                declared,
                bytes_written,
                "Declared size differs from bytes written"
            );
        }

        let guess = self.classifier.classify(&name);
        let classification = Classification {
            class: class.unwrap_or(guess.class),
            mime: mime.unwrap_or(guess.mime),
        };
        let now = OffsetDateTime::now_utc();
        let attributes = FileAttributes {
            name,
            created_at: now,
            updated_at: now,
            size: bytes_written,
            tags,
            checksum: expected,
            executable,
            class: classification.class,
            mime: classification.mime,
        };
        let mut doc = FileDoc::new(attributes, folder_id, path.clone());
        doc.set_id(new_doc_id());

        if let Err(source) = self.persist(&mut doc, deadline).await {
            tracing::warn!(path = %path, error = %source, "Persisting record failed, rolling back");
            let uncertain = record_may_exist(&source);
            let primary = UploadError::PersistFailure {
                path: path.clone(),
                source,
            };
            let record = uncertain.then_some(&doc);
            return Err(self.rollback(primary, &path, record).await);
        }

        tracing::info!(
            id = doc.id.as_deref().unwrap_or_default(),
            path = %path,
            size = bytes_written,
            "Stored file"
        );
        Ok(doc)
    }

    fn validate(&self, request: &UploadRequest) -> UploadResult<Checksum> {
        match request.doc_type.parse::<DocType>() {
            Ok(DocType::File) => {}
            _ => {
                return Err(UploadError::UnsupportedDocumentType(
                    request.doc_type.clone(),
                ));
            }
        }

        let invalid = |e: coffer_core::Error| UploadError::InvalidRequest(e.to_string());
        validate_name(&request.name, self.config.max_name_len).map_err(invalid)?;
        validate_folder_id(&request.folder_id).map_err(invalid)?;

        if let Some(size) = request.size
            && size < 0
        {
            return Err(UploadError::InvalidRequest(format!(
                "negative declared size: {size}"
            )));
        }
        if request.tags.iter().any(|tag| tag.trim().is_empty()) {
            return Err(UploadError::InvalidRequest("empty tag".to_string()));
        }

        Checksum::parse(self.config.checksum_algorithm, &request.checksum).map_err(invalid)
    }

    /// Allocate a path and create it exclusively, moving on to the next
    /// candidate whenever a concurrent upload created it first.
    async fn open_destination(
        &self,
        folder_id: &str,
        name: &str,
        deadline: Option<Instant>,
    ) -> UploadResult<(String, Box<dyn FileWriter>)> {
        let mut first = 0;
        loop {
            let allocation = match deadline {
                Some(deadline) => tokio::time::timeout_at(
                    deadline,
                    self.allocator.allocate_from(folder_id, name, first),
                )
                .await
                .map_err(|_| allocation_deadline())??,
                None => self.allocator.allocate_from(folder_id, name, first).await?,
            };

            // Create is not raced against the deadline: abandoning it midway
            // could leave a file behind that nothing rolls back.
            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                return Err(allocation_deadline());
            }

            match self.storage.create(&allocation.path).await {
                Ok(writer) => return Ok((allocation.path, writer)),
                Err(e) if e.is_already_exists() => {
                    tracing::debug!(path = %allocation.path, "Lost race for path, retrying");
                    first = allocation.attempt + 1;
                }
                Err(e) => return Err(UploadError::byte_store(e)),
            }
        }
    }

    async fn persist(
        &self,
        doc: &mut FileDoc,
        deadline: Option<Instant>,
    ) -> Result<(), MetadataError> {
        match deadline {
            Some(deadline) => {
                tokio::time::timeout_at(deadline, self.metadata.create_doc(doc))
                    .await
                    .unwrap_or_else(|_| {
                        Err(MetadataError::Timeout(
                            "upload deadline expired while persisting record".to_string(),
                        ))
                    })
            }
            None => self.metadata.create_doc(doc).await,
        }
    }

    /// Undo the side effects of a failed upload.
    ///
    /// When `record` is set, the record may have been created despite the
    /// error and is deleted first. If that fails the bytes stay in place.
    async fn rollback(
        &self,
        primary: UploadError,
        path: &str,
        record: Option<&FileDoc>,
    ) -> UploadError {
        if let Some(doc) = record {
            let id = doc.id.clone().unwrap_or_default();
            let deleted = tokio::time::timeout(ROLLBACK_STEP_TIMEOUT, self.metadata.delete_doc(doc))
                .await
                .unwrap_or_else(|_| {
                    Err(MetadataError::Timeout("compensating record delete".to_string()))
                });
            match deleted {
                Ok(()) => tracing::warn!(id = %id, "Deleted record created by failed upload"),
                Err(e) if e.is_not_found() => {}
                Err(e) => {
                    tracing::error!(
                        id = %id,
                        path = %path,
                        error = %e,
                        "Failed to delete record, leaving bytes in place"
                    );
                    return UploadError::RollbackFailure {
                        primary: Box::new(primary),
                        path: path.to_string(),
                        rollback: RollbackError::Record { id, source: e },
                    };
                }
            }
        }

        let removed = tokio::time::timeout(ROLLBACK_STEP_TIMEOUT, self.storage.remove(path))
            .await
            .unwrap_or_else(|_| {
                Err(coffer_storage::StorageError::Unavailable(
                    "timed out removing bytes".to_string(),
                ))
            });
        match removed {
            Ok(()) => {
                tracing::warn!(path = %path, "Removed bytes of failed upload");
                primary
            }
            Err(e) if e.is_not_found() => primary,
            Err(e) => {
                tracing::error!(
                    path = %path,
                    error = %e,
                    "Failed to remove bytes of failed upload, orphaned"
                );
                UploadError::RollbackFailure {
                    primary: Box::new(primary),
                    path: path.to_string(),
                    rollback: RollbackError::Bytes(e),
                }
            }
        }
    }
}

/// Whether a failed create may still have stored the record.
///
/// A conflict means the id belongs to another document, which must not be
/// deleted. Serialization errors happen before anything is written.
fn record_may_exist(err: &MetadataError) -> bool {
    matches!(
        err,
        MetadataError::Timeout(_)
            | MetadataError::Database(_)
            | MetadataError::Io(_)
            | MetadataError::Unavailable(_)
    )
}

fn allocation_deadline() -> UploadError {
    UploadError::StoreUnavailable {
        store: "byte",
        reason: "upload deadline expired during path allocation".to_string(),
    }
}
