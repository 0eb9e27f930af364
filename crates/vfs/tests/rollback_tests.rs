// Compensating actions after a failed write or persist.

mod common;

use bytes::Bytes;
use coffer_core::FILE_DOC_TYPE;
use coffer_metadata::MetadataError;
use coffer_storage::ByteStore;
use coffer_vfs::{ErrorKind, RollbackError, UploadError, UploadRequest, body_from_bytes};
use common::{CreateFailure, Harness, file_request, seeded_bytes, sha256};
use std::sync::atomic::Ordering;

#[tokio::test]
async fn test_persist_failure_removes_bytes() {
    let h = Harness::memory();
    h.metadata.set_create_failure(Some(CreateFailure::Reject));
    let data = seeded_bytes(1, 1024);

    let err = h
        .uploader
        .upload(file_request("root", "kb.bin", data))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::PersistFailure);
    let UploadError::PersistFailure { path, source } = &err else {
        panic!("expected persist failure, got {err:?}");
    };
    assert_eq!(path, "root/kb.bin");
    assert!(matches!(source, MetadataError::Unavailable(_)));
    assert!(!h.storage.exists(path).await.unwrap());
    assert_eq!(h.storage.remove_calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.metadata.count(FILE_DOC_TYPE).await, 0);
}

#[tokio::test]
async fn test_record_stored_despite_error_is_deleted() {
    let h = Harness::memory();
    h.metadata.set_create_failure(Some(CreateFailure::StoreThenFail));

    let err = h
        .uploader
        .upload(file_request("root", "a.txt", Bytes::from_static(b"abc")))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::PersistFailure);
    assert_eq!(h.metadata.delete_calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.metadata.count(FILE_DOC_TYPE).await, 0);
    assert!(!h.storage.exists("root/a.txt").await.unwrap());
}

#[tokio::test]
async fn test_failed_byte_removal_reports_both_errors() {
    let h = Harness::memory();
    h.storage.set_fail_remove(true);
    let req = UploadRequest::file(
        "root",
        "bad.bin",
        sha256(b"other"),
        body_from_bytes("0123456789"),
    );

    let err = h.uploader.upload(req).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::RollbackFailure);
    assert_eq!(err.primary().kind(), ErrorKind::ChecksumMismatch);
    assert_eq!(err.orphaned_path(), Some("root/bad.bin"));
    assert!(matches!(
        err,
        UploadError::RollbackFailure {
            rollback: RollbackError::Bytes(_),
            ..
        }
    ));
    let message = err.to_string();
    assert!(message.contains("checksum mismatch"), "{message}");
    assert!(message.contains("injected remove failure"), "{message}");

    // Orphaned bytes, but no record pointing at them.
    assert!(h.storage.exists("root/bad.bin").await.unwrap());
    assert_eq!(h.metadata.count(FILE_DOC_TYPE).await, 0);
}

#[tokio::test]
async fn test_persist_then_removal_failure() {
    let h = Harness::memory();
    h.metadata.set_create_failure(Some(CreateFailure::Reject));
    h.storage.set_fail_remove(true);

    let err = h
        .uploader
        .upload(file_request("root", "a.txt", Bytes::from_static(b"abc")))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::RollbackFailure);
    assert_eq!(err.primary().kind(), ErrorKind::PersistFailure);
    assert_eq!(h.metadata.count(FILE_DOC_TYPE).await, 0);
}

#[tokio::test]
async fn test_failed_record_delete_keeps_bytes() {
    let h = Harness::memory();
    h.metadata.set_create_failure(Some(CreateFailure::StoreThenFail));
    h.metadata.set_fail_delete(true);

    let err = h
        .uploader
        .upload(file_request("root", "a.txt", Bytes::from_static(b"abc")))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::RollbackFailure);
    assert_eq!(err.primary().kind(), ErrorKind::PersistFailure);
    assert!(matches!(
        err,
        UploadError::RollbackFailure {
            rollback: RollbackError::Record { .. },
            ..
        }
    ));
    assert_eq!(h.storage.remove_calls.load(Ordering::SeqCst), 0);

    // The record that may be visible still points at complete bytes.
    h.assert_records_consistent().await;
}

#[tokio::test]
async fn test_read_error_rolls_back() {
    let h = Harness::memory();
    let body: coffer_vfs::BodyStream = Box::pin(futures::stream::iter(vec![
        Ok(Bytes::from_static(b"partial")),
        Err(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            "client went away",
        )),
    ]));
    let req = UploadRequest::file("root", "a.txt", sha256(b"partial data"), body);

    let err = h.uploader.upload(req).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::IoFailure);
    let UploadError::IoFailure { bytes_written, .. } = err else {
        panic!("expected I/O failure");
    };
    assert_eq!(bytes_written, 7);
    assert!(!h.storage.exists("root/a.txt").await.unwrap());
    assert_eq!(h.metadata.total_calls(), 0);
}
