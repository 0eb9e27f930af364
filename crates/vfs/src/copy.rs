//! Checksum-verifying copy from an upload body into the byte store.

use crate::error::TransferError;
use crate::request::BodyStream;
use coffer_core::{Checksum, ChecksumAlgorithm};
use coffer_storage::FileWriter;
use futures::StreamExt;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// How a copy ended.
#[derive(Debug)]
pub enum CopyOutcome {
    /// All bytes were written and their digest matches the expected one.
    Success,
    /// All bytes were written but their digest differs.
    ChecksumMismatch { actual: Checksum },
    /// The transfer stopped early.
    IoFailure(TransferError),
}

/// Result of [`copy_and_verify`].
///
/// Whatever was transferred stays at the destination, whatever the outcome.
#[derive(Debug)]
pub struct CopyReport {
    pub bytes_written: u64,
    pub outcome: CopyOutcome,
}

impl CopyReport {
    fn failed(bytes_written: u64, reason: TransferError) -> Self {
        Self {
            bytes_written,
            outcome: CopyOutcome::IoFailure(reason),
        }
    }
}

async fn interrupted(cancel: &CancellationToken, deadline: Option<Instant>) -> TransferError {
    let expiry = async {
        match deadline {
            Some(deadline) => tokio::time::sleep_until(deadline).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::select! {
        _ = cancel.cancelled() => TransferError::Cancelled,
        _ = expiry => TransferError::DeadlineExceeded,
    }
}

/// Stream `body` into `writer`, hashing every byte on the way through.
///
/// The digest is computed once, incrementally, and compared to `expected`
/// over its full length after the writer has been flushed. Cancellation and
/// the deadline are observed between every read and write.
pub async fn copy_and_verify(
    mut body: BodyStream,
    mut writer: Box<dyn FileWriter>,
    algorithm: ChecksumAlgorithm,
    expected: &Checksum,
    cancel: &CancellationToken,
    deadline: Option<Instant>,
) -> CopyReport {
    let mut hasher = algorithm.hasher();
    let mut bytes_written = 0u64;

    let stop = interrupted(cancel, deadline);
    tokio::pin!(stop);

    loop {
        let next = tokio::select! {
            biased;
            reason = &mut stop => return CopyReport::failed(bytes_written, reason),
            next = body.next() => next,
        };

        let chunk = match next {
            None => break,
            Some(Err(e)) => return CopyReport::failed(bytes_written, TransferError::Read(e)),
            Some(Ok(chunk)) if chunk.is_empty() => continue,
            Some(Ok(chunk)) => chunk,
        };

        hasher.update(&chunk);
        let len = chunk.len() as u64;
        let written = tokio::select! {
            biased;
            reason = &mut stop => return CopyReport::failed(bytes_written, reason),
            written = writer.write(chunk) => written,
        };
        if let Err(e) = written {
            return CopyReport::failed(bytes_written, TransferError::Write(e));
        }
        bytes_written += len;
    }

    let finished = tokio::select! {
        biased;
        reason = &mut stop => return CopyReport::failed(bytes_written, reason),
        finished = writer.finish() => finished,
    };
    match finished {
        Ok(total) => bytes_written = total,
        Err(e) => return CopyReport::failed(bytes_written, TransferError::Write(e)),
    }

    let actual = hasher.finalize();
    let outcome = if actual.matches(expected) {
        CopyOutcome::Success
    } else {
        CopyOutcome::ChecksumMismatch { actual }
    };
    CopyReport {
        bytes_written,
        outcome,
    }
}
