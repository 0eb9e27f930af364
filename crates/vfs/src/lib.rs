//! Atomic upload path for the coffer virtual filesystem.
//!
//! File contents live in a byte store and their records in a separate
//! document store. [`Uploader`] keeps the two consistent without a shared
//! transaction:
//!
//! 1. validate the request,
//! 2. allocate a free storage path and create it exclusively,
//! 3. stream the body into it while computing its digest,
//! 4. persist the record only if the digest matches,
//! 5. remove the bytes again if any later step fails.

pub mod allocator;
pub mod copy;
pub mod error;
pub mod request;
pub mod uploader;

pub use allocator::{Allocation, PathAllocator};
pub use copy::{CopyOutcome, CopyReport, copy_and_verify};
pub use error::{ErrorKind, RollbackError, TransferError, UploadError, UploadResult};
pub use request::{BodyStream, UploadRequest, body_from_bytes, body_from_reader};
pub use uploader::Uploader;
