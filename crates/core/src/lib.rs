//! Core domain types for the coffer virtual filesystem.
//!
//! This crate defines the data model shared by the other crates:
//! - Declared checksums and incremental digests
//! - File records and the capability traits document stores rely on
//! - File name rules and storage key derivation
//! - File classification
//! - Configuration

pub mod classify;
pub mod config;
pub mod doc;
pub mod error;
pub mod hash;
pub mod naming;

pub use classify::{Classification, Classifier, ExtensionClassifier};
pub use doc::{DocType, FILE_DOC_TYPE, FileAttributes, FileDoc, Identifiable, Persistable};
pub use error::{Error, Result};
pub use hash::{Checksum, ChecksumAlgorithm, ChecksumHasher};
pub use naming::{ROOT_FOLDER_ID, candidate_path, validate_folder_id, validate_name};
