//! Configuration types shared across crates.

use crate::hash::ChecksumAlgorithm;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Byte store backend configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StorageConfig {
    /// Local filesystem storage.
    Filesystem {
        /// Root directory for file bytes.
        path: PathBuf,
    },
    /// In-process storage (testing and dry runs only).
    Memory,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::Filesystem {
            path: PathBuf::from("./data/files"),
        }
    }
}

/// Document store configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MetadataConfig {
    /// SQLite database file.
    Sqlite {
        /// Database file path.
        path: PathBuf,
        /// How long a writer waits on a locked database before failing.
        #[serde(default = "default_busy_timeout_secs")]
        busy_timeout_secs: u64,
    },
    /// In-process document store (testing and dry runs only).
    Memory,
}

fn default_busy_timeout_secs() -> u64 {
    5
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self::Sqlite {
            path: PathBuf::from("./data/metadata.db"),
            busy_timeout_secs: default_busy_timeout_secs(),
        }
    }
}

/// Upload path configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Number of candidate paths tried before reporting a path conflict.
    #[serde(default = "default_max_path_attempts")]
    pub max_path_attempts: u32,
    /// Deadline applied to uploads that do not carry their own.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    /// Digest algorithm declared checksums are verified with.
    #[serde(default)]
    pub checksum_algorithm: ChecksumAlgorithm,
    /// Maximum file name length in bytes.
    #[serde(default = "default_max_name_len")]
    pub max_name_len: usize,
}

fn default_max_path_attempts() -> u32 {
    16
}

fn default_max_name_len() -> usize {
    255
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_path_attempts: default_max_path_attempts(),
            timeout_secs: None,
            checksum_algorithm: ChecksumAlgorithm::default(),
            max_name_len: default_max_name_len(),
        }
    }
}

impl UploadConfig {
    /// Validate upload configuration invariants.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_path_attempts == 0 {
            return Err("upload.max_path_attempts must be at least 1".to_string());
        }
        if self.max_name_len == 0 {
            return Err("upload.max_name_len must be at least 1".to_string());
        }
        if self.timeout_secs == Some(0) {
            return Err("upload.timeout_secs must be greater than zero when set".to_string());
        }
        Ok(())
    }

    /// Get the default upload timeout, if configured.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// Complete application configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Byte store configuration.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Document store configuration.
    #[serde(default)]
    pub metadata: MetadataConfig,
    /// Upload path configuration.
    #[serde(default)]
    pub upload: UploadConfig,
}

impl AppConfig {
    /// Create a test configuration backed entirely by in-memory stores.
    ///
    /// **For testing only.**
    pub fn for_testing() -> Self {
        Self {
            storage: StorageConfig::Memory,
            metadata: MetadataConfig::Memory,
            upload: UploadConfig::default(),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        self.upload.validate()
    }
}
