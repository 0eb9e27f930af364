//! Declared checksums and incremental digest computation.

use base64::Engine;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// Digest algorithm used to bind a file record to its bytes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumAlgorithm {
    Md5,
    #[default]
    Sha256,
}

impl ChecksumAlgorithm {
    /// Length in bytes of a digest produced by this algorithm.
    pub fn digest_len(self) -> usize {
        match self {
            Self::Md5 => 16,
            Self::Sha256 => 32,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Md5 => "md5",
            Self::Sha256 => "sha256",
        }
    }

    /// Create an incremental hasher for this algorithm.
    pub fn hasher(self) -> ChecksumHasher {
        match self {
            Self::Md5 => ChecksumHasher::Md5(md5::Md5::new()),
            Self::Sha256 => ChecksumHasher::Sha256(Sha256::new()),
        }
    }

    /// Compute the digest of an in-memory buffer.
    pub fn compute(self, data: &[u8]) -> Checksum {
        let mut hasher = self.hasher();
        hasher.update(data);
        hasher.finalize()
    }
}

impl fmt::Display for ChecksumAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChecksumAlgorithm {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s {
            "md5" => Ok(Self::Md5),
            "sha256" => Ok(Self::Sha256),
            other => Err(crate::Error::InvalidHash(format!(
                "unsupported checksum algorithm: {other}"
            ))),
        }
    }
}

/// A binary digest declared by a caller, or computed over written bytes.
///
/// Serialized as standard base64, which is how records persist the digest.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Checksum(Vec<u8>);

impl Checksum {
    /// Wrap raw digest bytes, checking the length against the algorithm.
    pub fn parse(algorithm: ChecksumAlgorithm, bytes: &[u8]) -> crate::Result<Self> {
        if bytes.is_empty() {
            return Err(crate::Error::InvalidHash("checksum is empty".to_string()));
        }
        if bytes.len() != algorithm.digest_len() {
            return Err(crate::Error::InvalidHash(format!(
                "expected {} bytes for {algorithm}, got {}",
                algorithm.digest_len(),
                bytes.len()
            )));
        }
        Ok(Self(bytes.to_vec()))
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Compare two digests over their full length.
    ///
    /// Every byte is inspected even after a difference is found, and
    /// digests of different lengths never match.
    pub fn matches(&self, other: &Checksum) -> bool {
        if self.0.len() != other.0.len() {
            return false;
        }
        self.0
            .iter()
            .zip(other.0.iter())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }

    /// Parse from base64 string.
    pub fn from_base64(s: &str) -> crate::Result<Self> {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(s)
            .map_err(|e| crate::Error::InvalidHash(e.to_string()))?;
        if bytes.is_empty() {
            return Err(crate::Error::InvalidHash("checksum is empty".to_string()));
        }
        Ok(Self(bytes))
    }

    /// Encode as base64 string.
    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.0)
    }

    /// Parse from hex string.
    pub fn from_hex(s: &str) -> crate::Result<Self> {
        if s.is_empty() || s.len() % 2 != 0 {
            return Err(crate::Error::InvalidHash(format!(
                "expected an even, non-zero number of hex chars, got {}",
                s.len()
            )));
        }
        let mut bytes = Vec::with_capacity(s.len() / 2);
        for chunk in s.as_bytes().chunks(2) {
            let hex_str =
                std::str::from_utf8(chunk).map_err(|e| crate::Error::InvalidHash(e.to_string()))?;
            bytes.push(
                u8::from_str_radix(hex_str, 16)
                    .map_err(|e| crate::Error::InvalidHash(e.to_string()))?,
            );
        }
        Ok(Self(bytes))
    }

    /// Encode as lowercase hex string.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl fmt::Debug for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Checksum({})", self.to_hex())
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Serialize for Checksum {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base64())
    }
}

impl<'de> Deserialize<'de> for Checksum {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Checksum::from_base64(&s).map_err(serde::de::Error::custom)
    }
}

/// Incremental hasher over one of the supported algorithms.
pub enum ChecksumHasher {
    Md5(md5::Md5),
    Sha256(Sha256),
}

impl ChecksumHasher {
    /// Update the hasher with data.
    pub fn update(&mut self, data: &[u8]) {
        match self {
            Self::Md5(h) => h.update(data),
            Self::Sha256(h) => h.update(data),
        }
    }

    /// Finalize and return the digest.
    pub fn finalize(self) -> Checksum {
        match self {
            Self::Md5(h) => Checksum(h.finalize().to_vec()),
            Self::Sha256(h) => Checksum(h.finalize().to_vec()),
        }
    }
}
