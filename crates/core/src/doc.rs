//! File records as persisted in the document store.
//!
//! A [`FileDoc`] describes a stored file independently of where its bytes
//! live. The physical `path` is derived at upload time and is not part of
//! the identity a caller sees.

use crate::hash::Checksum;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use time::OffsetDateTime;

/// Document type under which file records are stored.
pub const FILE_DOC_TYPE: &str = "io.coffer.files";

/// Logical type tag carried by an upload request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocType {
    File,
    Directory,
}

impl DocType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Directory => "directory",
        }
    }
}

impl fmt::Display for DocType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocType {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s {
            "file" => Ok(Self::File),
            "directory" => Ok(Self::Directory),
            other => Err(crate::Error::UnknownDocType(other.to_string())),
        }
    }
}

/// Access to a document's store-assigned identity.
pub trait Identifiable {
    /// Unique key, if one has been assigned.
    fn id(&self) -> Option<&str>;

    /// Current revision token, if the document has been written.
    fn rev(&self) -> Option<&str>;
}

/// A document that a document store can create and delete.
pub trait Persistable: Identifiable + Send + Sync {
    /// Collection the document belongs to.
    fn doc_type(&self) -> &'static str;

    fn set_id(&mut self, id: String);

    fn set_rev(&mut self, rev: String);

    /// Full JSON body as it should be stored.
    fn to_document(&self) -> crate::Result<serde_json::Value>;
}

/// Descriptive attributes of a stored file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileAttributes {
    pub name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    /// Number of bytes stored at the record's path.
    #[serde(with = "size_string")]
    pub size: u64,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    pub checksum: Checksum,
    #[serde(default)]
    pub executable: bool,
    pub class: String,
    pub mime: String,
}

/// Metadata record for one stored file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDoc {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    pub attributes: FileAttributes,
    /// Parent folder, by identifier. Not checked for existence.
    pub folder_id: String,
    /// Location of the bytes in the byte store.
    pub path: String,
}

impl FileDoc {
    /// Create an unsaved record for bytes stored at `path`.
    pub fn new(
        attributes: FileAttributes,
        folder_id: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            rev: None,
            attributes,
            folder_id: folder_id.into(),
            path: path.into(),
        }
    }

    /// Rebuild a record from a stored JSON body.
    pub fn from_document(value: serde_json::Value) -> crate::Result<Self> {
        serde_json::from_value(value).map_err(|e| crate::Error::Serialization(e.to_string()))
    }
}

impl Identifiable for FileDoc {
    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn rev(&self) -> Option<&str> {
        self.rev.as_deref()
    }
}

impl Persistable for FileDoc {
    fn doc_type(&self) -> &'static str {
        FILE_DOC_TYPE
    }

    fn set_id(&mut self, id: String) {
        self.id = Some(id);
    }

    fn set_rev(&mut self, rev: String) {
        self.rev = Some(rev);
    }

    fn to_document(&self) -> crate::Result<serde_json::Value> {
        serde_json::to_value(self).map_err(|e| crate::Error::Serialization(e.to_string()))
    }
}

/// Sizes are persisted as decimal strings; numbers are accepted on read.
mod size_string {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(size: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&size.to_string())
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Text(String),
        Number(u64),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Number(n) => Ok(n),
            Repr::Text(s) => s.parse().map_err(serde::de::Error::custom),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::ChecksumAlgorithm;
    use time::macros::datetime;

    fn sample() -> FileDoc {
        let attributes = FileAttributes {
            name: "report.txt".to_string(),
            created_at: datetime!(2024-03-01 12:00 UTC),
            updated_at: datetime!(2024-03-01 12:00 UTC),
            size: 10,
            tags: ["work".to_string(), "q1".to_string()].into_iter().collect(),
            checksum: ChecksumAlgorithm::Md5.compute(b"0123456789"),
            executable: false,
            class: "text".to_string(),
            mime: "text/plain".to_string(),
        };
        FileDoc::new(attributes, "folder-1", "folder-1/report.txt")
    }

    #[test]
    fn test_document_shape() {
        let mut doc = sample();
        doc.set_id("abc".to_string());
        doc.set_rev("1-def".to_string());

        let value = doc.to_document().unwrap();
        assert_eq!(value["id"], "abc");
        assert_eq!(value["rev"], "1-def");
        assert_eq!(value["folder_id"], "folder-1");
        assert_eq!(value["path"], "folder-1/report.txt");
        assert_eq!(value["attributes"]["size"], "10");
        assert_eq!(value["attributes"]["created_at"], "2024-03-01T12:00:00Z");
        assert_eq!(value["attributes"]["tags"], serde_json::json!(["q1", "work"]));

        let back = FileDoc::from_document(value).unwrap();
        assert_eq!(back, doc);
    }

    #[test]
    fn test_unsaved_doc_omits_identity() {
        let doc = sample();
        assert_eq!(doc.id(), None);
        assert_eq!(doc.rev(), None);
        let value = doc.to_document().unwrap();
        assert!(value.get("id").is_none());
        assert!(value.get("rev").is_none());
    }

    #[test]
    fn test_size_accepts_number() {
        let mut value = sample().to_document().unwrap();
        value["attributes"]["size"] = serde_json::json!(42);
        let doc = FileDoc::from_document(value).unwrap();
        assert_eq!(doc.attributes.size, 42);
    }

    #[test]
    fn test_doc_type_parse() {
        assert_eq!("file".parse::<DocType>().unwrap(), DocType::File);
        assert_eq!("directory".parse::<DocType>().unwrap(), DocType::Directory);
        assert!("symlink".parse::<DocType>().is_err());
    }
}
