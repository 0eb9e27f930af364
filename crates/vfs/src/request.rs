//! Caller-facing upload input.

use bytes::Bytes;
use futures::Stream;
use std::collections::BTreeSet;
use std::fmt;
use std::pin::Pin;
use tokio::io::AsyncRead;
use tokio::time::Instant;

/// Streamed contents of an upload.
pub type BodyStream = Pin<Box<dyn Stream<Item = std::io::Result<Bytes>> + Send>>;

/// Body yielding a single in-memory buffer.
pub fn body_from_bytes(data: impl Into<Bytes>) -> BodyStream {
    let data = data.into();
    Box::pin(futures::stream::once(async move { Ok(data) }))
}

/// Body reading from any async reader, such as an open file.
pub fn body_from_reader<R>(reader: R) -> BodyStream
where
    R: AsyncRead + Send + 'static,
{
    Box::pin(tokio_util::io::ReaderStream::new(reader))
}

/// A request to store a new file.
pub struct UploadRequest {
    /// Logical type tag; only `"file"` is accepted.
    pub doc_type: String,
    pub name: String,
    pub folder_id: String,
    /// Size announced by the caller. Informational only.
    pub size: Option<i64>,
    pub tags: BTreeSet<String>,
    /// Raw digest the written bytes must match.
    pub checksum: Vec<u8>,
    pub executable: bool,
    /// Overrides the classifier when set.
    pub class: Option<String>,
    /// Overrides the classifier when set.
    pub mime: Option<String>,
    pub body: BodyStream,
    pub deadline: Option<Instant>,
}

impl UploadRequest {
    /// Request for a plain file with no tags, size hint or deadline.
    pub fn file(
        folder_id: impl Into<String>,
        name: impl Into<String>,
        checksum: impl Into<Vec<u8>>,
        body: BodyStream,
    ) -> Self {
        Self {
            doc_type: "file".to_string(),
            name: name.into(),
            folder_id: folder_id.into(),
            size: None,
            tags: BTreeSet::new(),
            checksum: checksum.into(),
            executable: false,
            class: None,
            mime: None,
            body,
            deadline: None,
        }
    }

    pub fn with_size(mut self, size: i64) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    pub fn with_executable(mut self, executable: bool) -> Self {
        self.executable = executable;
        self
    }

    pub fn with_mime(mut self, class: impl Into<String>, mime: impl Into<String>) -> Self {
        self.class = Some(class.into());
        self.mime = Some(mime.into());
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

impl fmt::Debug for UploadRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadRequest")
            .field("doc_type", &self.doc_type)
            .field("name", &self.name)
            .field("folder_id", &self.folder_id)
            .field("size", &self.size)
            .field("tags", &self.tags)
            .field("checksum_len", &self.checksum.len())
            .field("executable", &self.executable)
            .field("deadline", &self.deadline)
            .finish_non_exhaustive()
    }
}
