use std::fmt;

use serde::{Deserialize, Serialize};

use crate::object_store::ByteStream;

/// What the host knows about an uploaded file before its bytes are read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileInfo {
    /// Name of the multipart form field the file came from.
    pub field_name: String,
    /// File name as sent by the client.
    pub original_name: String,
    pub encoding: String,
    /// Content type declared on the multipart part.
    pub mime_type: String,
}

/// A file handed to a storage engine: its description plus the byte stream.
pub struct FileUpload {
    pub info: FileInfo,
    pub stream: ByteStream,
}

impl fmt::Debug for FileUpload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileUpload")
            .field("info", &self.info)
            .finish_non_exhaustive()
    }
}

/// Result of a completed upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredFile {
    /// Public URL of the object.
    pub path: String,
    pub filename: String,
}
