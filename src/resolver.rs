//! Hooks that decide where an upload lands and how it is labelled.
//!
//! Each hook is a trait with a built-in default. Plain closures implement the
//! traits too, so a synchronous override can be passed inline:
//!
//! ```
//! use axum::http::request::Parts;
//! use gcs_upload_storage::{BoxError, FileInfo, StorageOptions};
//!
//! let options = StorageOptions::new("my-bucket").destination(
//!     |_req: &Parts, file: &FileInfo| -> Result<String, BoxError> {
//!         Ok(format!("uploads/{}", file.field_name))
//!     },
//! );
//! assert!(options.destination.is_some());
//! ```

use async_trait::async_trait;
use axum::http::request::Parts;

use crate::error::BoxError;
use crate::file::FileInfo;

pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Picks the object's file name. May do async work.
#[async_trait]
pub trait FilenameResolver: Send + Sync {
    async fn filename(&self, req: &Parts, file: &FileInfo) -> Result<String, BoxError>;
}

/// Picks the directory-like prefix the file name is joined onto.
#[async_trait]
pub trait DestinationResolver: Send + Sync {
    async fn destination(&self, req: &Parts, file: &FileInfo) -> Result<String, BoxError>;
}

/// Picks the stored content type. `None` leaves the default metadata alone.
pub trait ContentTypeResolver: Send + Sync {
    fn content_type(&self, req: &Parts, file: &FileInfo) -> Option<String>;
}

#[async_trait]
impl<F> FilenameResolver for F
where
    F: Fn(&Parts, &FileInfo) -> Result<String, BoxError> + Send + Sync,
{
    async fn filename(&self, req: &Parts, file: &FileInfo) -> Result<String, BoxError> {
        self(req, file)
    }
}

#[async_trait]
impl<F> DestinationResolver for F
where
    F: Fn(&Parts, &FileInfo) -> Result<String, BoxError> + Send + Sync,
{
    async fn destination(&self, req: &Parts, file: &FileInfo) -> Result<String, BoxError> {
        self(req, file)
    }
}

impl<F> ContentTypeResolver for F
where
    F: Fn(&Parts, &FileInfo) -> Option<String> + Send + Sync,
{
    fn content_type(&self, req: &Parts, file: &FileInfo) -> Option<String> {
        self(req, file)
    }
}

/// `{uuid}_{original name}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidFilename;

#[async_trait]
impl FilenameResolver for UuidFilename {
    async fn filename(&self, _req: &Parts, file: &FileInfo) -> Result<String, BoxError> {
        Ok(format!("{}_{}", uuid::Uuid::new_v4(), file.original_name))
    }
}

/// Bucket root.
#[derive(Debug, Clone, Copy, Default)]
pub struct RootDestination;

#[async_trait]
impl DestinationResolver for RootDestination {
    async fn destination(&self, _req: &Parts, _file: &FileInfo) -> Result<String, BoxError> {
        Ok(String::new())
    }
}

/// Always `application/octet-stream`.
#[derive(Debug, Clone, Copy, Default)]
pub struct OctetStream;

impl ContentTypeResolver for OctetStream {
    fn content_type(&self, _req: &Parts, _file: &FileInfo) -> Option<String> {
        Some(DEFAULT_CONTENT_TYPE.to_string())
    }
}

/// Guesses from the original file name's extension, then falls back to the
/// type declared on the multipart part, then to `application/octet-stream`.
#[derive(Debug, Clone, Copy, Default)]
pub struct GuessContentType;

impl ContentTypeResolver for GuessContentType {
    fn content_type(&self, _req: &Parts, file: &FileInfo) -> Option<String> {
        let guessed = mime_guess::from_path(&file.original_name)
            .first()
            .map(|m| m.to_string());
        let declared = Some(file.mime_type.clone())
            .filter(|ct| !ct.is_empty() && ct != DEFAULT_CONTENT_TYPE);

        Some(
            guessed
                .or(declared)
                .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string()),
        )
    }
}
