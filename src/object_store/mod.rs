mod acl;
mod auth;
mod gcs;
mod local;

pub use acl::PredefinedAcl;
pub use auth::ServiceAccountKey;
pub use gcs::{GcsBucket, GcsClient, DEFAULT_API_ENDPOINT};
pub use local::LocalStore;

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use serde_json::{Map, Value};
use thiserror::Error;

/// Incoming file bytes, consumed exactly once by [`ObjectStore::write`].
pub type ByteStream = Pin<Box<dyn Stream<Item = std::io::Result<Bytes>> + Send + Sync>>;

#[derive(Debug, Error)]
pub enum ObjectStoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Object not found: {0}")]
    NotFound(String),
    #[error("Authentication error: {0}")]
    Auth(String),
    #[error("Backend error: {0}")]
    Backend(String),
}

/// Per-object options for a write: the object resource metadata and the ACL
/// applied when the object is created.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteOptions {
    pub metadata: Map<String, Value>,
    pub predefined_acl: PredefinedAcl,
}

impl WriteOptions {
    /// Content type recorded in the metadata, if any.
    pub fn content_type(&self) -> Option<&str> {
        self.metadata.get("contentType").and_then(Value::as_str)
    }
}

/// A handle to a single bucket.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Stream `body` into the object at `key`. Returns once the remote side
    /// has acknowledged the complete object.
    async fn write(
        &self,
        key: &str,
        options: &WriteOptions,
        body: ByteStream,
    ) -> Result<(), ObjectStoreError>;

    async fn delete(&self, key: &str) -> Result<(), ObjectStoreError>;
}
