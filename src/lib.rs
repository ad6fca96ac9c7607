//! gcs-upload-storage - A multipart upload storage engine backed by Google Cloud Storage
//!
//! This crate provides:
//! - A storage engine contract for multipart upload hosts ([`StorageEngine`])
//! - [`GcsStorage`], which streams each uploaded file into a GCS bucket
//! - Pluggable filename, destination and content type resolvers
//! - An axum host exposing the engine over HTTP

pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod file;
pub mod object_store;
pub mod resolver;

use std::sync::Arc;

pub use config::{ConfigError, EnvDefaults, StorageOptions};
pub use engine::{object_key, storage_engine, GcsStorage, StorageEngine, UploadTarget};
pub use error::{BoxError, StorageError};
pub use file::{FileInfo, FileUpload, StoredFile};
pub use object_store::{ObjectStore, ObjectStoreError, PredefinedAcl, WriteOptions};

use config::ServerConfig;

/// Shared application state
pub struct AppState {
    pub config: ServerConfig,
    /// Bucket the engine writes to, reported by the health endpoint.
    pub bucket: String,
    pub engine: Arc<dyn StorageEngine>,
}
