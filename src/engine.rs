use std::sync::Arc;

use async_trait::async_trait;
use axum::http::request::Parts;
use serde_json::{Map, Value};

use crate::config::{ConfigError, EnvDefaults, ResolvedOptions, StorageOptions};
use crate::error::StorageError;
use crate::file::{FileInfo, FileUpload, StoredFile};
use crate::object_store::{GcsClient, ObjectStore, PredefinedAcl, WriteOptions};
use crate::resolver::{ContentTypeResolver, DestinationResolver, FilenameResolver};

/// Contract between a multipart upload host and a storage backend.
///
/// The host calls [`handle_file`](StorageEngine::handle_file) once per file
/// part and [`remove_file`](StorageEngine::remove_file) to undo a stored file.
#[async_trait]
pub trait StorageEngine: Send + Sync {
    async fn handle_file(&self, req: &Parts, file: FileUpload) -> Result<StoredFile, StorageError>;

    /// Delete the object named `filename`, as reported in [`StoredFile::filename`].
    async fn remove_file(&self, req: &Parts, filename: &str) -> Result<(), StorageError>;
}

/// Where a single upload goes, decided before any bytes move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTarget {
    pub destination: String,
    pub filename: String,
    pub content_type: Option<String>,
    /// `destination` and `filename` joined as a path.
    pub key: String,
}

/// Storage engine that streams uploads into a Google Cloud Storage bucket.
pub struct GcsStorage {
    bucket: String,
    metadata: Map<String, Value>,
    acl: PredefinedAcl,
    filename: Arc<dyn FilenameResolver>,
    destination: Arc<dyn DestinationResolver>,
    content_type: Arc<dyn ContentTypeResolver>,
    store: Arc<dyn ObjectStore>,
}

impl GcsStorage {
    /// Validate `options` (with `env` as fallback) and bind to the bucket.
    pub fn new(options: StorageOptions, env: &EnvDefaults) -> Result<Self, ConfigError> {
        let resolved = options.resolve(env)?;

        let client = GcsClient::new(
            &resolved.project_id,
            resolved.key_filename.clone(),
            resolved.credentials.clone(),
            resolved.api_endpoint.as_deref(),
        )
        .map_err(|e| ConfigError::Client(e.to_string()))?;
        let bucket = client.bucket(&resolved.bucket);

        tracing::debug!(
            bucket = %resolved.bucket,
            project_id = %client.project_id(),
            "Created GCS storage engine"
        );

        Ok(Self::from_resolved(resolved, Arc::new(bucket)))
    }

    /// Same validation as [`GcsStorage::new`], but writes go to `store`
    /// instead of a GCS bucket handle.
    pub fn with_store(
        options: StorageOptions,
        env: &EnvDefaults,
        store: Arc<dyn ObjectStore>,
    ) -> Result<Self, ConfigError> {
        let resolved = options.resolve(env)?;
        Ok(Self::from_resolved(resolved, store))
    }

    fn from_resolved(resolved: ResolvedOptions, store: Arc<dyn ObjectStore>) -> Self {
        Self {
            bucket: resolved.bucket,
            metadata: resolved.metadata,
            acl: resolved.acl,
            filename: resolved.filename,
            destination: resolved.destination,
            content_type: resolved.content_type,
            store,
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Run the destination, filename and content type resolvers, in that
    /// order. The first resolver error is returned as-is.
    pub async fn resolve_target(
        &self,
        req: &Parts,
        file: &FileInfo,
    ) -> Result<UploadTarget, StorageError> {
        let destination = self
            .destination
            .destination(req, file)
            .await
            .map_err(StorageError::Resolver)?;
        let filename = self
            .filename
            .filename(req, file)
            .await
            .map_err(StorageError::Resolver)?;
        let content_type = self.content_type.content_type(req, file);

        Ok(UploadTarget {
            key: object_key(&destination, &filename),
            destination,
            filename,
            content_type,
        })
    }

    /// Default metadata with `contentType` set when a content type was
    /// resolved. The resolved type replaces any configured `contentType`.
    pub fn write_options(&self, content_type: Option<&str>) -> WriteOptions {
        let mut metadata = self.metadata.clone();
        if let Some(content_type) = content_type {
            metadata.insert(
                "contentType".to_string(),
                Value::String(content_type.to_string()),
            );
        }

        WriteOptions {
            metadata,
            predefined_acl: self.acl,
        }
    }

    /// Public URL reported for an uploaded file. Built from the file name
    /// alone, without the destination prefix.
    pub fn public_url(&self, filename: &str) -> String {
        format!("https://{}.storage.googleapis.com/{filename}", self.bucket)
    }
}

#[async_trait]
impl StorageEngine for GcsStorage {
    async fn handle_file(&self, req: &Parts, file: FileUpload) -> Result<StoredFile, StorageError> {
        let target = self.resolve_target(req, &file.info).await?;
        let options = self.write_options(target.content_type.as_deref());

        self.store.write(&target.key, &options, file.stream).await?;

        tracing::debug!(
            bucket = %self.bucket,
            key = %target.key,
            field = %file.info.field_name,
            acl = %options.predefined_acl,
            "Stored upload"
        );

        Ok(StoredFile {
            path: self.public_url(&target.filename),
            filename: target.filename,
        })
    }

    async fn remove_file(&self, _req: &Parts, filename: &str) -> Result<(), StorageError> {
        self.store.delete(filename).await?;
        tracing::debug!(bucket = %self.bucket, filename = %filename, "Removed upload");
        Ok(())
    }
}

/// Build a [`GcsStorage`] from `options`, reading environment fallbacks now.
pub fn storage_engine(options: StorageOptions) -> Result<GcsStorage, ConfigError> {
    GcsStorage::new(options, &EnvDefaults::load())
}

/// Join `destination` and `filename` the way a POSIX path join does:
/// empty parts are skipped, repeated slashes collapse, `.` and `..` are
/// resolved, and a leading or trailing slash is kept.
pub fn object_key(destination: &str, filename: &str) -> String {
    let joined = [destination, filename]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("/");
    normalize(&joined)
}

fn normalize(path: &str) -> String {
    if path.is_empty() {
        return ".".to_string();
    }

    let absolute = path.starts_with('/');
    let trailing = path.ends_with('/');

    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.last().is_some_and(|s| *s != "..") {
                    segments.pop();
                } else if !absolute {
                    segments.push("..");
                }
            }
            s => segments.push(s),
        }
    }

    let mut out = segments.join("/");
    if out.is_empty() && !absolute {
        out.push('.');
    }
    if trailing && !out.is_empty() {
        out.push('/');
    }

    if absolute {
        format!("/{out}")
    } else {
        out
    }
}
