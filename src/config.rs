use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::object_store::{PredefinedAcl, ServiceAccountKey};
use crate::resolver::{
    ContentTypeResolver, DestinationResolver, FilenameResolver, OctetStream, RootDestination,
    UuidFilename,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("You have to specify bucket for Google Cloud Storage to work.")]
    MissingBucket,
    #[error("You have to specify project id for Google Cloud Storage to work.")]
    MissingProjectId,
    #[error(
        "You have to specify credentials key file or credentials for Google Cloud Storage to work."
    )]
    MissingCredentials,
    #[error("Failed to create Google Cloud Storage client: {0}")]
    Client(String),
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Environment fallbacks for the storage options, captured once at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvDefaults {
    pub bucket: Option<String>,
    pub project_id: Option<String>,
    pub key_filename: Option<PathBuf>,
}

impl EnvDefaults {
    /// Read `GOOGLE_CLOUD_STORAGE_BUCKET`, `GOOGLE_CLOUD_PROJECT_ID` and
    /// `GOOGLE_CLOUD_KEY_FILE`.
    pub fn load() -> Self {
        Self {
            bucket: std::env::var("GOOGLE_CLOUD_STORAGE_BUCKET").ok(),
            project_id: std::env::var("GOOGLE_CLOUD_PROJECT_ID").ok(),
            key_filename: std::env::var("GOOGLE_CLOUD_KEY_FILE").ok().map(PathBuf::from),
        }
    }
}

/// Options for [`GcsStorage`](crate::engine::GcsStorage).
///
/// Anything left unset falls back to [`EnvDefaults`] (bucket, project id and
/// key file) or to the built-in resolvers.
#[derive(Clone, Default)]
pub struct StorageOptions {
    pub bucket: Option<String>,
    pub project_id: Option<String>,
    pub key_filename: Option<PathBuf>,
    /// Inline service account key, used when no key file is configured.
    pub credentials: Option<ServiceAccountKey>,
    /// Default object metadata (GCS object resource fields).
    pub metadata: Option<Map<String, Value>>,
    pub acl: Option<PredefinedAcl>,
    /// Overrides `https://storage.googleapis.com`, e.g. for an emulator.
    pub api_endpoint: Option<String>,
    pub filename: Option<Arc<dyn FilenameResolver>>,
    pub destination: Option<Arc<dyn DestinationResolver>>,
    pub content_type: Option<Arc<dyn ContentTypeResolver>>,
}

impl fmt::Debug for StorageOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageOptions")
            .field("bucket", &self.bucket)
            .field("project_id", &self.project_id)
            .field("key_filename", &self.key_filename)
            .field("credentials", &self.credentials)
            .field("metadata", &self.metadata)
            .field("acl", &self.acl)
            .field("api_endpoint", &self.api_endpoint)
            .field("filename", &self.filename.is_some())
            .field("destination", &self.destination.is_some())
            .field("content_type", &self.content_type.is_some())
            .finish()
    }
}

impl StorageOptions {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: Some(bucket.into()),
            ..Default::default()
        }
    }

    pub fn project_id(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }

    pub fn key_filename(mut self, path: impl Into<PathBuf>) -> Self {
        self.key_filename = Some(path.into());
        self
    }

    pub fn credentials(mut self, key: ServiceAccountKey) -> Self {
        self.credentials = Some(key);
        self
    }

    pub fn metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn acl(mut self, acl: PredefinedAcl) -> Self {
        self.acl = Some(acl);
        self
    }

    pub fn api_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.api_endpoint = Some(endpoint.into());
        self
    }

    pub fn filename(mut self, resolver: impl FilenameResolver + 'static) -> Self {
        self.filename = Some(Arc::new(resolver));
        self
    }

    pub fn destination(mut self, resolver: impl DestinationResolver + 'static) -> Self {
        self.destination = Some(Arc::new(resolver));
        self
    }

    pub fn content_type(mut self, resolver: impl ContentTypeResolver + 'static) -> Self {
        self.content_type = Some(Arc::new(resolver));
        self
    }

    /// Apply resolver defaults and environment fallbacks, then check that a
    /// bucket, a project id and some credentials are present, in that order.
    pub fn resolve(self, env: &EnvDefaults) -> Result<ResolvedOptions, ConfigError> {
        let bucket = non_empty(self.bucket).or_else(|| non_empty(env.bucket.clone()));
        let project_id = non_empty(self.project_id).or_else(|| non_empty(env.project_id.clone()));
        let key_filename = self
            .key_filename
            .filter(|p| !p.as_os_str().is_empty())
            .or_else(|| {
                env.key_filename
                    .clone()
                    .filter(|p| !p.as_os_str().is_empty())
            });

        let bucket = bucket.ok_or(ConfigError::MissingBucket)?;
        let project_id = project_id.ok_or(ConfigError::MissingProjectId)?;
        if key_filename.is_none() && self.credentials.is_none() {
            return Err(ConfigError::MissingCredentials);
        }

        Ok(ResolvedOptions {
            bucket,
            project_id,
            key_filename,
            credentials: self.credentials,
            metadata: self.metadata.unwrap_or_default(),
            acl: self.acl.unwrap_or_default(),
            api_endpoint: self.api_endpoint,
            filename: self.filename.unwrap_or_else(|| Arc::new(UuidFilename)),
            destination: self.destination.unwrap_or_else(|| Arc::new(RootDestination)),
            content_type: self.content_type.unwrap_or_else(|| Arc::new(OctetStream)),
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Storage options after defaults and validation. Immutable for the lifetime
/// of the adapter.
#[derive(Clone)]
pub struct ResolvedOptions {
    pub bucket: String,
    pub project_id: String,
    pub key_filename: Option<PathBuf>,
    pub credentials: Option<ServiceAccountKey>,
    pub metadata: Map<String, Value>,
    pub acl: PredefinedAcl,
    pub api_endpoint: Option<String>,
    pub filename: Arc<dyn FilenameResolver>,
    pub destination: Arc<dyn DestinationResolver>,
    pub content_type: Arc<dyn ContentTypeResolver>,
}

// ============================================================================
// Host server configuration
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    Gcs,
    Local,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_address: String,
    /// Maximum request body size in bytes
    pub max_upload_size: u64,
    pub backend: StorageBackend,
    /// Directory for local storage backend
    pub local_storage_path: String,
    /// ACL applied to uploaded objects, overriding the `private` default
    pub acl: Option<PredefinedAcl>,
    /// Guess content types from file extensions instead of always sending
    /// `application/octet-stream`
    pub guess_content_type: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_upload_size: 50 * 1024 * 1024,
            backend: StorageBackend::Gcs,
            local_storage_path: "./files".to_string(),
            acl: None,
            guess_content_type: false,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let bind_address = std::env::var("BIND_ADDRESS").unwrap_or(defaults.bind_address);

        let max_upload_size = std::env::var("MAX_UPLOAD_SIZE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.max_upload_size);

        let backend = match std::env::var("STORAGE_BACKEND")
            .unwrap_or_else(|_| "gcs".to_string())
            .to_lowercase()
            .as_str()
        {
            "local" => StorageBackend::Local,
            _ => StorageBackend::Gcs,
        };

        let local_storage_path =
            std::env::var("LOCAL_STORAGE_PATH").unwrap_or(defaults.local_storage_path);

        let acl = match std::env::var("UPLOAD_ACL") {
            Ok(value) => Some(
                value
                    .parse::<PredefinedAcl>()
                    .map_err(ConfigError::ValidationError)?,
            ),
            Err(_) => None,
        };

        let guess_content_type = std::env::var("GUESS_CONTENT_TYPE")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        let config = ServerConfig {
            bind_address,
            max_upload_size,
            backend,
            local_storage_path,
            acl,
            guess_content_type,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_upload_size == 0 {
            return Err(ConfigError::ValidationError(
                "MAX_UPLOAD_SIZE must be greater than 0".to_string(),
            ));
        }

        if self.backend == StorageBackend::Local && self.local_storage_path.is_empty() {
            return Err(ConfigError::ValidationError(
                "LOCAL_STORAGE_PATH cannot be empty when STORAGE_BACKEND=local".to_string(),
            ));
        }

        Ok(())
    }
}
