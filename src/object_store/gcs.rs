use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::header::{CONTENT_TYPE, LOCATION};
use reqwest::{Body, Client, Response, StatusCode};
use serde_json::Value;

use super::auth::{Credentials, TokenSource};
use crate::resolver::DEFAULT_CONTENT_TYPE;
use super::{ByteStream, ObjectStore, ObjectStoreError, ServiceAccountKey, WriteOptions};

pub const DEFAULT_API_ENDPOINT: &str = "https://storage.googleapis.com";

/// Characters left as-is when an object name is placed in a URL path segment.
const OBJECT_NAME: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Google Cloud Storage client: an HTTP client plus service account auth,
/// scoped to a project. Hands out [`GcsBucket`] handles.
pub struct GcsClient {
    client: Client,
    project_id: String,
    api_endpoint: String,
    tokens: Arc<TokenSource>,
}

impl GcsClient {
    /// Build a client from a key file path or an inline service account key.
    /// A key file takes precedence when both are given. Nothing is fetched
    /// until the first request.
    pub fn new(
        project_id: &str,
        key_filename: Option<PathBuf>,
        credentials: Option<ServiceAccountKey>,
        api_endpoint: Option<&str>,
    ) -> Result<Self, ObjectStoreError> {
        let credentials = match (key_filename, credentials) {
            (Some(path), _) => Credentials::KeyFile(path),
            (None, Some(key)) => Credentials::Inline(key),
            (None, None) => {
                return Err(ObjectStoreError::Auth(
                    "no key file or inline credentials supplied".to_string(),
                ))
            }
        };

        let client = Client::builder()
            .build()
            .map_err(|e| ObjectStoreError::Backend(e.to_string()))?;

        Ok(Self {
            client,
            project_id: project_id.to_string(),
            api_endpoint: api_endpoint
                .unwrap_or(DEFAULT_API_ENDPOINT)
                .trim_end_matches('/')
                .to_string(),
            tokens: Arc::new(TokenSource::new(credentials)),
        })
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// Handle to the named bucket. The bucket is not checked for existence.
    pub fn bucket(&self, name: &str) -> GcsBucket {
        GcsBucket {
            name: name.to_string(),
            client: self.client.clone(),
            api_endpoint: self.api_endpoint.clone(),
            tokens: Arc::clone(&self.tokens),
        }
    }
}

/// A bucket handle backed by the GCS JSON API.
pub struct GcsBucket {
    name: String,
    client: Client,
    api_endpoint: String,
    tokens: Arc<TokenSource>,
}

impl GcsBucket {
    pub fn name(&self) -> &str {
        &self.name
    }

    fn resumable_url(&self, options: &WriteOptions) -> String {
        format!(
            "{}/upload/storage/v1/b/{}/o?uploadType=resumable&predefinedAcl={}",
            self.api_endpoint,
            utf8_percent_encode(&self.name, OBJECT_NAME),
            options.predefined_acl
        )
    }

    fn object_url(&self, key: &str) -> String {
        format!(
            "{}/storage/v1/b/{}/o/{}",
            self.api_endpoint,
            utf8_percent_encode(&self.name, OBJECT_NAME),
            utf8_percent_encode(key, OBJECT_NAME)
        )
    }

    /// Open a resumable upload session and return its URI.
    async fn start_session(
        &self,
        token: &str,
        key: &str,
        options: &WriteOptions,
    ) -> Result<String, ObjectStoreError> {
        let mut resource = options.metadata.clone();
        resource.insert("name".to_string(), Value::String(key.to_string()));

        let mut req = self
            .client
            .post(self.resumable_url(options))
            .bearer_auth(token)
            .json(&resource);
        if let Some(content_type) = options.content_type() {
            req = req.header("X-Upload-Content-Type", content_type);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| ObjectStoreError::Backend(e.to_string()))?;
        let resp = ensure_success(resp, key, "session start").await?;

        resp.headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| {
                ObjectStoreError::Backend("GCS upload session has no Location header".to_string())
            })
    }
}

#[async_trait]
impl ObjectStore for GcsBucket {
    async fn write(
        &self,
        key: &str,
        options: &WriteOptions,
        body: ByteStream,
    ) -> Result<(), ObjectStoreError> {
        let token = self.tokens.token(&self.client).await?;
        let session = self.start_session(&token, key, options).await?;

        let content_type = options
            .content_type()
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_string();

        let resp = self
            .client
            .put(session)
            .header(CONTENT_TYPE, content_type)
            .body(Body::wrap_stream(body))
            .send()
            .await
            .map_err(|e| ObjectStoreError::Backend(e.to_string()))?;
        ensure_success(resp, key, "upload").await?;

        tracing::debug!(bucket = %self.name, key = %key, "Uploaded object to GCS");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), ObjectStoreError> {
        let token = self.tokens.token(&self.client).await?;

        let resp = self
            .client
            .delete(self.object_url(key))
            .bearer_auth(&token)
            .send()
            .await
            .map_err(|e| ObjectStoreError::Backend(e.to_string()))?;
        ensure_success(resp, key, "delete").await?;

        tracing::debug!(bucket = %self.name, key = %key, "Deleted object from GCS");
        Ok(())
    }
}

async fn ensure_success(
    resp: Response,
    key: &str,
    operation: &str,
) -> Result<Response, ObjectStoreError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    if status == StatusCode::NOT_FOUND {
        return Err(ObjectStoreError::NotFound(key.to_string()));
    }
    let body = resp.text().await.unwrap_or_default();
    Err(ObjectStoreError::Backend(format!(
        "GCS {operation} failed ({status}): {body}"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object_store::PredefinedAcl;

    fn client(endpoint: Option<&str>) -> GcsClient {
        GcsClient::new(
            "my-project",
            Some(PathBuf::from("/nonexistent/key.json")),
            None,
            endpoint,
        )
        .unwrap()
    }

    #[test]
    fn test_requires_some_credentials() {
        let result = GcsClient::new("my-project", None, None, None);
        assert!(matches!(result, Err(ObjectStoreError::Auth(_))));
    }

    #[test]
    fn test_bucket_handle_keeps_name_and_project() {
        let client = client(None);
        assert_eq!(client.project_id(), "my-project");
        assert_eq!(client.bucket("uploads").name(), "uploads");
    }

    #[test]
    fn test_object_url_encodes_key() {
        let bucket = client(None).bucket("uploads");
        assert_eq!(
            bucket.object_url("images/a b.png"),
            "https://storage.googleapis.com/storage/v1/b/uploads/o/images%2Fa%20b.png"
        );
    }

    #[test]
    fn test_resumable_url_carries_acl() {
        let bucket = client(Some("http://localhost:4443/")).bucket("uploads");
        let options = WriteOptions {
            predefined_acl: PredefinedAcl::PublicRead,
            ..Default::default()
        };
        assert_eq!(
            bucket.resumable_url(&options),
            "http://localhost:4443/upload/storage/v1/b/uploads/o?uploadType=resumable&predefinedAcl=publicRead"
        );
    }
}
