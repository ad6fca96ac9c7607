//! Shared test helpers for gcs-upload-storage integration tests.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::http::request::Parts;
use bytes::Bytes;
use futures::StreamExt;
use gcs_upload_storage::object_store::ByteStream;
use gcs_upload_storage::{
    EnvDefaults, FileInfo, FileUpload, ObjectStore, ObjectStoreError, StorageOptions,
    WriteOptions,
};

/// A single write seen by [`RecordingStore`].
#[derive(Debug, Clone)]
pub struct RecordedWrite {
    pub key: String,
    pub options: WriteOptions,
    pub data: Vec<u8>,
}

/// In-memory bucket that remembers every write and delete. Deletes of keys
/// never written fail with `NotFound`.
#[derive(Default)]
pub struct RecordingStore {
    pub writes: Mutex<Vec<RecordedWrite>>,
    pub deletes: Mutex<Vec<String>>,
}

impl RecordingStore {
    pub fn writes(&self) -> Vec<RecordedWrite> {
        self.writes.lock().unwrap().clone()
    }

    pub fn deletes(&self) -> Vec<String> {
        self.deletes.lock().unwrap().clone()
    }
}

#[async_trait]
impl ObjectStore for RecordingStore {
    async fn write(
        &self,
        key: &str,
        options: &WriteOptions,
        mut body: ByteStream,
    ) -> Result<(), ObjectStoreError> {
        let mut data = Vec::new();
        while let Some(chunk) = body.next().await {
            data.extend_from_slice(&chunk?);
        }
        self.writes.lock().unwrap().push(RecordedWrite {
            key: key.to_string(),
            options: options.clone(),
            data,
        });
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), ObjectStoreError> {
        self.deletes.lock().unwrap().push(key.to_string());
        let written = self.writes.lock().unwrap().iter().any(|w| w.key == key);
        if written {
            Ok(())
        } else {
            Err(ObjectStoreError::NotFound(key.to_string()))
        }
    }
}

/// Bucket whose writes and deletes always fail with a backend error.
#[derive(Default)]
pub struct FailingStore {
    pub write_attempts: Mutex<usize>,
}

#[async_trait]
impl ObjectStore for FailingStore {
    async fn write(
        &self,
        _key: &str,
        _options: &WriteOptions,
        _body: ByteStream,
    ) -> Result<(), ObjectStoreError> {
        *self.write_attempts.lock().unwrap() += 1;
        Err(ObjectStoreError::Backend("connection reset".to_string()))
    }

    async fn delete(&self, _key: &str) -> Result<(), ObjectStoreError> {
        Err(ObjectStoreError::Backend("permission denied".to_string()))
    }
}

/// Options that pass validation without touching the environment.
pub fn valid_options(bucket: &str) -> StorageOptions {
    StorageOptions::new(bucket)
        .project_id("test-project")
        .key_filename("/keys/test.json")
}

pub fn no_env() -> EnvDefaults {
    EnvDefaults::default()
}

pub fn parts() -> Parts {
    axum::http::Request::builder()
        .method("POST")
        .uri("/files")
        .body(())
        .unwrap()
        .into_parts()
        .0
}

pub fn file_info(original_name: &str) -> FileInfo {
    FileInfo {
        field_name: "file".to_string(),
        original_name: original_name.to_string(),
        encoding: "7bit".to_string(),
        mime_type: "application/octet-stream".to_string(),
    }
}

pub fn upload(original_name: &str, chunks: &[&'static [u8]]) -> FileUpload {
    let chunks: Vec<std::io::Result<Bytes>> = chunks
        .iter()
        .map(|c| Ok(Bytes::from_static(*c)))
        .collect();
    FileUpload {
        info: file_info(original_name),
        stream: Box::pin(futures::stream::iter(chunks)),
    }
}

pub fn recording() -> Arc<RecordingStore> {
    Arc::new(RecordingStore::default())
}
