use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use tokio_util::io::StreamReader;

use super::{ByteStream, ObjectStore, ObjectStoreError, WriteOptions};

/// Local filesystem bucket for development and testing. Object metadata and
/// ACLs are accepted and ignored.
pub struct LocalStore {
    base_path: PathBuf,
}

impl LocalStore {
    pub fn new<P: AsRef<Path>>(base_path: P) -> Result<Self, std::io::Error> {
        let base_path = base_path.as_ref().to_path_buf();
        std::fs::create_dir_all(&base_path)?;
        Ok(Self { base_path })
    }

    /// Map `key` to a file beneath the base directory. Returns `None` for keys
    /// that would resolve outside it or name no file at all.
    fn object_path(&self, key: &str) -> Option<PathBuf> {
        let relative = Path::new(key.trim_start_matches('/'));

        let mut has_name = false;
        for component in relative.components() {
            match component {
                Component::Normal(_) => has_name = true,
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
            }
        }

        has_name.then(|| self.base_path.join(relative))
    }
}

#[async_trait]
impl ObjectStore for LocalStore {
    async fn write(
        &self,
        key: &str,
        _options: &WriteOptions,
        body: ByteStream,
    ) -> Result<(), ObjectStoreError> {
        let path = self
            .object_path(key)
            .ok_or_else(|| ObjectStoreError::Backend(format!("Invalid object key: {key}")))?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut reader = StreamReader::new(body);
        let mut file = tokio::fs::File::create(&path).await?;
        tokio::io::copy(&mut reader, &mut file).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), ObjectStoreError> {
        let path = self
            .object_path(key)
            .ok_or_else(|| ObjectStoreError::NotFound(key.to_string()))?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(ObjectStoreError::NotFound(key.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}
