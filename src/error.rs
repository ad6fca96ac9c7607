use thiserror::Error;

use crate::object_store::ObjectStoreError;

/// Error type user-supplied resolvers report.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failure of a single upload or removal.
#[derive(Debug, Error)]
pub enum StorageError {
    /// A filename or destination resolver refused the file. The resolver's
    /// error is kept as-is.
    #[error("{0}")]
    Resolver(BoxError),
    #[error(transparent)]
    ObjectStore(#[from] ObjectStoreError),
}
