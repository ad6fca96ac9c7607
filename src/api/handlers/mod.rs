mod admin;
mod files;

use crate::api::response::ApiError;
use crate::error::StorageError;
use crate::object_store::ObjectStoreError;

pub use admin::health;
pub use files::{delete_file, upload_files};

/// Map a StorageError to an ApiError
fn storage_error(e: StorageError) -> ApiError {
    match e {
        StorageError::Resolver(e) => ApiError::bad_request(format!("Upload rejected: {e}")),
        StorageError::ObjectStore(ObjectStoreError::NotFound(key)) => {
            ApiError::not_found(format!("Object not found: {key}"))
        }
        StorageError::ObjectStore(e) => ApiError::internal(format!("Storage failure: {e}")),
    }
}
