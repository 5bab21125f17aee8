//! Blob storage for document bytes. Metadata lives in redb; a blob is
//! meaningless without its `DocumentRecord`.

mod gcs;
mod local;

pub use gcs::GcsStore;
pub use local::LocalStore;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ObjectStoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Object not found: {0}")]
    NotFound(String),
    #[error("Invalid object key: {0:?}")]
    InvalidKey(String),
    #[error("Backend error: {0}")]
    Backend(String),
}

/// Abstraction over object storage backends. Keys are document ids.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, key: &str, data: Bytes) -> Result<(), ObjectStoreError>;
    async fn get(&self, key: &str) -> Result<Bytes, ObjectStoreError>;
    /// Deleting a missing object is not an error.
    async fn delete(&self, key: &str) -> Result<(), ObjectStoreError>;
    async fn exists(&self, key: &str) -> Result<bool, ObjectStoreError>;
}

/// Keys must be plain ids: ASCII letters, digits and `-`.
pub(crate) fn validate_key(key: &str) -> Result<(), ObjectStoreError> {
    if key.is_empty() || !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(ObjectStoreError::InvalidKey(key.to_string()));
    }
    Ok(())
}
