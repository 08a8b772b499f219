//! Object storage for published illustrations.
//!
//! [`ObjectStore`] is the seam used by the document sync engine: upload
//! bytes under a content-addressed key and hand back a time-limited URL.
//! [`S3ObjectStore`] talks to Amazon S3; [`MemoryObjectStore`] keeps
//! objects in process for tests and dry runs.

pub mod error;
pub mod key;
pub mod memory;
pub mod s3;

use std::time::Duration;

use async_trait::async_trait;

pub use error::StorageError;
pub use memory::MemoryObjectStore;
pub use s3::S3ObjectStore;

/// Default lifetime of presigned download URLs.
pub const DEFAULT_URL_EXPIRY: Duration = Duration::from_secs(3600);

/// Result of [`ObjectStore::upload`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedObject {
    pub key: String,
    pub url: String,
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `bytes` under `key`, overwriting any existing object.
    async fn put_object(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError>;

    /// Time-limited download URL for an existing object.
    async fn presign_get(&self, key: &str, expires_in: Duration) -> Result<String, StorageError>;

    /// Upload under a content-addressed key below `prefix` and return the
    /// key together with a presigned URL.
    async fn upload(
        &self,
        prefix: &str,
        bytes: Vec<u8>,
        content_type: &str,
        extension: &str,
        expires_in: Duration,
    ) -> Result<UploadedObject, StorageError> {
        let key = key::object_key(prefix, chrono::Utc::now(), &bytes, extension);
        let size = bytes.len();

        self.put_object(&key, bytes, content_type).await?;
        let url = self.presign_get(&key, expires_in).await?;

        tracing::info!(key = %key, bytes = size, content_type, "Object uploaded");
        Ok(UploadedObject { key, url })
    }
}
