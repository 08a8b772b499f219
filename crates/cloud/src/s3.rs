//! Amazon S3 backend.

use std::time::Duration;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;

use crate::error::StorageError;
use crate::ObjectStore;

/// Default region when `AWS_REGION` is not set.
pub const DEFAULT_REGION: &str = "ap-northeast-1";

/// [`ObjectStore`] writing to a single S3 bucket.
///
/// Credentials come from the standard AWS provider chain (environment,
/// profile, instance metadata).
#[derive(Debug, Clone)]
pub struct S3ObjectStore {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3ObjectStore {
    /// Load AWS configuration for `region` and build a client.
    pub async fn connect(bucket: String, region: String) -> Self {
        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region))
            .load()
            .await;
        Self::with_client(aws_sdk_s3::Client::new(&config), bucket)
    }

    pub fn with_client(client: aws_sdk_s3::Client, bucket: String) -> Self {
        Self { client, bucket }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put_object(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| StorageError::Upload {
                key: key.to_string(),
                message: DisplayErrorContext(&e).to_string(),
            })?;

        tracing::debug!(bucket = %self.bucket, key, "S3 put_object succeeded");
        Ok(())
    }

    async fn presign_get(&self, key: &str, expires_in: Duration) -> Result<String, StorageError> {
        let presign_error = |message: String| StorageError::Presign {
            key: key.to_string(),
            message,
        };

        let config = PresigningConfig::expires_in(expires_in)
            .map_err(|e| presign_error(e.to_string()))?;

        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(config)
            .await
            .map_err(|e| presign_error(DisplayErrorContext(&e).to_string()))?;

        Ok(request.uri().to_string())
    }
}
