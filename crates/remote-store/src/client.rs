//! The object store client capability.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use url::Url;

use crate::error::{ErrorCode, RemoteError, Result};
use crate::types::{CopyRequest, ListPage, ListRequest, ObjectHead, PutRequest};

/// Polling parameters for [`ObjectStoreClient::wait_until_bucket_exists`].
const BUCKET_WAIT_ATTEMPTS: u32 = 20;
const BUCKET_WAIT_INTERVAL: Duration = Duration::from_millis(500);

/// Logical operations against a flat bucket/key object store.
///
/// Implementations report failures as [`RemoteError`] carrying the provider's
/// error code; they do not retry beyond what their transport does.
///
/// Missing objects are reported as `NoSuchKey` by `get_object`,
/// `delete_object` and `copy_object` (for the source), and as `NotFound`
/// by `head_object`. Missing buckets are `NoSuchBucket` everywhere.
#[async_trait]
pub trait ObjectStoreClient: Send + Sync + std::fmt::Debug {
    /// Short backend name used in logs and status messages.
    fn name(&self) -> &str;

    async fn bucket_exists(&self, bucket: &str) -> Result<bool>;

    async fn create_bucket(&self, bucket: &str) -> Result<()>;

    /// Block until `bucket` is visible, polling [`Self::bucket_exists`].
    async fn wait_until_bucket_exists(&self, bucket: &str) -> Result<()> {
        for attempt in 0..BUCKET_WAIT_ATTEMPTS {
            if self.bucket_exists(bucket).await? {
                return Ok(());
            }
            tracing::debug!(bucket, attempt, "bucket not visible yet");
            tokio::time::sleep(BUCKET_WAIT_INTERVAL).await;
        }
        Err(RemoteError::new(
            ErrorCode::NoSuchBucket,
            format!("bucket {} did not appear after creation", bucket),
        ))
    }

    async fn put_object(&self, request: PutRequest) -> Result<()>;

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Bytes>;

    async fn head_object(&self, bucket: &str, key: &str) -> Result<ObjectHead>;

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<()>;

    async fn copy_object(&self, request: CopyRequest) -> Result<()>;

    /// Fetch one page of a prefix/delimiter listing.
    async fn list_objects(&self, request: &ListRequest) -> Result<ListPage>;

    /// A URL granting GET access to the object until `expires_in` elapses.
    async fn presigned_get_url(&self, bucket: &str, key: &str, expires_in: Duration)
        -> Result<Url>;
}
