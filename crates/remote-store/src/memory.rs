//! In-process object store with S3 listing and error semantics.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use sha2::{Digest, Sha256};
use url::Url;

use crate::client::ObjectStoreClient;
use crate::error::{ErrorCode, RemoteError, Result};
use crate::types::{
    Acl, CopyRequest, ListPage, ListRequest, MetadataDirective, ObjectHead, PutRequest,
};

/// Scheme of the URLs handed out by [`MemoryClient::presigned_get_url`].
pub const MEMORY_URL_SCHEME: &str = "memory";

/// An object held by [`MemoryClient`].
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub body: Bytes,
    pub content_type: Option<String>,
    pub content_disposition: Option<String>,
    pub acl: Acl,
    pub metadata: HashMap<String, String>,
    pub etag: String,
    pub last_modified: DateTime<Utc>,
    pub encrypted: bool,
}

type Bucket = BTreeMap<String, StoredObject>;

/// In-memory [`ObjectStoreClient`].
///
/// Every trait call counts as one request, and a queued error is returned by
/// the next call instead of touching the store.
#[derive(Debug, Default)]
pub struct MemoryClient {
    buckets: RwLock<BTreeMap<String, Bucket>>,
    requests: AtomicUsize,
    injected: Mutex<Vec<RemoteError>>,
}

impl MemoryClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// A client with the given buckets already created.
    pub fn with_buckets<I, S>(buckets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let client = Self::new();
        {
            let mut map = client.buckets.write();
            for bucket in buckets {
                map.insert(bucket.into(), Bucket::new());
            }
        }
        client
    }

    /// Number of trait calls served so far.
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    /// Make the next call fail with `code`.
    pub fn fail_next(&self, code: ErrorCode, message: impl Into<String>) {
        self.injected.lock().push(RemoteError::new(code, message));
    }

    /// Inspect an object without counting a request.
    pub fn object(&self, bucket: &str, key: &str) -> Option<StoredObject> {
        self.buckets.read().get(bucket)?.get(key).cloned()
    }

    /// Sorted keys of a bucket, without counting a request.
    pub fn keys(&self, bucket: &str) -> Vec<String> {
        self.buckets
            .read()
            .get(bucket)
            .map(|objects| objects.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Resolve a URL produced by [`MemoryClient::presigned_get_url`].
    pub fn read_url(&self, url: &Url) -> Result<Bytes> {
        if url.scheme() != MEMORY_URL_SCHEME {
            return Err(RemoteError::transport(format!(
                "unsupported url scheme: {}",
                url.scheme()
            )));
        }
        let bucket = url
            .host_str()
            .ok_or_else(|| RemoteError::transport("url has no bucket"))?;
        let key = url
            .query_pairs()
            .find(|(name, _)| name == "key")
            .map(|(_, value)| value.into_owned())
            .ok_or_else(|| RemoteError::transport("url has no key"))?;
        self.object(bucket, &key)
            .map(|object| object.body)
            .ok_or_else(|| RemoteError::no_such_key(bucket, &key))
    }

    fn begin(&self) -> Result<()> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let mut injected = self.injected.lock();
        if injected.is_empty() {
            Ok(())
        } else {
            Err(injected.remove(0))
        }
    }

    fn etag(body: &[u8]) -> String {
        let digest = Sha256::digest(body);
        format!("\"{}\"", hex::encode(&digest[..16]))
    }
}

#[async_trait]
impl ObjectStoreClient for MemoryClient {
    fn name(&self) -> &str {
        "memory"
    }

    async fn bucket_exists(&self, bucket: &str) -> Result<bool> {
        self.begin()?;
        Ok(self.buckets.read().contains_key(bucket))
    }

    async fn create_bucket(&self, bucket: &str) -> Result<()> {
        self.begin()?;
        let mut buckets = self.buckets.write();
        if buckets.contains_key(bucket) {
            return Err(RemoteError::new(
                ErrorCode::BucketAlreadyExists,
                format!("bucket already exists: {}", bucket),
            ));
        }
        buckets.insert(bucket.to_string(), Bucket::new());
        Ok(())
    }

    async fn put_object(&self, request: PutRequest) -> Result<()> {
        self.begin()?;
        let mut buckets = self.buckets.write();
        let objects = buckets
            .get_mut(&request.bucket)
            .ok_or_else(|| RemoteError::no_such_bucket(&request.bucket))?;
        let object = StoredObject {
            etag: Self::etag(&request.body),
            body: request.body,
            content_type: request.content_type,
            content_disposition: request.content_disposition,
            acl: request.acl,
            metadata: request.metadata,
            last_modified: Utc::now(),
            encrypted: request.server_side_encryption,
        };
        objects.insert(request.key, object);
        Ok(())
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Bytes> {
        self.begin()?;
        let buckets = self.buckets.read();
        let objects = buckets
            .get(bucket)
            .ok_or_else(|| RemoteError::no_such_bucket(bucket))?;
        objects
            .get(key)
            .map(|object| object.body.clone())
            .ok_or_else(|| RemoteError::no_such_key(bucket, key))
    }

    async fn head_object(&self, bucket: &str, key: &str) -> Result<ObjectHead> {
        self.begin()?;
        let buckets = self.buckets.read();
        let objects = buckets
            .get(bucket)
            .ok_or_else(|| RemoteError::no_such_bucket(bucket))?;
        let object = objects
            .get(key)
            .ok_or_else(|| RemoteError::new(ErrorCode::NotFound, "Not Found"))?;
        Ok(ObjectHead {
            size: object.body.len() as u64,
            last_modified: object.last_modified,
            etag: Some(object.etag.clone()),
            content_type: object.content_type.clone(),
            metadata: object.metadata.clone(),
        })
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<()> {
        self.begin()?;
        let mut buckets = self.buckets.write();
        let objects = buckets
            .get_mut(bucket)
            .ok_or_else(|| RemoteError::no_such_bucket(bucket))?;
        objects
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| RemoteError::no_such_key(bucket, key))
    }

    async fn copy_object(&self, request: CopyRequest) -> Result<()> {
        self.begin()?;
        let mut buckets = self.buckets.write();
        let source = buckets
            .get(&request.src_bucket)
            .ok_or_else(|| RemoteError::no_such_bucket(&request.src_bucket))?
            .get(&request.src_key)
            .cloned()
            .ok_or_else(|| RemoteError::no_such_key(&request.src_bucket, &request.src_key))?;

        if let Some(expected) = &request.if_match {
            if expected.trim_matches('"') != source.etag.trim_matches('"') {
                return Err(RemoteError::new(
                    ErrorCode::PreconditionFailed,
                    "At least one of the pre-conditions you specified did not hold",
                ));
            }
        }
        if let Some(since) = request.if_modified_since {
            if source.last_modified <= since {
                return Err(RemoteError::new(
                    ErrorCode::PreconditionFailed,
                    "The source object was not modified since the given time",
                ));
            }
        }

        let objects = buckets
            .get_mut(&request.dst_bucket)
            .ok_or_else(|| RemoteError::no_such_bucket(&request.dst_bucket))?;
        let metadata = match request.metadata_directive {
            MetadataDirective::Copy => source.metadata,
            MetadataDirective::Replace => request.metadata,
        };
        let copy = StoredObject {
            acl: request.acl,
            metadata,
            last_modified: Utc::now(),
            encrypted: request.server_side_encryption,
            ..source
        };
        objects.insert(request.dst_key, copy);
        Ok(())
    }

    async fn list_objects(&self, request: &ListRequest) -> Result<ListPage> {
        self.begin()?;
        let buckets = self.buckets.read();
        let objects = buckets
            .get(&request.bucket)
            .ok_or_else(|| RemoteError::no_such_bucket(&request.bucket))?;
        Ok(ListPage::from_sorted_keys(
            objects.keys().map(String::as_str),
            request,
        ))
    }

    async fn presigned_get_url(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> Result<Url> {
        self.begin()?;
        if !self.buckets.read().contains_key(bucket) {
            return Err(RemoteError::no_such_bucket(bucket));
        }
        let mut url = Url::parse(&format!("{}://{}/object", MEMORY_URL_SCHEME, bucket))
            .map_err(|e| RemoteError::transport(e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("key", key)
            .append_pair("X-Amz-Expires", &expires_in.as_secs().to_string());
        Ok(url)
    }
}
