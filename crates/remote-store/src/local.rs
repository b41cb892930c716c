//! Local filesystem object store, one directory per bucket.
//!
//! Object bodies are written through `object_store`'s `LocalFileSystem`.
//! Headers, ACL and user metadata have no place on a plain file, so they are
//! kept in a JSON sidecar under `<root>/.meta/<bucket>/<key>.json`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::TryStreamExt;
use object_store::local::LocalFileSystem;
use object_store::path::Path as ObjectPath;
use object_store::ObjectStore;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::client::ObjectStoreClient;
use crate::error::{ClientConfigError, ErrorCode, RemoteError, Result};
use crate::types::{
    Acl, CopyRequest, ListPage, ListRequest, MetadataDirective, ObjectHead, PutRequest,
};

const META_DIR: &str = ".meta";

/// What the sidecar remembers about an object.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Sidecar {
    acl: Acl,
    content_type: Option<String>,
    content_disposition: Option<String>,
    #[serde(default)]
    metadata: HashMap<String, String>,
}

/// [`ObjectStoreClient`] over a directory tree.
#[derive(Debug)]
pub struct LocalClient {
    root: PathBuf,
    stores: Mutex<HashMap<String, Arc<LocalFileSystem>>>,
}

impl LocalClient {
    pub fn new(root: impl Into<PathBuf>) -> std::result::Result<Self, ClientConfigError> {
        let root = root.into();
        std::fs::create_dir_all(root.join(META_DIR))
            .map_err(|e| ClientConfigError::Invalid(format!("{}: {}", root.display(), e)))?;
        Ok(Self {
            root,
            stores: Mutex::new(HashMap::new()),
        })
    }

    fn bucket_dir(&self, bucket: &str) -> Result<PathBuf> {
        if bucket.is_empty() || bucket.starts_with('.') || bucket.contains(['/', '\\']) {
            return Err(RemoteError::new(
                ErrorCode::Other("InvalidBucketName".into()),
                format!("invalid bucket name: {}", bucket),
            ));
        }
        Ok(self.root.join(bucket))
    }

    fn store(&self, bucket: &str) -> Result<Arc<LocalFileSystem>> {
        let dir = self.bucket_dir(bucket)?;
        let mut stores = self.stores.lock();
        if let Some(store) = stores.get(bucket) {
            return Ok(store.clone());
        }
        if !dir.is_dir() {
            return Err(RemoteError::no_such_bucket(bucket));
        }
        let store = Arc::new(LocalFileSystem::new_with_prefix(&dir)?);
        stores.insert(bucket.to_string(), store.clone());
        Ok(store)
    }

    fn sidecar_path(&self, bucket: &str, key: &str) -> PathBuf {
        self.root.join(META_DIR).join(bucket).join(format!("{}.json", key))
    }

    async fn read_sidecar(&self, bucket: &str, key: &str) -> Option<Sidecar> {
        let raw = tokio::fs::read(self.sidecar_path(bucket, key)).await.ok()?;
        serde_json::from_slice(&raw).ok()
    }

    async fn write_sidecar(&self, bucket: &str, key: &str, sidecar: &Sidecar) -> Result<()> {
        let path = self.sidecar_path(bucket, key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(io_error)?;
        }
        let raw = serde_json::to_vec(sidecar).map_err(|e| {
            RemoteError::new(ErrorCode::Other("InternalError".into()), e.to_string())
        })?;
        tokio::fs::write(path, raw).await.map_err(io_error)
    }

    async fn remove_sidecar(&self, bucket: &str, key: &str) {
        let _ = tokio::fs::remove_file(self.sidecar_path(bucket, key)).await;
    }

    /// Keys under the directory part of `prefix`, sorted.
    async fn sorted_keys(&self, bucket: &str, prefix: &str) -> Result<Vec<String>> {
        let store = self.store(bucket)?;
        let dir = prefix.rfind('/').map(|idx| &prefix[..idx]).unwrap_or("");
        let dir = (!dir.is_empty()).then(|| ObjectPath::from(dir));
        let mut keys: Vec<String> = store
            .list(dir.as_ref())
            .map_ok(|meta| meta.location.to_string())
            .try_collect()
            .await?;
        keys.sort();
        Ok(keys)
    }
}

fn io_error(err: std::io::Error) -> RemoteError {
    RemoteError::new(ErrorCode::Other("InternalError".into()), err.to_string())
}

fn object_path(key: &str) -> ObjectPath {
    ObjectPath::from(key)
}

#[async_trait]
impl ObjectStoreClient for LocalClient {
    fn name(&self) -> &str {
        "local"
    }

    async fn bucket_exists(&self, bucket: &str) -> Result<bool> {
        Ok(self.bucket_dir(bucket)?.is_dir())
    }

    async fn create_bucket(&self, bucket: &str) -> Result<()> {
        let dir = self.bucket_dir(bucket)?;
        if dir.is_dir() {
            return Err(RemoteError::new(
                ErrorCode::BucketAlreadyExists,
                format!("bucket already exists: {}", bucket),
            ));
        }
        tokio::fs::create_dir_all(&dir).await.map_err(io_error)
    }

    async fn put_object(&self, request: PutRequest) -> Result<()> {
        let store = self.store(&request.bucket)?;
        store
            .put(&object_path(&request.key), request.body.into())
            .await?;
        let sidecar = Sidecar {
            acl: request.acl,
            content_type: request.content_type,
            content_disposition: request.content_disposition,
            metadata: request.metadata,
        };
        self.write_sidecar(&request.bucket, &request.key, &sidecar)
            .await
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Bytes> {
        let store = self.store(bucket)?;
        let result = store.get(&object_path(key)).await?;
        Ok(result.bytes().await?)
    }

    async fn head_object(&self, bucket: &str, key: &str) -> Result<ObjectHead> {
        let store = self.store(bucket)?;
        let meta = match store.head(&object_path(key)).await {
            Ok(meta) => meta,
            Err(object_store::Error::NotFound { .. }) => {
                return Err(RemoteError::new(ErrorCode::NotFound, "Not Found"))
            }
            Err(e) => return Err(e.into()),
        };
        let sidecar = self.read_sidecar(bucket, key).await;
        Ok(ObjectHead {
            size: meta.size as u64,
            last_modified: meta.last_modified,
            etag: meta.e_tag,
            content_type: sidecar.as_ref().and_then(|s| s.content_type.clone()),
            metadata: sidecar.map(|s| s.metadata).unwrap_or_default(),
        })
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<()> {
        let store = self.store(bucket)?;
        store.delete(&object_path(key)).await?;
        self.remove_sidecar(bucket, key).await;
        Ok(())
    }

    async fn copy_object(&self, request: CopyRequest) -> Result<()> {
        let source = self.store(&request.src_bucket)?;
        let destination = self.store(&request.dst_bucket)?;
        let from = object_path(&request.src_key);
        let to = object_path(&request.dst_key);

        if request.if_match.is_some() || request.if_modified_since.is_some() {
            let head = self
                .head_object(&request.src_bucket, &request.src_key)
                .await
                .map_err(|e| {
                    if e.code.is_missing_object() {
                        RemoteError::no_such_key(&request.src_bucket, &request.src_key)
                    } else {
                        e
                    }
                })?;
            let etag_ok = request
                .if_match
                .as_deref()
                .map_or(true, |etag| head.etag.as_deref() == Some(etag));
            let since_ok = request
                .if_modified_since
                .map_or(true, |since| head.last_modified > since);
            if !etag_ok || !since_ok {
                return Err(RemoteError::new(
                    ErrorCode::PreconditionFailed,
                    "copy source precondition failed",
                ));
            }
        }

        if request.src_bucket == request.dst_bucket {
            destination.copy(&from, &to).await?;
        } else {
            let body = source.get(&from).await?.bytes().await?;
            destination.put(&to, body.into()).await?;
        }

        let mut sidecar = self
            .read_sidecar(&request.src_bucket, &request.src_key)
            .await
            .unwrap_or(Sidecar {
                acl: request.acl,
                content_type: None,
                content_disposition: None,
                metadata: HashMap::new(),
            });
        sidecar.acl = request.acl;
        if request.metadata_directive == MetadataDirective::Replace {
            sidecar.metadata = request.metadata;
        }
        self.write_sidecar(&request.dst_bucket, &request.dst_key, &sidecar)
            .await
    }

    async fn list_objects(&self, request: &ListRequest) -> Result<ListPage> {
        let keys = self.sorted_keys(&request.bucket, &request.prefix).await?;
        Ok(ListPage::from_sorted_keys(
            keys.iter().map(String::as_str),
            request,
        ))
    }

    async fn presigned_get_url(
        &self,
        bucket: &str,
        key: &str,
        _expires_in: Duration,
    ) -> Result<Url> {
        let store = self.store(bucket)?;
        let path: PathBuf = store.path_to_filesystem(&object_path(key))?;
        file_url(&path)
    }
}

fn file_url(path: &Path) -> Result<Url> {
    Url::from_file_path(path)
        .map_err(|_| RemoteError::transport(format!("not an absolute path: {}", path.display())))
}
