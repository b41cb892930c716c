//! Single-object operations against the remote store.
//!
//! Every mutation resolves its addresses before touching the network, and on
//! success drops the local copy of the path it wrote or removed.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use remote_store::{CopyRequest, MetadataDirective, ObjectStoreClient, PutRequest};
use tracing::{debug, info, warn};
use url::Url;

use crate::classify::{internal_failure, report_query_failure, Failure};
use crate::hash::{sha1_base36, sha1_base36_file, SHA1_METADATA_KEY};
use crate::local_cache::LocalCacheStore;
use crate::path::StoragePath;
use crate::resolver::PathResolver;
use crate::status::{Fatal, Status};
use crate::upload::{content_type_for_bytes, content_type_for_file, ObjectHeaders, UploadSource};
use crate::zones::SecurityZones;

/// Lifetime of presigned URLs handed out without an explicit TTL.
pub const DEFAULT_URL_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Attributes of a stored file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStat {
    pub mtime: DateTime<Utc>,
    pub size: u64,
    pub etag: Option<String>,
    pub sha1: Option<String>,
    pub content_type: Option<String>,
}

/// Which write produced an upload, for status reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriteKind {
    Create,
    Store,
}

#[derive(Debug)]
pub struct ObjectOps {
    client: Arc<dyn ObjectStoreClient>,
    resolver: PathResolver,
    zones: Arc<SecurityZones>,
    backend: String,
    encryption: bool,
    cache: Option<Arc<dyn LocalCacheStore>>,
}

impl ObjectOps {
    pub fn new(
        client: Arc<dyn ObjectStoreClient>,
        resolver: PathResolver,
        zones: Arc<SecurityZones>,
        backend: impl Into<String>,
        encryption: bool,
    ) -> Self {
        Self {
            client,
            resolver,
            zones,
            backend: backend.into(),
            encryption,
            cache: None,
        }
    }

    /// Invalidate entries in `cache` on every successful mutation.
    pub fn with_cache(mut self, cache: Arc<dyn LocalCacheStore>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn client(&self) -> &Arc<dyn ObjectStoreClient> {
        &self.client
    }

    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    pub fn zones(&self) -> &SecurityZones {
        &self.zones
    }

    pub fn backend(&self) -> &str {
        &self.backend
    }

    pub async fn create(
        &self,
        path: &StoragePath,
        source: UploadSource,
        headers: &ObjectHeaders,
    ) -> Status {
        self.upload(WriteKind::Create, path, source, headers).await
    }

    /// Upload a local file.
    pub async fn store(&self, path: &StoragePath, local: &Path, headers: &ObjectHeaders) -> Status {
        self.upload(
            WriteKind::Store,
            path,
            UploadSource::File(local.to_path_buf()),
            headers,
        )
        .await
    }

    async fn upload(
        &self,
        kind: WriteKind,
        path: &StoragePath,
        source: UploadSource,
        headers: &ObjectHeaders,
    ) -> Status {
        let Some(address) = self.resolver.resolve(path) else {
            return Status::invalid_path(path);
        };
        let destination = path.file_name().unwrap_or_default();

        let (body, sha1, inferred) = match &source {
            UploadSource::Bytes(body) => (
                body.clone(),
                sha1_base36(body),
                content_type_for_bytes(body, destination),
            ),
            UploadSource::File(local) => match read_local(local).await {
                Ok((body, sha1)) => (body, sha1, content_type_for_file(local, destination)),
                Err(err) => {
                    warn!(
                        path = %path,
                        source = %local.display(),
                        error = %err,
                        "failed to read upload source"
                    );
                    return Status::fatal(Fatal::ReadFailed {
                        path: local.display().to_string(),
                    });
                }
            },
        };

        let request = PutRequest {
            bucket: address.bucket,
            key: address.key,
            body,
            content_type: Some(headers.content_type.clone().unwrap_or(inferred)),
            content_disposition: headers.content_disposition.clone(),
            acl: self.zones.acl_for(path.container()).await,
            metadata: HashMap::from([(SHA1_METADATA_KEY.to_string(), sha1)]),
            server_side_encryption: self.encryption,
        };
        let acl = request.acl;
        let size = request.body.len();

        if let Err(err) = self.client.put_object(request).await {
            let op = match kind {
                WriteKind::Create => "create",
                WriteKind::Store => "store",
            };
            return match (Failure::of(&err), kind) {
                (Failure::MissingBucket, WriteKind::Create) => {
                    Status::fatal(Fatal::CreateFailed {
                        path: path.to_string(),
                    })
                }
                (Failure::MissingBucket, WriteKind::Store) => Status::fatal(Fatal::StoreFailed {
                    source: source.describe(),
                    path: path.to_string(),
                }),
                _ => internal_failure(&self.backend, op, &path.to_string(), &err),
            };
        }

        info!(path = %path, size, acl = acl.as_str(), "object written");
        self.invalidate(path).await;
        Status::ok()
    }

    pub async fn copy(
        &self,
        src: &StoragePath,
        dst: &StoragePath,
        headers: &ObjectHeaders,
        ignore_missing_source: bool,
    ) -> Status {
        let resolved = (self.resolver.resolve(src), self.resolver.resolve(dst));
        let (src_address, dst_address) = match resolved {
            (Some(s), Some(d)) => (s, d),
            (s, d) => {
                let mut status = Status::ok();
                if s.is_none() {
                    status.push_fatal(Fatal::InvalidPath {
                        path: src.to_string(),
                    });
                }
                if d.is_none() {
                    status.push_fatal(Fatal::InvalidPath {
                        path: dst.to_string(),
                    });
                }
                return status;
            }
        };

        let request = CopyRequest {
            src_bucket: src_address.bucket,
            src_key: src_address.key,
            dst_bucket: dst_address.bucket,
            dst_key: dst_address.key,
            acl: self.zones.acl_for(dst.container()).await,
            metadata_directive: MetadataDirective::Copy,
            metadata: HashMap::new(),
            if_match: headers.if_match.clone(),
            if_modified_since: headers.if_modified_since,
            server_side_encryption: self.encryption,
        };

        if let Err(err) = self.client.copy_object(request).await {
            let copy_failed = || {
                Status::fatal(Fatal::CopyFailed {
                    src: src.to_string(),
                    dst: dst.to_string(),
                })
            };
            return match Failure::of(&err) {
                Failure::MissingBucket => copy_failed(),
                Failure::MissingObject if ignore_missing_source => {
                    debug!(src = %src, dst = %dst, "copy source missing, ignored");
                    Status::ok()
                }
                Failure::MissingObject => copy_failed(),
                Failure::Other => {
                    internal_failure(&self.backend, "copy", &format!("{} -> {}", src, dst), &err)
                }
            };
        }

        info!(src = %src, dst = %dst, "object copied");
        self.invalidate(dst).await;
        Status::ok()
    }

    pub async fn delete(&self, path: &StoragePath, ignore_missing_source: bool) -> Status {
        let Some(address) = self.resolver.resolve(path) else {
            return Status::invalid_path(path);
        };

        if let Err(err) = self.client.delete_object(&address.bucket, &address.key).await {
            let delete_failed = || {
                Status::fatal(Fatal::DeleteFailed {
                    path: path.to_string(),
                })
            };
            match Failure::of(&err) {
                Failure::MissingBucket => return delete_failed(),
                Failure::MissingObject if ignore_missing_source => {
                    debug!(path = %path, "delete of missing object ignored");
                }
                Failure::MissingObject => return delete_failed(),
                Failure::Other => {
                    return internal_failure(&self.backend, "delete", &path.to_string(), &err)
                }
            }
        } else {
            info!(path = %path, "object deleted");
        }

        self.invalidate(path).await;
        Status::ok()
    }

    /// Best-effort stat; `None` when the object is absent or the call failed.
    pub async fn stat(&self, path: &StoragePath) -> Option<FileStat> {
        let address = self.resolver.resolve(path)?;
        match self.client.head_object(&address.bucket, &address.key).await {
            Ok(head) => Some(FileStat {
                mtime: head.last_modified,
                size: head.size,
                etag: head.etag,
                sha1: head.metadata.get(SHA1_METADATA_KEY).cloned(),
                content_type: head.content_type,
            }),
            Err(err) if Failure::of(&err) == Failure::MissingObject => None,
            Err(err) => {
                report_query_failure(&self.backend, "stat", &path.to_string(), &err);
                None
            }
        }
    }

    pub async fn presigned_url(&self, path: &StoragePath, ttl: Duration) -> Option<Url> {
        let address = self.resolver.resolve(path)?;
        match self
            .client
            .presigned_get_url(&address.bucket, &address.key, ttl)
            .await
        {
            Ok(url) => Some(url),
            Err(err) => {
                warn!(path = %path, error = %err, "failed to presign url");
                None
            }
        }
    }

    /// Whether the bucket behind `path` exists.
    pub async fn bucket_exists(&self, path: &StoragePath) -> bool {
        let Some(address) = self.resolver.resolve(path) else {
            return false;
        };
        match self.client.bucket_exists(&address.bucket).await {
            Ok(exists) => exists,
            Err(err) => {
                warn!(bucket = %address.bucket, error = %err, "bucket check failed");
                false
            }
        }
    }

    async fn invalidate(&self, path: &StoragePath) {
        if let Some(cache) = &self.cache {
            cache.invalidate(path).await;
        }
    }
}

/// Read a local upload source and hash it.
async fn read_local(local: &Path) -> std::io::Result<(Bytes, String)> {
    let sha1 = sha1_base36_file(local).await?;
    let body = tokio::fs::read(local).await?;
    Ok((Bytes::from(body), sha1))
}

#[cfg(test)]
mod tests {
    use remote_store::{Acl, MemoryClient};

    use super::*;
    use crate::registry::ContainerRegistry;

    fn ops() -> (Arc<MemoryClient>, ObjectOps) {
        let client = Arc::new(MemoryClient::with_buckets(["wiki"]));
        let containers = HashMap::from([
            ("public".to_string(), "wiki/public".to_string()),
            ("ghost".to_string(), "gone".to_string()),
        ]);
        let resolver =
            PathResolver::new(Arc::new(ContainerRegistry::from_config(&containers).unwrap()));
        let zones = Arc::new(SecurityZones::new(
            client.clone(),
            resolver.clone(),
            "s3",
            false,
        ));
        let ops = ObjectOps::new(client.clone(), resolver, zones, "s3", true);
        (client, ops)
    }

    fn path(s: &str) -> StoragePath {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn test_create_attaches_hash_acl_and_encryption() {
        let (client, ops) = ops();
        let status = ops
            .create(&path("public/a.txt"), "hello".into(), &ObjectHeaders::default())
            .await;
        assert!(status.is_ok());

        let stored = client.object("wiki", "public/a.txt").unwrap();
        assert_eq!(stored.acl, Acl::PublicRead);
        assert!(stored.encrypted);
        assert_eq!(stored.content_type.as_deref(), Some("text/plain"));
        assert_eq!(stored.metadata[SHA1_METADATA_KEY], sha1_base36(b"hello"));
    }

    #[tokio::test]
    async fn test_explicit_content_type_wins() {
        let (client, ops) = ops();
        let headers = ObjectHeaders {
            content_type: Some("application/x-custom".to_string()),
            ..Default::default()
        };
        let _ = ops.create(&path("public/a.txt"), "hello".into(), &headers).await;
        let stored = client.object("wiki", "public/a.txt").unwrap();
        assert_eq!(stored.content_type.as_deref(), Some("application/x-custom"));
    }

    #[tokio::test]
    async fn test_missing_bucket_fatals() {
        let (_, ops) = ops();
        let status = ops
            .create(&path("ghost/a.txt"), "x".into(), &ObjectHeaders::default())
            .await;
        assert!(status.has("backend-fail-create"));

        let status = ops.delete(&path("ghost/a.txt"), true).await;
        assert!(status.has("backend-fail-delete"));
    }

    #[tokio::test]
    async fn test_store_unreadable_source() {
        let (client, ops) = ops();
        let before = client.request_count();
        let status = ops
            .store(
                &path("public/a.bin"),
                Path::new("/nonexistent/upload.bin"),
                &ObjectHeaders::default(),
            )
            .await;
        assert!(status.has("backend-fail-read"));
        assert_eq!(client.request_count(), before);
    }

    #[tokio::test]
    async fn test_copy_keeps_metadata() {
        let (client, ops) = ops();
        let _ = ops
            .create(&path("public/a.txt"), "hello".into(), &ObjectHeaders::default())
            .await;
        let status = ops
            .copy(
                &path("public/a.txt"),
                &path("public/b.txt"),
                &ObjectHeaders::default(),
                false,
            )
            .await;
        assert!(status.is_ok());
        let copied = client.object("wiki", "public/b.txt").unwrap();
        assert_eq!(copied.metadata[SHA1_METADATA_KEY], sha1_base36(b"hello"));
    }

    #[tokio::test]
    async fn test_copy_reports_both_invalid_paths() {
        let (client, ops) = ops();
        let before = client.request_count();
        let status = ops
            .copy(
                &path("nope/a.txt"),
                &path("other/b.txt"),
                &ObjectHeaders::default(),
                false,
            )
            .await;
        assert_eq!(status.fatals().len(), 2);
        assert_eq!(client.request_count(), before);
    }

    #[tokio::test]
    async fn test_stat() {
        let (client, ops) = ops();
        assert!(ops.stat(&path("public/a.txt")).await.is_none());
        let _ = ops
            .create(&path("public/a.txt"), "hello".into(), &ObjectHeaders::default())
            .await;
        let stat = ops.stat(&path("public/a.txt")).await.unwrap();
        assert_eq!(stat.size, 5);
        assert_eq!(stat.sha1.as_deref(), Some(sha1_base36(b"hello").as_str()));

        client.fail_next(remote_store::ErrorCode::AccessDenied, "access denied");
        assert!(ops.stat(&path("public/a.txt")).await.is_none());
    }

    #[tokio::test]
    async fn test_bucket_exists() {
        let (_, ops) = ops();
        assert!(ops.bucket_exists(&path("public/x")).await);
        assert!(!ops.bucket_exists(&path("ghost/x")).await);
        assert!(!ops.bucket_exists(&path("nope/x")).await);
    }
}
