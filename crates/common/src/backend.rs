//! The file backend capability and its object-store implementation.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::BoxStream;
use remote_store::{ErrorCode, ObjectStoreClient};
use tracing::info;
use url::Url;

use crate::classify::internal_failure;
use crate::config::{BackendConfig, ConfigError};
use crate::executor::{FileStat, ObjectOps, DEFAULT_URL_TTL};
use crate::listing::Listing;
use crate::local_cache::{
    Fetcher, FsCacheStore, HttpFetcher, LocalCacheStore, LocalCopies, LocalFile, MinSizeRetention,
};
use crate::path::StoragePath;
use crate::registry::ContainerRegistry;
use crate::resolver::PathResolver;
use crate::status::{Fatal, Status};
use crate::upload::{ObjectHeaders, UploadSource};
use crate::zones::SecurityZones;

/// Container preparation flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrepareOptions {
    /// Make the container publicly readable
    pub access: bool,
    /// Restrict the container to private access
    pub no_access: bool,
}

/// Hierarchical file storage as seen by the host application.
///
/// Mutations report a [`Status`]; queries answer `None`, `false` or an empty
/// stream on failure. Nothing here returns an error.
#[async_trait]
pub trait FileBackend: Send + Sync {
    fn name(&self) -> &str;

    async fn create(&self, path: &StoragePath, source: UploadSource, headers: &ObjectHeaders)
        -> Status;

    async fn store(&self, path: &StoragePath, local: &Path, headers: &ObjectHeaders) -> Status;

    async fn copy(
        &self,
        src: &StoragePath,
        dst: &StoragePath,
        headers: &ObjectHeaders,
        ignore_missing_source: bool,
    ) -> Status;

    async fn delete(&self, path: &StoragePath, ignore_missing_source: bool) -> Status;

    async fn stat(&self, path: &StoragePath) -> Option<FileStat>;

    async fn directory_exists(&self, dir: &StoragePath) -> bool;

    fn list_files(&self, dir: &StoragePath, top_only: bool) -> Option<BoxStream<'static, String>>;

    fn list_directories(
        &self,
        dir: &StoragePath,
        top_only: bool,
    ) -> Option<BoxStream<'static, String>>;

    async fn prepare(&self, dir: &StoragePath, options: PrepareOptions) -> Status;

    async fn clean(&self, dir: &StoragePath) -> Status;

    async fn is_path_usable(&self, path: &StoragePath) -> bool;

    /// Presigned GET URL, valid for `ttl` (one day when unset).
    async fn get_http_url(&self, path: &StoragePath, ttl: Option<Duration>) -> Option<Url>;

    async fn get_local_copy(&self, path: &StoragePath) -> Option<LocalFile>;

    async fn get_local_copies(
        &self,
        paths: &[StoragePath],
        chunk_size: usize,
    ) -> HashMap<StoragePath, Option<LocalFile>>;
}

/// [`FileBackend`] over any [`ObjectStoreClient`].
#[derive(Debug)]
pub struct S3FileBackend {
    name: String,
    client: Arc<dyn ObjectStoreClient>,
    resolver: PathResolver,
    zones: Arc<SecurityZones>,
    ops: Arc<ObjectOps>,
    listing: Listing,
    copies: LocalCopies,
    create_buckets: bool,
}

impl S3FileBackend {
    /// Build the client named by `config` and a backend over it.
    pub async fn from_config(config: &BackendConfig) -> Result<Self, ConfigError> {
        let client = config.build_client().await?;
        Self::new(config, client)
    }

    /// A backend caching local copies where `config.local_cache` says.
    ///
    /// Without a configured cache, local copies are temporary files.
    pub fn new(
        config: &BackendConfig,
        client: Arc<dyn ObjectStoreClient>,
    ) -> Result<Self, ConfigError> {
        let (root, min_bytes) = match &config.local_cache {
            Some(cache) => (cache.dir.clone(), cache.min_cache_bytes),
            None => (std::env::temp_dir().join("bucketeer"), u64::MAX),
        };
        Self::with_cache(
            config,
            client,
            Arc::new(FsCacheStore::new(root)),
            Arc::new(HttpFetcher::default()),
            min_bytes,
        )
    }

    pub fn with_cache(
        config: &BackendConfig,
        client: Arc<dyn ObjectStoreClient>,
        store: Arc<dyn LocalCacheStore>,
        fetcher: Arc<dyn Fetcher>,
        min_cache_bytes: u64,
    ) -> Result<Self, ConfigError> {
        let registry = Arc::new(ContainerRegistry::from_config(&config.containers)?);
        let resolver = PathResolver::new(registry);
        let zones = Arc::new(SecurityZones::new(
            client.clone(),
            resolver.clone(),
            config.name.clone(),
            config.private_mode(),
        ));
        let ops = Arc::new(
            ObjectOps::new(
                client.clone(),
                resolver.clone(),
                zones.clone(),
                config.name.clone(),
                config.encryption,
            )
            .with_cache(store.clone()),
        );
        let listing = Listing::new(client.clone(), resolver.clone(), config.name.clone());
        let copies = LocalCopies::new(
            ops.clone(),
            store,
            fetcher,
            Arc::new(MinSizeRetention {
                min_bytes: min_cache_bytes,
            }),
        );
        Ok(Self {
            name: config.name.clone(),
            client,
            resolver,
            zones,
            ops,
            listing,
            copies,
            create_buckets: config.create_buckets,
        })
    }

    pub fn zones(&self) -> &SecurityZones {
        &self.zones
    }

    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    pub fn client(&self) -> &Arc<dyn ObjectStoreClient> {
        &self.client
    }

    async fn ensure_bucket(&self, dir: &StoragePath, bucket: &str) -> Status {
        match self.client.bucket_exists(bucket).await {
            Ok(true) => return Status::ok(),
            Ok(false) if !self.create_buckets => return Status::ok(),
            Ok(false) => {}
            Err(err) => return internal_failure(&self.name, "prepare", &dir.to_string(), &err),
        }
        match self.client.create_bucket(bucket).await {
            Ok(()) => info!(bucket, "bucket created"),
            // lost a race with another creator
            Err(err) if err.code == ErrorCode::BucketAlreadyExists => {}
            Err(err) => {
                let _ = internal_failure(&self.name, "create_bucket", bucket, &err);
                return Status::fatal(Fatal::CreateFailed {
                    path: dir.to_string(),
                });
            }
        }
        match self.client.wait_until_bucket_exists(bucket).await {
            Ok(()) => Status::ok(),
            Err(err) => internal_failure(&self.name, "wait_until_bucket_exists", bucket, &err),
        }
    }
}

#[async_trait]
impl FileBackend for S3FileBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn create(
        &self,
        path: &StoragePath,
        source: UploadSource,
        headers: &ObjectHeaders,
    ) -> Status {
        self.ops.create(path, source, headers).await
    }

    async fn store(&self, path: &StoragePath, local: &Path, headers: &ObjectHeaders) -> Status {
        self.ops.store(path, local, headers).await
    }

    async fn copy(
        &self,
        src: &StoragePath,
        dst: &StoragePath,
        headers: &ObjectHeaders,
        ignore_missing_source: bool,
    ) -> Status {
        self.ops.copy(src, dst, headers, ignore_missing_source).await
    }

    async fn delete(&self, path: &StoragePath, ignore_missing_source: bool) -> Status {
        self.ops.delete(path, ignore_missing_source).await
    }

    async fn stat(&self, path: &StoragePath) -> Option<FileStat> {
        self.ops.stat(path).await
    }

    async fn directory_exists(&self, dir: &StoragePath) -> bool {
        self.listing.directory_exists(dir).await
    }

    fn list_files(&self, dir: &StoragePath, top_only: bool) -> Option<BoxStream<'static, String>> {
        self.listing.list_files(dir, top_only)
    }

    fn list_directories(
        &self,
        dir: &StoragePath,
        top_only: bool,
    ) -> Option<BoxStream<'static, String>> {
        self.listing.list_directories(dir, top_only)
    }

    async fn prepare(&self, dir: &StoragePath, options: PrepareOptions) -> Status {
        let Some(address) = self.resolver.resolve_dir(dir) else {
            return Status::invalid_path(dir);
        };
        let mut status = self.ensure_bucket(dir, &address.bucket).await;
        if !status.is_ok() {
            return status;
        }
        if options.access {
            status.merge(self.zones.publish(dir.container()).await);
        }
        if options.no_access {
            status.merge(self.zones.secure(dir.container()).await);
        }
        status
    }

    async fn clean(&self, dir: &StoragePath) -> Status {
        // directories only exist through their files
        match self.resolver.resolve_dir(dir) {
            Some(_) => Status::ok(),
            None => Status::invalid_path(dir),
        }
    }

    async fn is_path_usable(&self, path: &StoragePath) -> bool {
        self.ops.bucket_exists(path).await
    }

    async fn get_http_url(&self, path: &StoragePath, ttl: Option<Duration>) -> Option<Url> {
        self.ops
            .presigned_url(path, ttl.unwrap_or(DEFAULT_URL_TTL))
            .await
    }

    async fn get_local_copy(&self, path: &StoragePath) -> Option<LocalFile> {
        self.copies.get_local_copy(path).await
    }

    async fn get_local_copies(
        &self,
        paths: &[StoragePath],
        chunk_size: usize,
    ) -> HashMap<StoragePath, Option<LocalFile>> {
        self.copies.get_local_copies(paths, chunk_size).await
    }
}
