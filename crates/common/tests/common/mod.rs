//! Shared test utilities for backend integration tests
#![allow(dead_code)]

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use common::config::BackendConfig;
use common::local_cache::{part_path, FetchError, FetchReport, Fetcher, FsCacheStore};
use common::prelude::*;
use remote_store::MemoryClient;
use tempfile::TempDir;
use url::Url;

pub const BUCKET: &str = "wiki-media";

/// Serves `memory://` URLs straight out of a [`MemoryClient`].
#[derive(Debug)]
pub struct MemoryFetcher {
    client: Arc<MemoryClient>,
    fetches: AtomicUsize,
}

impl MemoryFetcher {
    pub fn new(client: Arc<MemoryClient>) -> Self {
        Self {
            client,
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetcher for MemoryFetcher {
    async fn fetch(&self, url: &Url, dest: &Path) -> Result<FetchReport, FetchError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let started = Instant::now();
        let body = self
            .client
            .read_url(url)
            .map_err(|e| FetchError::UnsupportedUrl(e.to_string()))?;
        let part = part_path(dest);
        tokio::fs::write(&part, &body).await?;
        tokio::fs::rename(&part, dest).await?;
        Ok(FetchReport {
            bytes: body.len() as u64,
            elapsed: started.elapsed(),
            warnings: Vec::new(),
        })
    }
}

pub struct TestEnv {
    pub backend: S3FileBackend,
    pub client: Arc<MemoryClient>,
    pub fetcher: Arc<MemoryFetcher>,
    pub cache_dir: TempDir,
}

pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Containers used across the integration tests:
/// `public` at the bucket root, `thumb` under `a/b/`, `ghost` in a bucket
/// that does not exist.
pub fn test_config() -> BackendConfig {
    let mut config = BackendConfig::default();
    config.name = "s3-test".to_string();
    config.containers.insert("public".to_string(), BUCKET.to_string());
    config
        .containers
        .insert("thumb".to_string(), format!("{}/a/b", BUCKET));
    config
        .containers
        .insert("ghost".to_string(), "no-such-bucket".to_string());
    config
}

pub fn setup_with(config: BackendConfig, min_cache_bytes: u64) -> TestEnv {
    init_logging();
    let client = Arc::new(MemoryClient::with_buckets([BUCKET]));
    let fetcher = Arc::new(MemoryFetcher::new(client.clone()));
    let cache_dir = TempDir::new().unwrap();
    let backend = S3FileBackend::with_cache(
        &config,
        client.clone(),
        Arc::new(FsCacheStore::new(cache_dir.path())),
        fetcher.clone(),
        min_cache_bytes,
    )
    .unwrap();
    TestEnv {
        backend,
        client,
        fetcher,
        cache_dir,
    }
}

/// Default environment; every download is retained in the cache.
pub fn setup() -> TestEnv {
    setup_with(test_config(), 0)
}

pub fn path(s: &str) -> StoragePath {
    s.parse().unwrap()
}

pub async fn put(env: &TestEnv, p: &str, body: &'static str) {
    let status = env
        .backend
        .create(&path(p), body.into(), &ObjectHeaders::default())
        .await;
    assert!(status.is_ok(), "create {} failed: {}", p, status);
}
