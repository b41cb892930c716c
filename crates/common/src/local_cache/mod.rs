//! Local copies of remote objects.
//!
//! Copies are served from a [`LocalCacheStore`] when present, otherwise
//! downloaded through a presigned URL. [`crate::executor::ObjectOps`] drops
//! entries on every mutation, so a hit is never older than the last write
//! made through this adapter.

mod fetch;
mod store;

pub use fetch::{part_path, FetchError, FetchReport, Fetcher, HttpFetcher};
pub use store::{FsCacheStore, LocalCacheStore, LocalFile, MinSizeRetention, RetentionPolicy};

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, warn};

use crate::executor::{ObjectOps, DEFAULT_URL_TTL};
use crate::path::StoragePath;

#[derive(Debug, Clone)]
pub struct LocalCopies {
    ops: Arc<ObjectOps>,
    store: Arc<dyn LocalCacheStore>,
    fetcher: Arc<dyn Fetcher>,
    retention: Arc<dyn RetentionPolicy>,
}

impl LocalCopies {
    pub fn new(
        ops: Arc<ObjectOps>,
        store: Arc<dyn LocalCacheStore>,
        fetcher: Arc<dyn Fetcher>,
        retention: Arc<dyn RetentionPolicy>,
    ) -> Self {
        Self {
            ops,
            store,
            fetcher,
            retention,
        }
    }

    pub fn store(&self) -> &Arc<dyn LocalCacheStore> {
        &self.store
    }

    /// A local copy of `path`, or `None` if it cannot be had.
    pub async fn get_local_copy(&self, path: &StoragePath) -> Option<LocalFile> {
        if let Some(hit) = self.store.lookup(path).await {
            debug!(path = %path, size = hit.size(), "local copy hit");
            return Some(hit);
        }

        let url = self.ops.presigned_url(path, DEFAULT_URL_TTL).await?;
        let target = self.store.target_path(path);
        if let Some(parent) = target.parent() {
            if let Err(err) = tokio::fs::create_dir_all(parent).await {
                warn!(
                    path = %path,
                    dir = %parent.display(),
                    error = %err,
                    "failed to create cache directory"
                );
                return None;
            }
        }

        let report = match self.fetcher.fetch(&url, &target).await {
            Ok(report) => report,
            Err(err) => {
                warn!(path = %path, error = %err, "download failed");
                return None;
            }
        };
        for warning in &report.warnings {
            warn!(path = %path, warning = %warning, "download warning");
        }
        debug!(
            path = %path,
            bytes = report.bytes,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "local copy fetched"
        );

        match self
            .retention
            .retain(LocalFile::cached(target, report.bytes))
            .await
        {
            Ok(file) => Some(file),
            Err(err) => {
                warn!(path = %path, error = %err, "retention check failed");
                self.store.lookup(path).await
            }
        }
    }

    /// Local copies of several paths, `chunk_size` at a time.
    ///
    /// Chunks run one after another; the paths of a chunk are fetched
    /// concurrently. A path that cannot be fetched maps to `None`.
    pub async fn get_local_copies(
        &self,
        paths: &[StoragePath],
        chunk_size: usize,
    ) -> HashMap<StoragePath, Option<LocalFile>> {
        let mut copies = HashMap::with_capacity(paths.len());
        for chunk in paths.chunks(chunk_size.max(1)) {
            // a repeated path would race into the same download target
            let mut pending = HashSet::with_capacity(chunk.len());
            let unique: Vec<&StoragePath> = chunk
                .iter()
                .filter(|path| !copies.contains_key(*path) && pending.insert(*path))
                .collect();
            let fetched = join_all(unique.into_iter().map(|path| async move {
                (path.clone(), self.get_local_copy(path).await)
            }))
            .await;
            copies.extend(fetched);
        }
        copies
    }
}
