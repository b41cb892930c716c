use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tempfile::TempPath;
use tracing::{debug, warn};

use crate::path::StoragePath;

/// A local copy of a remote object.
///
/// Temporary copies are removed from disk when the handle is dropped.
#[derive(Debug)]
pub struct LocalFile {
    path: PathBuf,
    size: u64,
    temp: Option<TempPath>,
}

impl LocalFile {
    pub fn cached(path: PathBuf, size: u64) -> Self {
        Self {
            path,
            size,
            temp: None,
        }
    }

    pub fn temporary(temp: TempPath, size: u64) -> Self {
        Self {
            path: temp.to_path_buf(),
            size,
            temp: Some(temp),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn is_temporary(&self) -> bool {
        self.temp.is_some()
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }
}

/// Where local copies live, keyed by virtual storage path.
#[async_trait]
pub trait LocalCacheStore: Send + Sync + std::fmt::Debug {
    /// A usable entry: present on disk and not empty.
    async fn lookup(&self, path: &StoragePath) -> Option<LocalFile>;

    /// Where a fresh download for `path` should be written.
    fn target_path(&self, path: &StoragePath) -> PathBuf;

    /// Drop any entry for `path`. Missing entries are fine.
    async fn invalidate(&self, path: &StoragePath);
}

/// Cache entries on the local filesystem under a single root.
///
/// Entries are named after a hash of the virtual path, so no path can
/// address anything outside the root.
#[derive(Debug, Clone)]
pub struct FsCacheStore {
    root: PathBuf,
}

impl FsCacheStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl LocalCacheStore for FsCacheStore {
    async fn lookup(&self, path: &StoragePath) -> Option<LocalFile> {
        let target = self.target_path(path);
        let meta = tokio::fs::metadata(&target).await.ok()?;
        if !meta.is_file() || meta.len() == 0 {
            return None;
        }
        Some(LocalFile::cached(target, meta.len()))
    }

    fn target_path(&self, path: &StoragePath) -> PathBuf {
        let digest = hex::encode(Sha256::digest(path.to_string().as_bytes()));
        let mut name = digest.clone();
        if let Some(ext) = path
            .file_name()
            .and_then(|name| Path::new(name).extension())
            .and_then(|ext| ext.to_str())
        {
            name.push('.');
            name.push_str(&ext.to_ascii_lowercase());
        }
        self.root.join(&digest[..2]).join(name)
    }

    async fn invalidate(&self, path: &StoragePath) {
        let target = self.target_path(path);
        match tokio::fs::remove_file(&target).await {
            Ok(()) => debug!(path = %path, "local copy invalidated"),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => warn!(path = %path, error = %err, "failed to invalidate local copy"),
        }
    }
}

/// Decides whether a fresh download stays in the cache.
#[async_trait]
pub trait RetentionPolicy: Send + Sync + std::fmt::Debug {
    async fn retain(&self, file: LocalFile) -> io::Result<LocalFile>;
}

/// Hand out files smaller than `min_bytes` as temporaries.
#[derive(Debug, Clone, Copy)]
pub struct MinSizeRetention {
    pub min_bytes: u64,
}

#[async_trait]
impl RetentionPolicy for MinSizeRetention {
    async fn retain(&self, file: LocalFile) -> io::Result<LocalFile> {
        if file.is_temporary() || file.size() >= self.min_bytes {
            return Ok(file);
        }
        let dir = file.path().parent().unwrap_or_else(|| Path::new("."));
        let temp = tempfile::Builder::new()
            .prefix(".uncached-")
            .tempfile_in(dir)?
            .into_temp_path();
        tokio::fs::rename(file.path(), &temp).await?;
        debug!(size = file.size(), min = self.min_bytes, "local copy below retention threshold");
        Ok(LocalFile::temporary(temp, file.size()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_target_path_layout() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsCacheStore::new(dir.path());
        let path: StoragePath = "media/a/Photo.JPG".parse().unwrap();
        let target = store.target_path(&path);

        let name = target.file_name().unwrap().to_str().unwrap();
        assert!(name.ends_with(".jpg"));
        assert_eq!(name.len(), 64 + 4);
        let shard = target.parent().unwrap();
        assert_eq!(shard.parent().unwrap(), dir.path());
        assert_eq!(shard.file_name().unwrap().to_str().unwrap(), &name[..2]);
    }

    #[tokio::test]
    async fn test_lookup_ignores_empty_entries() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsCacheStore::new(dir.path());
        let path: StoragePath = "media/x.txt".parse().unwrap();
        assert!(store.lookup(&path).await.is_none());

        let target = store.target_path(&path);
        tokio::fs::create_dir_all(target.parent().unwrap()).await.unwrap();
        tokio::fs::write(&target, b"").await.unwrap();
        assert!(store.lookup(&path).await.is_none());

        tokio::fs::write(&target, b"data").await.unwrap();
        let hit = store.lookup(&path).await.unwrap();
        assert_eq!(hit.size(), 4);

        store.invalidate(&path).await;
        assert!(!target.exists());
        // second invalidation is a no-op
        store.invalidate(&path).await;
    }

    #[tokio::test]
    async fn test_small_files_become_temporary() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("small.bin");
        tokio::fs::write(&target, b"abc").await.unwrap();

        let policy = MinSizeRetention { min_bytes: 10 };
        let file = policy
            .retain(LocalFile::cached(target.clone(), 3))
            .await
            .unwrap();
        assert!(file.is_temporary());
        assert!(!target.exists());
        let temp = file.path().to_path_buf();
        assert_eq!(tokio::fs::read(&temp).await.unwrap(), b"abc");

        drop(file);
        assert!(!temp.exists());
    }

    #[tokio::test]
    async fn test_large_files_are_kept() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("large.bin");
        tokio::fs::write(&target, vec![7u8; 64]).await.unwrap();

        let policy = MinSizeRetention { min_bytes: 10 };
        let file = policy
            .retain(LocalFile::cached(target.clone(), 64))
            .await
            .unwrap();
        assert!(!file.is_temporary());
        drop(file);
        assert!(target.exists());
    }
}
