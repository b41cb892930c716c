//! Directory emulation over prefix/delimiter listings.
//!
//! Listings are lazy streams driven by the store's continuation tokens: a
//! page is requested only once the previous one has been consumed, so
//! dropping a stream early stops further requests. Streams are forward-only.
//! A remote failure part way through is logged and ends the stream.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use futures::stream::{self, BoxStream, StreamExt};
use remote_store::{ListRequest, ObjectStoreClient};
use tracing::{debug, warn};

use crate::classify::{report_query_failure, Failure};
use crate::path::{StoragePath, SEPARATOR};
use crate::resolver::PathResolver;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Select {
    Keys,
    Prefixes,
}

/// Pagination state behind a listing stream.
struct Cursor {
    client: Arc<dyn ObjectStoreClient>,
    request: ListRequest,
    select: Select,
    buffer: VecDeque<String>,
    done: bool,
}

#[derive(Debug, Clone)]
pub struct Listing {
    client: Arc<dyn ObjectStoreClient>,
    resolver: PathResolver,
    backend: String,
}

impl Listing {
    pub fn new(
        client: Arc<dyn ObjectStoreClient>,
        resolver: PathResolver,
        backend: impl Into<String>,
    ) -> Self {
        Self {
            client,
            resolver,
            backend: backend.into(),
        }
    }

    /// Whether anything is stored under `dir`. Costs one single-item listing.
    pub async fn directory_exists(&self, dir: &StoragePath) -> bool {
        let Some(address) = self.resolver.resolve_dir(dir) else {
            return false;
        };
        let request = ListRequest::new(address.bucket, address.key).with_max_keys(1);
        match self.client.list_objects(&request).await {
            Ok(page) => !page.is_empty(),
            Err(err) => {
                if Failure::of(&err) == Failure::Other {
                    let params = dir.to_string();
                    report_query_failure(&self.backend, "directory_exists", &params, &err);
                } else {
                    debug!(dir = %dir, error = %err, "directory check on missing bucket");
                }
                false
            }
        }
    }

    /// Files under `dir`, relative to it. `top_only` stops at the first level.
    ///
    /// `None` when `dir` does not resolve.
    pub fn list_files(
        &self,
        dir: &StoragePath,
        top_only: bool,
    ) -> Option<BoxStream<'static, String>> {
        let address = self.resolver.resolve_dir(dir)?;
        let prefix = address.key.clone();
        let mut request = ListRequest::new(address.bucket, address.key);
        if top_only {
            request = request.with_delimiter(SEPARATOR.to_string());
        }
        let stream = self
            .paged(request, Select::Keys)
            .filter_map(move |key| {
                let relative = key
                    .strip_prefix(prefix.as_str())
                    .filter(|rest| !rest.is_empty())
                    .map(str::to_string);
                futures::future::ready(relative)
            })
            .boxed();
        Some(stream)
    }

    /// Subdirectories of `dir`, relative to it and without a trailing separator.
    ///
    /// With `top_only` unset, every directory that has a file somewhere
    /// below it is reported once, parents before children.
    pub fn list_directories(
        &self,
        dir: &StoragePath,
        top_only: bool,
    ) -> Option<BoxStream<'static, String>> {
        if !top_only {
            let files = self.list_files(dir, false)?;
            let stream = files
                .scan(HashSet::new(), |seen: &mut HashSet<String>, file| {
                    let fresh: Vec<String> = ancestors(&file)
                        .filter(|dir| seen.insert(dir.clone()))
                        .collect();
                    futures::future::ready(Some(stream::iter(fresh)))
                })
                .flatten()
                .boxed();
            return Some(stream);
        }

        let address = self.resolver.resolve_dir(dir)?;
        let prefix = address.key.clone();
        let request = ListRequest::new(address.bucket, address.key)
            .with_delimiter(SEPARATOR.to_string());
        let stream = self
            .paged(request, Select::Prefixes)
            .filter_map(move |common| {
                let relative = common
                    .strip_prefix(prefix.as_str())
                    .map(|rest| rest.trim_end_matches(SEPARATOR))
                    .filter(|rest| !rest.is_empty())
                    .map(str::to_string);
                futures::future::ready(relative)
            })
            .boxed();
        Some(stream)
    }

    fn paged(&self, request: ListRequest, select: Select) -> BoxStream<'static, String> {
        let cursor = Cursor {
            client: self.client.clone(),
            request,
            select,
            buffer: VecDeque::new(),
            done: false,
        };
        let backend = self.backend.clone();
        stream::unfold(cursor, move |mut cursor| {
            let backend = backend.clone();
            async move {
                loop {
                    if let Some(item) = cursor.buffer.pop_front() {
                        return Some((item, cursor));
                    }
                    if cursor.done {
                        return None;
                    }
                    match cursor.client.list_objects(&cursor.request).await {
                        Ok(page) => {
                            cursor.done = page.next_continuation.is_none();
                            cursor.request.continuation = page.next_continuation;
                            cursor.buffer.extend(match cursor.select {
                                Select::Keys => page.keys,
                                Select::Prefixes => page.common_prefixes,
                            });
                        }
                        Err(err) => {
                            let params =
                                format!("{}/{}", cursor.request.bucket, cursor.request.prefix);
                            if Failure::of(&err) == Failure::Other {
                                report_query_failure(&backend, "list", &params, &err);
                            } else {
                                warn!(prefix = %params, error = %err, "listing ended early");
                            }
                            return None;
                        }
                    }
                }
            }
        })
        .boxed()
    }
}

/// Directory parts of a relative file path, shortest first.
fn ancestors(file: &str) -> impl Iterator<Item = String> + '_ {
    file.match_indices(SEPARATOR)
        .map(move |(index, _)| file[..index].to_string())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use remote_store::{ErrorCode, MemoryClient, PutRequest};

    use super::*;
    use crate::registry::ContainerRegistry;

    async fn listing(keys: &[&str]) -> (Arc<MemoryClient>, Listing) {
        let client = Arc::new(MemoryClient::with_buckets(["wiki"]));
        for key in keys {
            client
                .put_object(PutRequest::empty("wiki", *key))
                .await
                .unwrap();
        }
        let containers = HashMap::from([
            ("media".to_string(), "wiki/m".to_string()),
            ("all".to_string(), "wiki".to_string()),
        ]);
        let resolver =
            PathResolver::new(Arc::new(ContainerRegistry::from_config(&containers).unwrap()));
        (client.clone(), Listing::new(client, resolver, "s3"))
    }

    fn dir(s: &str) -> StoragePath {
        s.parse().unwrap()
    }

    #[test]
    fn test_ancestors() {
        let dirs: Vec<String> = ancestors("a/b/c.txt").collect();
        assert_eq!(dirs, vec!["a", "a/b"]);
        assert_eq!(ancestors("c.txt").count(), 0);
    }

    #[tokio::test]
    async fn test_directory_exists_uses_one_request() {
        let (client, listing) = listing(&["m/d/1.txt", "m/d/2.txt"]).await;
        let before = client.request_count();
        assert!(listing.directory_exists(&dir("media/d")).await);
        assert_eq!(client.request_count(), before + 1);
        assert!(!listing.directory_exists(&dir("media/e")).await);
        assert!(!listing.directory_exists(&dir("nope/d")).await);
        // a file is not a directory
        assert!(!listing.directory_exists(&dir("media/d/1.txt")).await);
    }

    #[tokio::test]
    async fn test_recursive_directories() {
        let keys = ["m/a/b/1.txt", "m/a/b/2.txt", "m/a/c/3.txt", "m/top.txt"];
        let (_, listing) = listing(&keys).await;
        let dirs: Vec<String> = listing
            .list_directories(&StoragePath::container_root("media").unwrap(), false)
            .unwrap()
            .collect()
            .await;
        assert_eq!(dirs, vec!["a", "a/b", "a/c"]);
    }

    #[tokio::test]
    async fn test_container_root_without_prefix() {
        let (_, listing) = listing(&["x.txt", "m/y.txt"]).await;
        let files: Vec<String> = listing
            .list_files(&StoragePath::container_root("all").unwrap(), true)
            .unwrap()
            .collect()
            .await;
        assert_eq!(files, vec!["x.txt"]);
    }

    #[tokio::test]
    async fn test_error_ends_stream() {
        let (client, listing) = listing(&["m/d/1.txt"]).await;
        client.fail_next(ErrorCode::Other("InternalError".into()), "boom");
        let files: Vec<String> = listing
            .list_files(&dir("media/d"), false)
            .unwrap()
            .collect()
            .await;
        assert!(files.is_empty());
    }

    #[tokio::test]
    async fn test_unresolvable_dir() {
        let (_, listing) = listing(&[]).await;
        assert!(listing.list_files(&dir("nope/d"), true).is_none());
        assert!(listing.list_directories(&dir("nope/d"), false).is_none());
    }
}
