//! Per-container security zones backed by a marker object.
//!
//! A container is *secure* when the zero-byte marker object exists at its
//! prefix root; every object written into it then gets a private ACL. The
//! answer is cached for the life of the instance, and `secure`/`publish`
//! update the cache directly.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use remote_store::{Acl, ObjectStoreClient, PutRequest};
use tracing::{debug, info, warn};

use crate::classify::{internal_failure, Failure};
use crate::resolver::{PathResolver, MARKER_FILE};
use crate::status::{Fatal, Status};

#[derive(Debug)]
pub struct SecurityZones {
    client: Arc<dyn ObjectStoreClient>,
    resolver: PathResolver,
    backend: String,
    private_mode: bool,
    /// container -> secure
    states: RwLock<HashMap<String, bool>>,
}

impl SecurityZones {
    pub fn new(
        client: Arc<dyn ObjectStoreClient>,
        resolver: PathResolver,
        backend: impl Into<String>,
        private_mode: bool,
    ) -> Self {
        let capacity = resolver.registry().len();
        Self {
            client,
            resolver,
            backend: backend.into(),
            private_mode,
            states: RwLock::new(HashMap::with_capacity(capacity)),
        }
    }

    pub fn private_mode(&self) -> bool {
        self.private_mode
    }

    /// Cached state, without consulting the remote store.
    pub fn cached(&self, container: &str) -> Option<bool> {
        self.states.read().get(container).copied()
    }

    pub async fn is_secure(&self, container: &str) -> bool {
        if self.private_mode {
            return true;
        }
        if let Some(secure) = self.cached(container) {
            return secure;
        }
        let Some(marker) = self.resolver.marker_address(container) else {
            return false;
        };
        match self.client.head_object(&marker.bucket, &marker.key).await {
            Ok(_) => {
                self.states.write().insert(container.to_string(), true);
                true
            }
            Err(err) if Failure::of(&err) == Failure::MissingObject => {
                self.states.write().insert(container.to_string(), false);
                false
            }
            Err(err) => {
                // not cached, so the next call asks again
                warn!(container, error = %err, "security check failed, treating as public");
                false
            }
        }
    }

    /// ACL for objects written into `container`.
    pub async fn acl_for(&self, container: &str) -> Acl {
        if self.is_secure(container).await {
            Acl::Private
        } else {
            Acl::PublicRead
        }
    }

    /// Write the marker object and mark the container secure.
    pub async fn secure(&self, container: &str) -> Status {
        let display = format!("{}/{}", container, MARKER_FILE);
        let Some(marker) = self.resolver.marker_address(container) else {
            return Status::invalid_path(display);
        };
        let request = PutRequest::empty(marker.bucket, marker.key);
        if let Err(err) = self.client.put_object(request).await {
            return match Failure::of(&err) {
                Failure::MissingBucket => Status::fatal(Fatal::CreateFailed { path: display }),
                _ => internal_failure(&self.backend, "secure", &display, &err),
            };
        }
        self.states.write().insert(container.to_string(), true);
        info!(container, "container secured");
        Status::ok()
    }

    /// Remove the marker object and mark the container public.
    pub async fn publish(&self, container: &str) -> Status {
        let display = format!("{}/{}", container, MARKER_FILE);
        let Some(marker) = self.resolver.marker_address(container) else {
            return Status::invalid_path(display);
        };
        match self.client.delete_object(&marker.bucket, &marker.key).await {
            Ok(()) => {}
            Err(err) => match Failure::of(&err) {
                Failure::MissingObject => debug!(container, "no marker to remove"),
                Failure::MissingBucket => {
                    return Status::fatal(Fatal::DeleteFailed { path: display })
                }
                Failure::Other => {
                    return internal_failure(&self.backend, "publish", &display, &err)
                }
            },
        }
        self.states.write().insert(container.to_string(), false);
        info!(container, "container published");
        Status::ok()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use remote_store::{ErrorCode, MemoryClient};

    use super::*;
    use crate::registry::ContainerRegistry;

    fn zones(private_mode: bool) -> (Arc<MemoryClient>, SecurityZones) {
        let client = Arc::new(MemoryClient::with_buckets(["wiki"]));
        let containers = HashMap::from([
            ("media".to_string(), "wiki/media".to_string()),
            ("gone".to_string(), "absent-bucket".to_string()),
        ]);
        let resolver =
            PathResolver::new(Arc::new(ContainerRegistry::from_config(&containers).unwrap()));
        let zones = SecurityZones::new(client.clone(), resolver, "s3", private_mode);
        (client, zones)
    }

    #[tokio::test]
    async fn test_marker_check_is_cached() {
        let (client, zones) = zones(false);
        client
            .put_object(PutRequest::empty("wiki", "media/.htsecure"))
            .await
            .unwrap();
        let before = client.request_count();
        assert!(zones.is_secure("media").await);
        assert!(zones.is_secure("media").await);
        assert_eq!(client.request_count(), before + 1);
    }

    #[tokio::test]
    async fn test_transient_error_is_not_cached() {
        let (client, zones) = zones(false);
        client.fail_next(ErrorCode::Other("InternalError".into()), "boom");
        assert!(!zones.is_secure("media").await);
        assert_eq!(zones.cached("media"), None);

        assert!(!zones.is_secure("media").await);
        assert_eq!(zones.cached("media"), Some(false));
    }

    #[tokio::test]
    async fn test_secure_then_publish() {
        let (client, zones) = zones(false);
        assert!(zones.secure("media").await.is_ok());
        assert!(client.object("wiki", "media/.htsecure").is_some());
        assert_eq!(zones.acl_for("media").await, Acl::Private);

        assert!(zones.publish("media").await.is_ok());
        assert!(client.object("wiki", "media/.htsecure").is_none());
        assert_eq!(zones.acl_for("media").await, Acl::PublicRead);

        // nothing left to delete
        assert!(zones.publish("media").await.is_ok());
    }

    #[tokio::test]
    async fn test_missing_bucket_is_not_cached_as_public() {
        let (_, zones) = zones(false);
        assert!(!zones.is_secure("gone").await);
        assert_eq!(zones.cached("gone"), None);
    }

    #[tokio::test]
    async fn test_publish_reports_missing_bucket() {
        let (_, zones) = zones(false);
        let status = zones.publish("gone").await;
        assert!(status.has("backend-fail-delete"));
        assert_eq!(zones.cached("gone"), None);
    }

    #[tokio::test]
    async fn test_private_mode_skips_remote() {
        let (client, zones) = zones(true);
        let before = client.request_count();
        assert!(zones.is_secure("media").await);
        assert!(zones.is_secure("unknown").await);
        assert_eq!(client.request_count(), before);
    }

    #[tokio::test]
    async fn test_secure_unknown_container() {
        let (_, zones) = zones(false);
        assert!(zones.secure("nope").await.has("backend-fail-invalidpath"));
    }
}
