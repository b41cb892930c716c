//! Translation of virtual storage paths into bucket/key addresses.

use std::sync::Arc;

use crate::path::{StoragePath, SEPARATOR};
use crate::registry::{ContainerLocation, ContainerRegistry};

/// Longest object key the remote store accepts, in bytes.
pub const MAX_KEY_LENGTH: usize = 1024;

/// Name of the zero-byte object that marks a container as private.
pub const MARKER_FILE: &str = ".htsecure";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PhysicalAddress {
    pub bucket: String,
    pub key: String,
    pub container: String,
}

#[derive(Debug, Clone)]
pub struct PathResolver {
    registry: Arc<ContainerRegistry>,
}

impl PathResolver {
    pub fn new(registry: Arc<ContainerRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ContainerRegistry {
        &self.registry
    }

    pub fn location(&self, container: &str) -> Option<&ContainerLocation> {
        self.registry.get(container)
    }

    /// Resolve a file path. `None` for an unknown container or an oversized key.
    pub fn resolve(&self, path: &StoragePath) -> Option<PhysicalAddress> {
        self.resolve_relative(path.container(), path.relative())
    }

    pub fn resolve_relative(&self, container: &str, relative: &str) -> Option<PhysicalAddress> {
        let location = self.registry.get(container)?;
        let key = format!("{}{}", location.prefix, relative);
        if key.len() > MAX_KEY_LENGTH {
            return None;
        }
        Some(PhysicalAddress {
            bucket: location.bucket.clone(),
            key,
            container: container.to_string(),
        })
    }

    /// Resolve a directory; the key is empty or ends with a separator.
    pub fn resolve_dir(&self, dir: &StoragePath) -> Option<PhysicalAddress> {
        let mut address = self.resolve(dir)?;
        if !address.key.is_empty() && !address.key.ends_with(SEPARATOR) {
            address.key.push(SEPARATOR);
        }
        Some(address)
    }

    /// Address of the container's marker object.
    pub fn marker_address(&self, container: &str) -> Option<PhysicalAddress> {
        self.resolve_relative(container, MARKER_FILE)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn resolver() -> PathResolver {
        let containers = HashMap::from([
            ("public".to_string(), "wiki".to_string()),
            ("thumb".to_string(), "wiki/a/b".to_string()),
        ]);
        PathResolver::new(Arc::new(ContainerRegistry::from_config(&containers).unwrap()))
    }

    #[test]
    fn test_resolve_with_prefix() {
        let path: StoragePath = "thumb/p.png".parse().unwrap();
        let address = resolver().resolve(&path).unwrap();
        assert_eq!(address.bucket, "wiki");
        assert_eq!(address.key, "a/b/p.png");
        assert_eq!(address.container, "thumb");
    }

    #[test]
    fn test_unknown_container() {
        let path: StoragePath = "missing/p.png".parse().unwrap();
        assert!(resolver().resolve(&path).is_none());
    }

    #[test]
    fn test_key_length_limit() {
        let resolver = resolver();
        // "a/b/" plus 1020 bytes is exactly at the limit
        let at_limit = StoragePath::new("thumb", &"x".repeat(1020)).unwrap();
        assert_eq!(resolver.resolve(&at_limit).unwrap().key.len(), MAX_KEY_LENGTH);
        let over = StoragePath::new("thumb", &"x".repeat(1021)).unwrap();
        assert!(resolver.resolve(&over).is_none());
    }

    #[test]
    fn test_dir_and_marker() {
        let resolver = resolver();
        let root = StoragePath::container_root("public").unwrap();
        assert_eq!(resolver.resolve_dir(&root).unwrap().key, "");
        let root = StoragePath::container_root("thumb").unwrap();
        assert_eq!(resolver.resolve_dir(&root).unwrap().key, "a/b/");
        let dir: StoragePath = "public/d".parse().unwrap();
        assert_eq!(resolver.resolve_dir(&dir).unwrap().key, "d/");
        assert_eq!(resolver.marker_address("thumb").unwrap().key, "a/b/.htsecure");
    }
}
