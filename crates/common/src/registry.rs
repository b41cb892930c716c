//! Static mapping from logical container names to bucket locations.

use std::collections::HashMap;

use crate::config::ConfigError;
use crate::path::SEPARATOR;

/// Where a container's objects live.
///
/// `prefix` is either empty or ends with exactly one separator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerLocation {
    pub bucket: String,
    pub prefix: String,
}

impl ContainerLocation {
    /// Parse `"<bucket>"` or `"<bucket>/<prefix...>"`.
    pub fn parse(spec: &str) -> Option<Self> {
        let spec = spec.trim().trim_matches(SEPARATOR);
        let (bucket, prefix) = match spec.split_once(SEPARATOR) {
            Some((bucket, prefix)) => (bucket, prefix.trim_matches(SEPARATOR)),
            None => (spec, ""),
        };
        if bucket.is_empty() {
            return None;
        }
        let prefix = if prefix.is_empty() {
            String::new()
        } else {
            format!("{}{}", prefix, SEPARATOR)
        };
        Some(Self {
            bucket: bucket.to_string(),
            prefix,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct ContainerRegistry {
    containers: HashMap<String, ContainerLocation>,
}

impl ContainerRegistry {
    pub fn from_config(containers: &HashMap<String, String>) -> Result<Self, ConfigError> {
        if containers.is_empty() {
            return Err(ConfigError::MissingContainers);
        }
        let containers = containers
            .iter()
            .map(|(name, spec)| {
                ContainerLocation::parse(spec)
                    .map(|location| (name.clone(), location))
                    .ok_or_else(|| ConfigError::InvalidContainer {
                        container: name.clone(),
                        spec: spec.clone(),
                    })
            })
            .collect::<Result<_, _>>()?;
        Ok(Self { containers })
    }

    pub fn get(&self, container: &str) -> Option<&ContainerLocation> {
        self.containers.get(container)
    }

    /// Configured container names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.containers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.containers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.containers.is_empty()
    }
}
