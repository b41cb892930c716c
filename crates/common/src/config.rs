//! Adapter configuration, loaded from TOML.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use remote_store::{ClientConfigError, LocalClient, ObjectStoreClient, S3Client, S3Config};
use serde::{Deserialize, Serialize};

/// Files below this size are not worth keeping in the local cache.
pub const DEFAULT_MIN_CACHE_BYTES: u64 = 4096;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("no containers configured")]
    MissingContainers,

    #[error("container {container} has an invalid location: {spec:?}")]
    InvalidContainer { container: String, spec: String },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("client error: {0}")]
    Client(#[from] ClientConfigError),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CredentialsConfig {
    pub key: String,
    pub secret: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LocalCacheConfig {
    pub dir: PathBuf,
    #[serde(default = "default_min_cache_bytes")]
    pub min_cache_bytes: u64,
}

fn default_min_cache_bytes() -> u64 {
    DEFAULT_MIN_CACHE_BYTES
}

/// Which object store implementation backs the adapter.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoreConfig {
    /// Amazon S3 or an S3-compatible endpoint
    #[default]
    S3,
    /// A directory per bucket under `root`
    Local { root: PathBuf },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Backend name reported in internal-failure statuses
    #[serde(default = "default_name")]
    pub name: String,
    /// Container name to `"bucket"` or `"bucket/prefix"`
    #[serde(default)]
    pub containers: HashMap<String, String>,
    /// Server-side encryption for written objects. Forces HTTPS.
    #[serde(default)]
    pub encryption: bool,
    #[serde(default = "default_true")]
    pub use_https: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<CredentialsConfig>,
    /// Treat every container as secure. Defaults to `!publicly_readable`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_wiki: Option<bool>,
    #[serde(default = "default_true")]
    pub publicly_readable: bool,
    /// Create missing buckets during `prepare`
    #[serde(default)]
    pub create_buckets: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_cache: Option<LocalCacheConfig>,
    #[serde(default)]
    pub store: StoreConfig,
}

fn default_name() -> String {
    "s3".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            containers: HashMap::new(),
            encryption: false,
            use_https: true,
            region: None,
            endpoint: None,
            credentials: None,
            private_wiki: None,
            publicly_readable: true,
            create_buckets: false,
            local_cache: None,
            store: StoreConfig::default(),
        }
    }
}

impl BackendConfig {
    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        if config.containers.is_empty() {
            return Err(ConfigError::MissingContainers);
        }
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn private_mode(&self) -> bool {
        self.private_wiki.unwrap_or(!self.publicly_readable)
    }

    pub fn effective_use_https(&self) -> bool {
        self.encryption || self.use_https
    }

    pub fn s3_config(&self) -> S3Config {
        let credentials = self.credentials.clone();
        S3Config {
            region: self.region.clone(),
            endpoint: self.endpoint.clone(),
            access_key: credentials.as_ref().map(|c| c.key.clone()),
            secret_key: credentials.as_ref().map(|c| c.secret.clone()),
            session_token: credentials.and_then(|c| c.token),
            use_https: self.effective_use_https(),
        }
    }

    /// Construct the object store client this config selects.
    pub async fn build_client(&self) -> Result<Arc<dyn ObjectStoreClient>, ConfigError> {
        let client: Arc<dyn ObjectStoreClient> = match &self.store {
            StoreConfig::S3 => Arc::new(S3Client::new(&self.s3_config()).await?),
            StoreConfig::Local { root } => Arc::new(LocalClient::new(root.clone())?),
        };
        Ok(client)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal() {
        let config = BackendConfig::from_toml(
            r#"
            [containers]
            public = "wiki-public"
            thumb = "wiki-public/thumb"
            "#,
        )
        .unwrap();
        assert_eq!(config.name, "s3");
        assert_eq!(config.containers.len(), 2);
        assert!(config.use_https);
        assert!(!config.private_mode());
        assert_eq!(config.store, StoreConfig::S3);
    }

    #[test]
    fn test_missing_containers() {
        let err = BackendConfig::from_toml("region = \"eu-west-1\"").unwrap_err();
        assert!(matches!(err, ConfigError::MissingContainers));
    }

    #[test]
    fn test_private_mode_defaults_to_inverse_of_publicly_readable() {
        let mut config = BackendConfig {
            publicly_readable: false,
            ..Default::default()
        };
        assert!(config.private_mode());
        config.private_wiki = Some(false);
        assert!(!config.private_mode());
    }

    #[test]
    fn test_encryption_forces_https() {
        let config = BackendConfig {
            encryption: true,
            use_https: false,
            ..Default::default()
        };
        assert!(config.s3_config().use_https);
    }

    #[test]
    fn test_local_store_and_credentials() {
        let config = BackendConfig::from_toml(
            r#"
            [containers]
            media = "media"

            [credentials]
            key = "AKIA"
            secret = "s3cr3t"

            [store]
            type = "local"
            root = "/var/lib/bucketeer"
            "#,
        )
        .unwrap();
        assert_eq!(
            config.store,
            StoreConfig::Local {
                root: PathBuf::from("/var/lib/bucketeer")
            }
        );
        let s3 = config.s3_config();
        assert_eq!(s3.access_key.as_deref(), Some("AKIA"));
        assert_eq!(s3.session_token, None);
    }

    #[test]
    fn test_round_trip_through_toml() {
        let mut config = BackendConfig::default();
        config
            .containers
            .insert("media".to_string(), "media-bucket/wiki".to_string());
        config.local_cache = Some(LocalCacheConfig {
            dir: PathBuf::from("/tmp/cache"),
            min_cache_bytes: 10,
        });
        let parsed = BackendConfig::from_toml(&config.to_toml().unwrap()).unwrap();
        assert_eq!(parsed.containers, config.containers);
        assert_eq!(parsed.local_cache, config.local_cache);
    }
}
