use std::collections::HashMap;
use std::path::PathBuf;

use clap::Args;

use common::config::{BackendConfig, StoreConfig};

use crate::state::{AppState, StateError};

#[derive(Args, Debug, Clone)]
pub struct Init {
    /// Container mapping as NAME=BUCKET[/PREFIX]; repeat for each container
    #[arg(
        long = "container",
        value_name = "NAME=LOCATION",
        required = true,
        value_parser = parse_container
    )]
    pub containers: Vec<(String, String)>,

    /// AWS region for the S3 store
    #[arg(long)]
    pub region: Option<String>,

    /// Custom S3-compatible endpoint (host or URL)
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Talk plain HTTP to the endpoint
    #[arg(long)]
    pub no_https: bool,

    /// Request server-side encryption for every upload
    #[arg(long)]
    pub encryption: bool,

    /// Store every object privately
    #[arg(long)]
    pub private: bool,

    /// Create missing buckets on prepare
    #[arg(long)]
    pub create_buckets: bool,

    /// Keep objects on the local filesystem under this root instead of S3
    #[arg(long)]
    pub local_root: Option<PathBuf>,
}

fn parse_container(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((name, spec)) if !name.is_empty() && !spec.is_empty() => {
            Ok((name.to_string(), spec.to_string()))
        }
        _ => Err(format!("expected NAME=LOCATION, got {:?}", raw)),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("init failed: {0}")]
    StateFailed(#[from] StateError),
}

impl Init {
    fn config(&self) -> BackendConfig {
        let store = match &self.local_root {
            Some(root) => StoreConfig::Local { root: root.clone() },
            None => StoreConfig::S3,
        };
        BackendConfig {
            containers: self.containers.iter().cloned().collect::<HashMap<_, _>>(),
            encryption: self.encryption,
            use_https: !self.no_https,
            region: self.region.clone(),
            endpoint: self.endpoint.clone(),
            private_wiki: self.private.then_some(true),
            create_buckets: self.create_buckets,
            store,
            ..Default::default()
        }
    }
}

#[async_trait::async_trait]
impl crate::op::Op for Init {
    type Error = InitError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let state = AppState::init(ctx.config_path.clone(), self.config())?;

        let mut containers = state.config.containers.keys().cloned().collect::<Vec<_>>();
        containers.sort();

        Ok(format!(
            "Initialized bucketeer directory at: {}\n  - Config: {}\n  - Cache: {}\n  - Containers: {}",
            state.app_dir.display(),
            state.config_path.display(),
            state.cache_path.display(),
            containers.join(", ")
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::op::{Op, OpContext};

    #[test]
    fn test_parse_container() {
        assert_eq!(
            parse_container("media=wiki-media/a/b").unwrap(),
            ("media".to_string(), "wiki-media/a/b".to_string())
        );
        assert!(parse_container("media").is_err());
        assert!(parse_container("=bucket").is_err());
    }

    #[tokio::test]
    async fn test_init_writes_local_store_config() {
        let temp = tempfile::tempdir().unwrap();
        let dir = temp.path().join("state");
        let init = Init {
            containers: vec![("media".to_string(), "media-bucket".to_string())],
            region: None,
            endpoint: None,
            no_https: false,
            encryption: false,
            private: false,
            create_buckets: true,
            local_root: Some(temp.path().join("objects")),
        };

        let output = init.execute(&OpContext::new(Some(dir.clone()))).await.unwrap();
        assert!(output.contains("media"));

        let state = AppState::load(Some(dir)).unwrap();
        assert!(state.config.create_buckets);
        assert!(matches!(state.config.store, StoreConfig::Local { .. }));
    }
}
