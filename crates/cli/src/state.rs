use std::{fs, path::PathBuf};

use common::config::{BackendConfig, ConfigError, LocalCacheConfig};

pub const APP_NAME: &str = "bucketeer";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const CACHE_DIR_NAME: &str = "cache";

#[derive(Debug, Clone)]
pub struct AppState {
    /// Path to the state directory (~/.bucketeer or custom)
    pub app_dir: PathBuf,
    /// Path to the local copy cache
    pub cache_path: PathBuf,
    /// Path to the config file
    pub config_path: PathBuf,
    /// Loaded backend configuration
    pub config: BackendConfig,
}

impl AppState {
    /// Get the state directory path (custom or default ~/.bucketeer)
    pub fn app_dir(custom_path: Option<PathBuf>) -> Result<PathBuf, StateError> {
        if let Some(path) = custom_path {
            return Ok(path);
        }

        let home = dirs::home_dir().ok_or(StateError::NoHomeDirectory)?;
        Ok(home.join(format!(".{}", APP_NAME)))
    }

    /// Initialize a new state directory
    pub fn init(
        custom_path: Option<PathBuf>,
        mut config: BackendConfig,
    ) -> Result<Self, StateError> {
        let app_dir = Self::app_dir(custom_path)?;

        if app_dir.exists() {
            return Err(StateError::AlreadyInitialized);
        }
        if config.containers.is_empty() {
            return Err(StateError::Config(ConfigError::MissingContainers));
        }

        fs::create_dir_all(&app_dir)?;

        let cache_path = app_dir.join(CACHE_DIR_NAME);
        fs::create_dir_all(&cache_path)?;
        if config.local_cache.is_none() {
            config.local_cache = Some(LocalCacheConfig {
                dir: cache_path.clone(),
                min_cache_bytes: common::config::DEFAULT_MIN_CACHE_BYTES,
            });
        }

        let config_path = app_dir.join(CONFIG_FILE_NAME);
        fs::write(&config_path, config.to_toml()?)?;

        Ok(Self {
            app_dir,
            cache_path,
            config_path,
            config,
        })
    }

    /// Load existing state from the state directory
    pub fn load(custom_path: Option<PathBuf>) -> Result<Self, StateError> {
        let app_dir = Self::app_dir(custom_path)?;

        if !app_dir.exists() {
            return Err(StateError::NotInitialized);
        }

        let cache_path = app_dir.join(CACHE_DIR_NAME);
        let config_path = app_dir.join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            return Err(StateError::MissingFile(CONFIG_FILE_NAME.to_string()));
        }

        let config_toml = fs::read_to_string(&config_path)?;
        let config = BackendConfig::from_toml(&config_toml)?;

        Ok(Self {
            app_dir,
            cache_path,
            config_path,
            config,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("bucketeer directory not initialized. Run 'bucketeer init' first")]
    NotInitialized,

    #[error("bucketeer directory already initialized")]
    AlreadyInitialized,

    #[error("no home directory found")]
    NoHomeDirectory,

    #[error("missing required file: {0}")]
    MissingFile(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config() -> BackendConfig {
        BackendConfig {
            containers: HashMap::from([("media".to_string(), "media-bucket".to_string())]),
            ..Default::default()
        }
    }

    #[test]
    fn test_init_then_load() {
        let temp = tempfile::tempdir().unwrap();
        let dir = temp.path().join("state");

        let state = AppState::init(Some(dir.clone()), config()).unwrap();
        assert!(state.config_path.exists());
        assert!(state.cache_path.is_dir());

        let loaded = AppState::load(Some(dir)).unwrap();
        assert_eq!(loaded.config.containers, state.config.containers);
        assert_eq!(
            loaded.config.local_cache.map(|cache| cache.dir),
            Some(state.cache_path)
        );
    }

    #[test]
    fn test_init_twice_fails() {
        let temp = tempfile::tempdir().unwrap();
        let dir = temp.path().join("state");
        AppState::init(Some(dir.clone()), config()).unwrap();
        assert!(matches!(
            AppState::init(Some(dir), config()),
            Err(StateError::AlreadyInitialized)
        ));
    }

    #[test]
    fn test_load_uninitialized() {
        let temp = tempfile::tempdir().unwrap();
        assert!(matches!(
            AppState::load(Some(temp.path().join("missing"))),
            Err(StateError::NotInitialized)
        ));
    }

    #[test]
    fn test_init_requires_containers() {
        let temp = tempfile::tempdir().unwrap();
        let err = AppState::init(Some(temp.path().join("state")), BackendConfig::default())
            .unwrap_err();
        assert!(matches!(err, StateError::Config(ConfigError::MissingContainers)));
    }
}
