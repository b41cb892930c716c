/**
 * S3-style storage adapter: hierarchical file paths
 *  over a flat bucket/key object store.
 */
pub mod backend;
/**
 * Remote-store failures mapped onto operation statuses.
 */
pub mod classify;
pub mod config;
/**
 * Create, store, copy, delete and stat of single objects.
 */
pub mod executor;
pub mod hash;
/**
 * Directory listings emulated with prefix and
 *  delimiter queries.
 */
pub mod listing;
/**
 * Local copies of remote objects: cache store,
 *  download and retention.
 */
pub mod local_cache;
pub mod path;
pub mod registry;
pub mod resolver;
pub mod status;
pub mod upload;
/**
 * Public/private state of containers, kept with a
 *  marker object per container.
 */
pub mod zones;

pub mod prelude {
    pub use crate::backend::{FileBackend, PrepareOptions, S3FileBackend};
    pub use crate::config::{BackendConfig, ConfigError, StoreConfig};
    pub use crate::executor::{FileStat, DEFAULT_URL_TTL};
    pub use crate::local_cache::LocalFile;
    pub use crate::path::{PathError, StoragePath};
    pub use crate::status::{Fatal, Status};
    pub use crate::upload::{ObjectHeaders, UploadSource};
}
