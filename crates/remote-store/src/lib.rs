//! Object store client capability
//!
//! This crate defines the small set of logical operations the storage adapter
//! issues against a flat bucket/key object store, and ships the backends it
//! can run on.
//!
//! # Backends
//!
//! - [`S3Client`]: Amazon S3 or any S3-compatible endpoint (MinIO, Ceph, ...)
//! - [`LocalClient`]: a directory per bucket on the local filesystem
//! - [`MemoryClient`]: in-process, for tests and dry runs
//!
//! # Example
//!
//! ```rust,no_run
//! use remote_store::{ListRequest, MemoryClient, ObjectStoreClient};
//!
//! # async fn example() -> Result<(), remote_store::RemoteError> {
//! let client = MemoryClient::with_buckets(["media"]);
//! let page = client
//!     .list_objects(&ListRequest::new("media", "thumbs/").with_delimiter("/"))
//!     .await?;
//! println!("{} keys, {} prefixes", page.keys.len(), page.common_prefixes.len());
//! # Ok(())
//! # }
//! ```

mod client;
mod error;
mod local;
mod memory;
mod s3;
mod types;

pub use client::ObjectStoreClient;
pub use error::{ClientConfigError, ErrorCode, RemoteError, Result};
pub use local::LocalClient;
pub use memory::{MemoryClient, StoredObject, MEMORY_URL_SCHEME};
pub use s3::{S3Client, S3Config};
pub use types::{
    Acl, CopyRequest, ListPage, ListRequest, MetadataDirective, ObjectHead, PutRequest,
    DEFAULT_MAX_KEYS,
};
