//! Request and response types for object store calls.

use std::collections::HashMap;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Canned ACL applied to a written object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Acl {
    Private,
    PublicRead,
}

impl Acl {
    /// Value of the `x-amz-acl` header.
    pub fn as_str(&self) -> &'static str {
        match self {
            Acl::Private => "private",
            Acl::PublicRead => "public-read",
        }
    }
}

/// How a server-side copy treats the source object's metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MetadataDirective {
    /// Carry the source metadata over unchanged
    #[default]
    Copy,
    /// Replace it with the metadata on the request
    Replace,
}

/// A single-object upload.
#[derive(Debug, Clone)]
pub struct PutRequest {
    pub bucket: String,
    pub key: String,
    pub body: Bytes,
    pub content_type: Option<String>,
    pub content_disposition: Option<String>,
    pub acl: Acl,
    /// User metadata (`x-amz-meta-*`)
    pub metadata: HashMap<String, String>,
    /// Request server-side encryption (AES256)
    pub server_side_encryption: bool,
}

impl PutRequest {
    /// An empty private object with no metadata.
    pub fn empty(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
            body: Bytes::new(),
            content_type: None,
            content_disposition: None,
            acl: Acl::Private,
            metadata: HashMap::new(),
            server_side_encryption: false,
        }
    }
}

/// A server-side copy between two addresses.
#[derive(Debug, Clone)]
pub struct CopyRequest {
    pub src_bucket: String,
    pub src_key: String,
    pub dst_bucket: String,
    pub dst_key: String,
    pub acl: Acl,
    pub metadata_directive: MetadataDirective,
    /// Metadata to use with [`MetadataDirective::Replace`]
    pub metadata: HashMap<String, String>,
    /// Only copy if the source ETag matches
    pub if_match: Option<String>,
    /// Only copy if the source changed after this instant
    pub if_modified_since: Option<DateTime<Utc>>,
    pub server_side_encryption: bool,
}

/// Object attributes returned by a HEAD request.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectHead {
    pub size: u64,
    pub last_modified: DateTime<Utc>,
    pub etag: Option<String>,
    pub content_type: Option<String>,
    pub metadata: HashMap<String, String>,
}

/// One page of a prefix/delimiter listing.
#[derive(Debug, Clone, Default)]
pub struct ListRequest {
    pub bucket: String,
    pub prefix: String,
    /// Group keys on this delimiter into common prefixes
    pub delimiter: Option<String>,
    /// Page size cap; the store applies its own cap when unset
    pub max_keys: Option<usize>,
    /// Token from the previous page's [`ListPage::next_continuation`]
    pub continuation: Option<String>,
}

impl ListRequest {
    pub fn new(bucket: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            prefix: prefix.into(),
            ..Default::default()
        }
    }

    pub fn with_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = Some(delimiter.into());
        self
    }

    pub fn with_max_keys(mut self, max_keys: usize) -> Self {
        self.max_keys = Some(max_keys);
        self
    }
}

/// Page size applied when a listing does not ask for one, as S3 does.
pub const DEFAULT_MAX_KEYS: usize = 1000;

/// A listing page. Keys and prefixes are full keys, in lexicographic order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListPage {
    pub keys: Vec<String>,
    pub common_prefixes: Vec<String>,
    /// Set when more results remain
    pub next_continuation: Option<String>,
}

impl ListPage {
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty() && self.common_prefixes.is_empty()
    }

    /// Cut one page out of an ordered key set the way S3 does.
    ///
    /// Keys below the prefix are grouped on the delimiter; max_keys counts keys
    /// and common prefixes together, and the continuation token is the last
    /// entry returned. A token that is a common prefix also skips every key
    /// beneath it.
    pub fn from_sorted_keys<'a, I>(keys: I, request: &ListRequest) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let max_keys = request.max_keys.unwrap_or(DEFAULT_MAX_KEYS).max(1);
        let delimiter = request.delimiter.as_deref().filter(|d| !d.is_empty());
        let after = request.continuation.as_deref();

        let mut page = ListPage::default();
        let mut emitted = 0;
        let mut last: Option<String> = None;

        let candidates = keys
            .into_iter()
            .skip_while(|key| *key < request.prefix.as_str())
            .take_while(|key| key.starts_with(&request.prefix));

        for key in candidates {
            if let Some(token) = after {
                let under_token =
                    delimiter.is_some_and(|d| token.ends_with(d)) && key.starts_with(token);
                if key <= token || under_token {
                    continue;
                }
            }

            let rest = &key[request.prefix.len()..];
            let common = delimiter
                .and_then(|d| rest.find(d).map(|idx| idx + d.len()))
                .map(|end| format!("{}{}", request.prefix, &rest[..end]));

            if let Some(common) = &common {
                if page.common_prefixes.last() == Some(common) {
                    continue;
                }
            }

            if emitted == max_keys {
                page.next_continuation = last;
                return page;
            }

            let entry = match common {
                Some(common) => {
                    page.common_prefixes.push(common.clone());
                    common
                }
                None => {
                    page.keys.push(key.to_string());
                    key.to_string()
                }
            };
            emitted += 1;
            last = Some(entry);
        }

        page
    }
}
