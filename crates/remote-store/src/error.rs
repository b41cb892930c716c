//! Error types surfaced by object store clients.

use std::fmt;

/// Provider error codes the adapter layer distinguishes.
///
/// Anything the adapter does not branch on is kept verbatim in [`ErrorCode::Other`]
/// so it can still be logged with the provider's wording.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// The bucket does not exist
    NoSuchBucket,
    /// The object does not exist (GET, DELETE, COPY source)
    NoSuchKey,
    /// The object does not exist (HEAD responses carry no body, so no code)
    NotFound,
    /// A conditional request did not match (ETag / If-Modified-Since)
    PreconditionFailed,
    /// Credentials were rejected or lack permission
    AccessDenied,
    /// The bucket name is already taken on creation
    BucketAlreadyExists,
    /// Transport-level failure before a provider answer was received
    Transport,
    /// Any other provider code
    Other(String),
}

impl ErrorCode {
    pub fn as_str(&self) -> &str {
        match self {
            ErrorCode::NoSuchBucket => "NoSuchBucket",
            ErrorCode::NoSuchKey => "NoSuchKey",
            ErrorCode::NotFound => "NotFound",
            ErrorCode::PreconditionFailed => "PreconditionFailed",
            ErrorCode::AccessDenied => "AccessDenied",
            ErrorCode::BucketAlreadyExists => "BucketAlreadyExists",
            ErrorCode::Transport => "Transport",
            ErrorCode::Other(code) => code,
        }
    }

    pub fn parse(code: &str) -> Self {
        match code {
            "NoSuchBucket" => ErrorCode::NoSuchBucket,
            "NoSuchKey" => ErrorCode::NoSuchKey,
            "NotFound" => ErrorCode::NotFound,
            "PreconditionFailed" => ErrorCode::PreconditionFailed,
            "AccessDenied" => ErrorCode::AccessDenied,
            "BucketAlreadyExists" | "BucketAlreadyOwnedByYou" => ErrorCode::BucketAlreadyExists,
            "Transport" => ErrorCode::Transport,
            other => ErrorCode::Other(other.to_string()),
        }
    }

    /// Whether this code means "the object is not there".
    pub fn is_missing_object(&self) -> bool {
        matches!(self, ErrorCode::NoSuchKey | ErrorCode::NotFound)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed call against the remote object store.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{code}: {message}")]
pub struct RemoteError {
    pub code: ErrorCode,
    pub message: String,
}

impl RemoteError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn no_such_bucket(bucket: &str) -> Self {
        Self::new(
            ErrorCode::NoSuchBucket,
            format!("The specified bucket does not exist: {}", bucket),
        )
    }

    pub fn no_such_key(bucket: &str, key: &str) -> Self {
        Self::new(
            ErrorCode::NoSuchKey,
            format!("The specified key does not exist: {}/{}", bucket, key),
        )
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Transport, message)
    }
}

impl From<object_store::Error> for RemoteError {
    fn from(err: object_store::Error) -> Self {
        let message = err.to_string();
        let code = match &err {
            object_store::Error::NotFound { .. } => {
                // Both a missing bucket and a missing key arrive as NotFound
                if message.contains("NoSuchBucket") {
                    ErrorCode::NoSuchBucket
                } else {
                    ErrorCode::NoSuchKey
                }
            }
            object_store::Error::Precondition { .. } | object_store::Error::NotModified { .. } => {
                ErrorCode::PreconditionFailed
            }
            _ => code_from_message(&message),
        };
        Self { code, message }
    }
}

/// Recover a provider code from an error message that only embeds it in text.
fn code_from_message(message: &str) -> ErrorCode {
    const KNOWN: [&str; 5] = [
        "NoSuchBucket",
        "NoSuchKey",
        "AccessDenied",
        "BucketAlreadyOwnedByYou",
        "BucketAlreadyExists",
    ];
    KNOWN
        .iter()
        .find(|code| message.contains(*code))
        .map(|code| ErrorCode::parse(code))
        .unwrap_or_else(|| ErrorCode::Other("InternalError".to_string()))
}

/// Errors raised while constructing a client.
#[derive(Debug, thiserror::Error)]
pub enum ClientConfigError {
    #[error("invalid client configuration: {0}")]
    Invalid(String),
}

/// Result type alias for object store calls.
pub type Result<T> = std::result::Result<T, RemoteError>;
