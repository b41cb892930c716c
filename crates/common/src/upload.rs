//! Upload sources and the headers callers may attach to writes.

use std::path::PathBuf;

use bytes::Bytes;
use chrono::{DateTime, Utc};

const OCTET_STREAM: &str = "application/octet-stream";

/// Content of a create or store.
#[derive(Debug, Clone)]
pub enum UploadSource {
    /// In-memory content
    Bytes(Bytes),
    /// A local file, read at upload time
    File(PathBuf),
}

impl UploadSource {
    /// Human-readable origin for logs and statuses.
    pub fn describe(&self) -> String {
        match self {
            UploadSource::Bytes(body) => format!("<{} bytes>", body.len()),
            UploadSource::File(path) => path.display().to_string(),
        }
    }
}

impl From<Bytes> for UploadSource {
    fn from(body: Bytes) -> Self {
        UploadSource::Bytes(body)
    }
}

impl From<Vec<u8>> for UploadSource {
    fn from(body: Vec<u8>) -> Self {
        UploadSource::Bytes(Bytes::from(body))
    }
}

impl From<&'static str> for UploadSource {
    fn from(body: &'static str) -> Self {
        UploadSource::Bytes(Bytes::from_static(body.as_bytes()))
    }
}

impl From<PathBuf> for UploadSource {
    fn from(path: PathBuf) -> Self {
        UploadSource::File(path)
    }
}

/// Optional headers for create, store and copy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectHeaders {
    pub content_type: Option<String>,
    pub content_disposition: Option<String>,
    /// Copy only: source ETag must match
    pub if_match: Option<String>,
    /// Copy only: source must have changed after this instant
    pub if_modified_since: Option<DateTime<Utc>>,
}

/// Pick a content type for a file source.
pub fn content_type_for_file(local: &std::path::Path, destination: &str) -> String {
    mime_guess::from_path(local)
        .first()
        .or_else(|| mime_guess::from_path(destination).first())
        .map(|mime| mime.essence_str().to_string())
        .unwrap_or_else(|| OCTET_STREAM.to_string())
}

/// Pick a content type for in-memory content by looking at it first.
pub fn content_type_for_bytes(body: &[u8], destination: &str) -> String {
    if let Some(sniffed) = sniff(body) {
        return sniffed.to_string();
    }
    mime_guess::from_path(destination)
        .first()
        .map(|mime| mime.essence_str().to_string())
        .unwrap_or_else(|| OCTET_STREAM.to_string())
}

fn sniff(body: &[u8]) -> Option<&'static str> {
    const MAGIC: [(&[u8], &str); 9] = [
        (b"\x89PNG\r\n\x1a\n", "image/png"),
        (b"\xff\xd8\xff", "image/jpeg"),
        (b"GIF87a", "image/gif"),
        (b"GIF89a", "image/gif"),
        (b"%PDF-", "application/pdf"),
        (b"PK\x03\x04", "application/zip"),
        (b"\x1f\x8b", "application/gzip"),
        (b"OggS", "application/ogg"),
        (b"<svg", "image/svg+xml"),
    ];
    if let Some((_, mime)) = MAGIC.iter().find(|(magic, _)| body.starts_with(magic)) {
        return Some(*mime);
    }
    if body.len() >= 12 && &body[..4] == b"RIFF" && &body[8..12] == b"WEBP" {
        return Some("image/webp");
    }
    // text only when there is something to look at
    if !body.is_empty() && std::str::from_utf8(body).is_ok() && !body.contains(&0) {
        return Some("text/plain");
    }
    None
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;

    #[test]
    fn test_file_prefers_local_name() {
        assert_eq!(
            content_type_for_file(Path::new("/tmp/upload.png"), "media/x.pdf"),
            "image/png"
        );
        assert_eq!(
            content_type_for_file(Path::new("/tmp/phpA1B2"), "media/x.pdf"),
            "application/pdf"
        );
        assert_eq!(
            content_type_for_file(Path::new("/tmp/phpA1B2"), "media/noext"),
            OCTET_STREAM
        );
    }

    #[test]
    fn test_bytes_sniffing() {
        assert_eq!(
            content_type_for_bytes(b"\x89PNG\r\n\x1a\n\0\0", "media/file.txt"),
            "image/png"
        );
        assert_eq!(content_type_for_bytes(b"plain words", "media/x"), "text/plain");
        assert_eq!(
            content_type_for_bytes(b"\x00\x01\x02", "media/x.json"),
            "application/json"
        );
        assert_eq!(content_type_for_bytes(b"", "media/none"), OCTET_STREAM);
    }
}
