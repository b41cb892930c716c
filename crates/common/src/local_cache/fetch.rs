use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use url::Url;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected response status {0}")]
    Status(u16),

    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("unsupported url: {0}")]
    UnsupportedUrl(String),
}

/// Outcome of a completed download.
#[derive(Debug, Clone, Default)]
pub struct FetchReport {
    pub bytes: u64,
    pub elapsed: Duration,
    /// Non-fatal diagnostics raised during the transfer
    pub warnings: Vec<String>,
}

/// Downloads a URL to a local file.
#[async_trait]
pub trait Fetcher: Send + Sync + std::fmt::Debug {
    /// Write the body of `url` to `dest`. `dest` is either written completely
    /// or left untouched.
    async fn fetch(&self, url: &Url, dest: &Path) -> Result<FetchReport, FetchError>;
}

/// Fetches `http(s)` URLs with `reqwest` and `file` URLs by copying.
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn fetch_http(&self, url: &Url, part: &Path) -> Result<(u64, Vec<String>), FetchError> {
        let mut response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        let expected = response.content_length();

        let mut file = tokio::fs::File::create(part).await?;
        let mut written: u64 = 0;
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        let mut warnings = Vec::new();
        if let Some(expected) = expected {
            if expected != written {
                warnings.push(format!(
                    "short read from {}: expected {} bytes, got {}",
                    url.path(),
                    expected,
                    written
                ));
            }
        }
        Ok((written, warnings))
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &Url, dest: &Path) -> Result<FetchReport, FetchError> {
        let started = Instant::now();
        let part = part_path(dest);

        let result = match url.scheme() {
            "http" | "https" => self.fetch_http(url, &part).await,
            "file" => {
                let source = url
                    .to_file_path()
                    .map_err(|_| FetchError::UnsupportedUrl(url.to_string()))?;
                tokio::fs::copy(&source, &part)
                    .await
                    .map(|bytes| (bytes, Vec::new()))
                    .map_err(FetchError::from)
            }
            other => Err(FetchError::UnsupportedUrl(other.to_string())),
        };

        match result {
            Ok((bytes, warnings)) => {
                tokio::fs::rename(&part, dest).await?;
                Ok(FetchReport {
                    bytes,
                    elapsed: started.elapsed(),
                    warnings,
                })
            }
            Err(err) => {
                let _ = tokio::fs::remove_file(&part).await;
                Err(err)
            }
        }
    }
}

/// Sibling of `dest` a download is staged in.
pub fn part_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    dest.with_file_name(name)
}
