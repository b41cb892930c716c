use std::path::PathBuf;

use clap::Args;
use tokio::io::AsyncReadExt;

use common::prelude::{FileBackend, ObjectHeaders, StoragePath, UploadSource};

use crate::op::{status_output, ContextError, StatusError};

#[derive(Args, Debug, Clone)]
pub struct Put {
    /// Local file to upload, or - to read stdin
    pub source: PathBuf,

    /// Destination storage path (container/relative/path)
    pub path: StoragePath,

    /// Content type; guessed from the file when omitted
    #[arg(long)]
    pub content_type: Option<String>,

    /// Content-Disposition header to store with the object
    #[arg(long)]
    pub content_disposition: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum PutError {
    #[error(transparent)]
    Context(#[from] ContextError),

    #[error("failed to read stdin: {0}")]
    Stdin(#[from] std::io::Error),

    #[error("put failed: {0}")]
    Failed(#[from] StatusError),
}

#[async_trait::async_trait]
impl crate::op::Op for Put {
    type Error = PutError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let backend = ctx.backend().await?;
        let headers = ObjectHeaders {
            content_type: self.content_type.clone(),
            content_disposition: self.content_disposition.clone(),
            ..Default::default()
        };

        let status = if self.source.as_os_str() == "-" {
            let mut body = Vec::new();
            tokio::io::stdin().read_to_end(&mut body).await?;
            backend
                .create(&self.path, UploadSource::from(body), &headers)
                .await
        } else {
            backend.store(&self.path, &self.source, &headers).await
        };

        Ok(status_output(status, format!("stored {}", self.path))?)
    }
}
