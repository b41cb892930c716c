use std::time::Duration;

use clap::Args;

use common::prelude::{FileBackend, StoragePath};

use crate::op::ContextError;

#[derive(Args, Debug, Clone)]
pub struct Url {
    pub path: StoragePath,

    /// Seconds the URL stays valid (one day when omitted)
    #[arg(long)]
    pub ttl_secs: Option<u64>,
}

#[derive(Debug, thiserror::Error)]
pub enum UrlError {
    #[error(transparent)]
    Context(#[from] ContextError),

    #[error("no URL available for {0}")]
    Unavailable(StoragePath),
}

#[async_trait::async_trait]
impl crate::op::Op for Url {
    type Error = UrlError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let backend = ctx.backend().await?;
        let ttl = self.ttl_secs.map(Duration::from_secs);
        backend
            .get_http_url(&self.path, ttl)
            .await
            .map(|url| url.to_string())
            .ok_or_else(|| UrlError::Unavailable(self.path.clone()))
    }
}
