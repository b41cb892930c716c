use clap::Args;

use common::prelude::{FileBackend, ObjectHeaders, StoragePath};

use crate::op::{status_output, ContextError, StatusError};

#[derive(Args, Debug, Clone)]
pub struct Cp {
    pub src: StoragePath,

    pub dst: StoragePath,

    /// Succeed when the source does not exist
    #[arg(long)]
    pub ignore_missing: bool,

    /// Only copy when the source ETag matches
    #[arg(long)]
    pub if_match: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum CpError {
    #[error(transparent)]
    Context(#[from] ContextError),

    #[error("copy failed: {0}")]
    Failed(#[from] StatusError),
}

#[async_trait::async_trait]
impl crate::op::Op for Cp {
    type Error = CpError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let backend = ctx.backend().await?;
        let headers = ObjectHeaders {
            if_match: self.if_match.clone(),
            ..Default::default()
        };
        let status = backend
            .copy(&self.src, &self.dst, &headers, self.ignore_missing)
            .await;
        Ok(status_output(
            status,
            format!("copied {} -> {}", self.src, self.dst),
        )?)
    }
}
