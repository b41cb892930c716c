use clap::Args;

use common::prelude::{FileBackend, PrepareOptions, StoragePath};

use crate::op::{status_output, ContextError, StatusError};

#[derive(Args, Debug, Clone)]
pub struct Prepare {
    /// Directory to prepare for writes
    pub dir: StoragePath,

    /// Make the container publicly readable
    #[arg(long, conflicts_with = "no_access")]
    pub access: bool,

    /// Make the container private
    #[arg(long)]
    pub no_access: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum PrepareError {
    #[error(transparent)]
    Context(#[from] ContextError),

    #[error("prepare failed: {0}")]
    Failed(#[from] StatusError),
}

#[async_trait::async_trait]
impl crate::op::Op for Prepare {
    type Error = PrepareError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let backend = ctx.backend().await?;
        let options = PrepareOptions {
            access: self.access,
            no_access: self.no_access,
        };
        let status = backend.prepare(&self.dir, options).await;
        Ok(status_output(status, format!("prepared {}", self.dir))?)
    }
}
