use clap::Args;

use common::prelude::{FileBackend, StoragePath};

use crate::op::{status_output, ContextError, StatusError};

#[derive(Args, Debug, Clone)]
pub struct Rm {
    pub path: StoragePath,

    /// Succeed when the file does not exist
    #[arg(long)]
    pub ignore_missing: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum RmError {
    #[error(transparent)]
    Context(#[from] ContextError),

    #[error("delete failed: {0}")]
    Failed(#[from] StatusError),
}

#[async_trait::async_trait]
impl crate::op::Op for Rm {
    type Error = RmError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let backend = ctx.backend().await?;
        let status = backend.delete(&self.path, self.ignore_missing).await;
        Ok(status_output(status, format!("deleted {}", self.path))?)
    }
}
