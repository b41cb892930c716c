use clap::Args;

use common::prelude::{FileBackend, StoragePath};

use crate::op::{status_output, ContextError, StatusError};

#[derive(Args, Debug, Clone)]
pub struct Clean {
    pub dir: StoragePath,
}

#[derive(Debug, thiserror::Error)]
pub enum CleanError {
    #[error(transparent)]
    Context(#[from] ContextError),

    #[error("clean failed: {0}")]
    Failed(#[from] StatusError),
}

#[async_trait::async_trait]
impl crate::op::Op for Clean {
    type Error = CleanError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let backend = ctx.backend().await?;
        let status = backend.clean(&self.dir).await;
        Ok(status_output(status, format!("cleaned {}", self.dir))?)
    }
}
