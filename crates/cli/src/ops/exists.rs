use clap::Args;

use common::prelude::{FileBackend, StoragePath};

use crate::op::ContextError;

#[derive(Args, Debug, Clone)]
pub struct Exists {
    pub path: StoragePath,

    /// Check for a directory instead of a file
    #[arg(long)]
    pub dir: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum ExistsError {
    #[error(transparent)]
    Context(#[from] ContextError),
}

#[async_trait::async_trait]
impl crate::op::Op for Exists {
    type Error = ExistsError;
    type Output = bool;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let backend = ctx.backend().await?;
        if self.dir {
            Ok(backend.directory_exists(&self.path).await)
        } else {
            Ok(backend.stat(&self.path).await.is_some())
        }
    }
}
