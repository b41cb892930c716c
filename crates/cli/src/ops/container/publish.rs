use clap::Args;

use common::prelude::{FileBackend, PathError, PrepareOptions, StoragePath};

use crate::op::{status_output, ContextError, StatusError};

/// Mark a container public again.
#[derive(Args, Debug, Clone)]
pub struct Publish {
    pub container: String,
}

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error(transparent)]
    Context(#[from] ContextError),

    #[error("invalid container: {0}")]
    Path(#[from] PathError),

    #[error("publish failed: {0}")]
    Failed(#[from] StatusError),
}

#[async_trait::async_trait]
impl crate::op::Op for Publish {
    type Error = PublishError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let root = StoragePath::container_root(&self.container)?;
        let backend = ctx.backend().await?;
        let options = PrepareOptions {
            access: true,
            no_access: false,
        };
        let status = backend.prepare(&root, options).await;
        Ok(status_output(status, format!("{} is public", self.container))?)
    }
}
