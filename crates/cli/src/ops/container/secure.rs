use clap::Args;

use common::prelude::{FileBackend, PathError, PrepareOptions, StoragePath};

use crate::op::{status_output, ContextError, StatusError};

/// Mark a container private; new uploads into it are not publicly readable.
#[derive(Args, Debug, Clone)]
pub struct Secure {
    pub container: String,
}

#[derive(Debug, thiserror::Error)]
pub enum SecureError {
    #[error(transparent)]
    Context(#[from] ContextError),

    #[error("invalid container: {0}")]
    Path(#[from] PathError),

    #[error("secure failed: {0}")]
    Failed(#[from] StatusError),
}

#[async_trait::async_trait]
impl crate::op::Op for Secure {
    type Error = SecureError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let root = StoragePath::container_root(&self.container)?;
        let backend = ctx.backend().await?;
        let options = PrepareOptions {
            access: false,
            no_access: true,
        };
        let status = backend.prepare(&root, options).await;
        Ok(status_output(status, format!("{} is private", self.container))?)
    }
}
