use clap::Args;
use futures::StreamExt;

use common::prelude::{FileBackend, StoragePath};

use crate::op::ContextError;

#[derive(Args, Debug, Clone)]
pub struct Ls {
    /// Directory to list (a container name lists the whole container)
    pub dir: StoragePath,

    /// Descend into subdirectories
    #[arg(long, short)]
    pub recursive: bool,

    /// List directories instead of files
    #[arg(long)]
    pub dirs: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum LsError {
    #[error(transparent)]
    Context(#[from] ContextError),

    #[error("cannot list {0}")]
    Unlistable(StoragePath),
}

#[async_trait::async_trait]
impl crate::op::Op for Ls {
    type Error = LsError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let backend = ctx.backend().await?;
        let top_only = !self.recursive;
        let stream = if self.dirs {
            backend.list_directories(&self.dir, top_only)
        } else {
            backend.list_files(&self.dir, top_only)
        }
        .ok_or_else(|| LsError::Unlistable(self.dir.clone()))?;

        let entries: Vec<String> = stream.collect().await;
        Ok(entries.join("\n"))
    }
}
