use clap::Args;

use common::prelude::{FileBackend, FileStat, StoragePath};

use crate::op::ContextError;

#[derive(Args, Debug, Clone)]
pub struct Stat {
    pub path: StoragePath,
}

#[derive(Debug, thiserror::Error)]
pub enum StatError {
    #[error(transparent)]
    Context(#[from] ContextError),

    #[error("no such file: {0}")]
    NotFound(StoragePath),
}

fn render(path: &StoragePath, stat: &FileStat) -> String {
    let mut lines = vec![
        format!("path:   {}", path),
        format!("size:   {}", stat.size),
        format!("mtime:  {}", stat.mtime.to_rfc3339()),
    ];
    if let Some(content_type) = &stat.content_type {
        lines.push(format!("type:   {}", content_type));
    }
    if let Some(etag) = &stat.etag {
        lines.push(format!("etag:   {}", etag));
    }
    if let Some(sha1) = &stat.sha1 {
        lines.push(format!("sha1:   {}", sha1));
    }
    lines.join("\n")
}

#[async_trait::async_trait]
impl crate::op::Op for Stat {
    type Error = StatError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let backend = ctx.backend().await?;
        let stat = backend
            .stat(&self.path)
            .await
            .ok_or_else(|| StatError::NotFound(self.path.clone()))?;
        Ok(render(&self.path, &stat))
    }
}
