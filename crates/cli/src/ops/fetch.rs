use std::path::PathBuf;

use clap::Args;

use common::prelude::{FileBackend, StoragePath};

use crate::op::ContextError;

#[derive(Args, Debug, Clone)]
pub struct Fetch {
    /// Files to fetch
    #[arg(required = true)]
    pub paths: Vec<StoragePath>,

    /// How many downloads run at once
    #[arg(long, default_value = "4")]
    pub chunk_size: usize,

    /// Copy fetched files into this directory
    #[arg(long)]
    pub out: Option<PathBuf>,
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error(transparent)]
    Context(#[from] ContextError),

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0} of {1} files could not be fetched")]
    Missing(usize, usize),
}

#[async_trait::async_trait]
impl crate::op::Op for Fetch {
    type Error = FetchError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let backend = ctx.backend().await?;
        let copies = backend.get_local_copies(&self.paths, self.chunk_size).await;

        if let Some(out) = &self.out {
            tokio::fs::create_dir_all(out)
                .await
                .map_err(|source| FetchError::Write {
                    path: out.clone(),
                    source,
                })?;
        }

        let mut lines = Vec::with_capacity(self.paths.len());
        let mut missing = 0;
        for path in &self.paths {
            let Some(copy) = copies.get(path).and_then(Option::as_ref) else {
                missing += 1;
                tracing::warn!(path = %path, "fetch failed");
                continue;
            };

            match (&self.out, path.file_name()) {
                (Some(out), Some(name)) => {
                    let target = out.join(name);
                    tokio::fs::copy(copy.path(), &target)
                        .await
                        .map_err(|source| FetchError::Write {
                            path: target.clone(),
                            source,
                        })?;
                    lines.push(format!("{} -> {}", path, target.display()));
                }
                _ if copy.is_temporary() => {
                    lines.push(format!("{} ({} bytes, not cached)", path, copy.size()));
                }
                _ => lines.push(format!("{} -> {}", path, copy.path().display())),
            }
        }

        if missing > 0 {
            return Err(FetchError::Missing(missing, self.paths.len()));
        }
        Ok(lines.join("\n"))
    }
}
