use std::error::Error;
use std::path::PathBuf;

use common::config::ConfigError;
use common::prelude::{S3FileBackend, Status};

use crate::state::{AppState, StateError};

#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    #[error(transparent)]
    State(#[from] StateError),

    #[error("failed to build backend: {0}")]
    Config(#[from] ConfigError),
}

/// A mutation that came back with a fatal status.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct StatusError(pub Status);

/// Turn a status into command output, listing its warnings.
pub fn status_output(status: Status, done: impl Into<String>) -> Result<String, StatusError> {
    if !status.is_ok() {
        return Err(StatusError(status));
    }
    let mut lines = vec![done.into()];
    lines.extend(status.warnings().iter().map(|w| format!("warning: {}", w)));
    Ok(lines.join("\n"))
}

#[derive(Clone, Debug)]
pub struct OpContext {
    /// Optional custom config path (defaults to ~/.bucketeer)
    pub config_path: Option<PathBuf>,
}

impl OpContext {
    pub fn new(config_path: Option<PathBuf>) -> Self {
        Self { config_path }
    }

    pub fn state(&self) -> Result<AppState, StateError> {
        AppState::load(self.config_path.clone())
    }

    /// Load the config and build a backend over the store it selects.
    pub async fn backend(&self) -> Result<S3FileBackend, ContextError> {
        let state = self.state()?;
        Ok(S3FileBackend::from_config(&state.config).await?)
    }
}

#[async_trait::async_trait]
pub trait Op: Send + Sync {
    type Error: Error + Send + Sync + 'static;
    type Output;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error>;
}

#[macro_export]
macro_rules! command_enum {
    ($(($variant:ident, $type:ty)),* $(,)?) => {
        #[derive(Subcommand, Debug, Clone)]
        pub enum Command {
            $($variant($type),)*
        }

        #[derive(Debug)]
        pub enum OpOutput {
            $($variant(<$type as $crate::op::Op>::Output),)*
        }

        #[derive(Debug, thiserror::Error)]
        pub enum OpError {
            $(
                #[error(transparent)]
                $variant(<$type as $crate::op::Op>::Error),
            )*
        }

        #[async_trait::async_trait]
        impl $crate::op::Op for Command {
            type Output = OpOutput;
            type Error = OpError;

            async fn execute(
                &self,
                ctx: &$crate::op::OpContext,
            ) -> Result<Self::Output, Self::Error> {
                match self {
                    $(
                        Command::$variant(op) => {
                            op.execute(ctx).await
                                .map(OpOutput::$variant)
                                .map_err(OpError::$variant)
                        },
                    )*
                }
            }
        }

        impl std::fmt::Display for OpOutput {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(
                        OpOutput::$variant(output) => write!(f, "{}", output),
                    )*
                }
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use common::prelude::Fatal;

    use super::*;

    #[test]
    fn test_status_output_lists_warnings() {
        let output = status_output(Status::ok().with_warning("slow"), "done").unwrap();
        assert_eq!(output, "done\nwarning: slow");
    }

    #[test]
    fn test_status_output_fatal() {
        let status = Status::fatal(Fatal::DeleteFailed {
            path: "media/a".to_string(),
        });
        let err = status_output(status, "done").unwrap_err();
        assert_eq!(err.to_string(), "backend-fail-delete: media/a");
    }
}
