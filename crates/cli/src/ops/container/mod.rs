use clap::{Args, Subcommand};

pub mod clean;
pub mod prepare;
pub mod publish;
pub mod secure;

use crate::op::Op;

crate::command_enum! {
    (Prepare, prepare::Prepare),
    (Clean, clean::Clean),
    (Secure, secure::Secure),
    (Publish, publish::Publish),
}

// Rename the generated Command to ContainerCommand for clarity
pub type ContainerCommand = Command;

#[derive(Args, Debug, Clone)]
pub struct Container {
    #[command(subcommand)]
    pub command: ContainerCommand,
}

#[async_trait::async_trait]
impl Op for Container {
    type Error = OpError;
    type Output = OpOutput;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        self.command.execute(ctx).await
    }
}
