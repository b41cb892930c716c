pub use clap::Parser;

use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "bucketeer")]
#[command(about = "Hierarchical file storage on S3-style object stores")]
pub struct Args {
    /// Path to the bucketeer config directory (defaults to ~/.bucketeer)
    #[arg(long, global = true)]
    pub config_path: Option<PathBuf>,

    /// Default log level; RUST_LOG overrides it
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: tracing::Level,

    /// Also write logs to a daily rolling file in this directory
    #[arg(long, global = true)]
    pub log_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: crate::Command,
}
