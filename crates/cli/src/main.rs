// CLI modules
mod args;
mod logging;
mod op;
mod ops;
mod state;

use args::Args;
use clap::{Parser, Subcommand};
use op::Op;
use ops::{Container, Cp, Exists, Fetch, Init, Ls, Put, Rm, Stat, Url, Version};

command_enum! {
    (Init, Init),
    (Put, Put),
    (Cp, Cp),
    (Rm, Rm),
    (Stat, Stat),
    (Exists, Exists),
    (Ls, Ls),
    (Url, Url),
    (Fetch, Fetch),
    (Container, Container),
    (Version, Version),
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let guards = match logging::init_logging(args.log_level, args.log_dir.as_deref()) {
        Ok(guards) => guards,
        Err(e) => {
            eprintln!("Error: Failed to initialize logging: {:#}", e);
            std::process::exit(1);
        }
    };

    let ctx = op::OpContext::new(args.config_path);

    // exit() skips destructors, so flush the log writers first
    let code = match args.command.execute(&ctx).await {
        Ok(output) => {
            println!("{}", output);
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    };
    drop(guards);
    std::process::exit(code);
}
