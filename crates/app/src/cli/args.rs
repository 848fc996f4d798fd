pub use clap::Parser;

use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "bedrock")]
#[command(about = "Client-side encrypted drive on a local ledger")]
pub struct Args {
    /// Path to the bedrock state directory (defaults to ~/.bedrock)
    #[arg(long, global = true)]
    pub config_path: Option<PathBuf>,

    #[command(subcommand)]
    pub command: crate::Command,
}
