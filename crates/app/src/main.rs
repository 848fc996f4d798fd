// CLI modules
mod cli;
mod logging;
mod state;

use clap::{Parser, Subcommand};
use cli::{args::Args, op::Op, Contacts, Files, Init, Version, Whoami};

command_enum! {
    (Contacts, Contacts),
    (Files, Files),
    (Init, Init),
    (Version, Version),
    (Whoami, Whoami),
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let ctx = cli::op::OpContext::new(args.config_path);

    // before `init` there is no config yet; log with defaults
    let guards = logging::init_logging(ctx.state().ok().as_ref());

    let code = match args.command.execute(&ctx).await {
        Ok(output) => {
            println!("{}", output);
            0
        }
        Err(e) => {
            tracing::debug!(error = ?e, "command failed");
            eprintln!("Error: {}", e);
            1
        }
    };

    // flush buffered log lines before exiting
    drop(guards);
    std::process::exit(code);
}
