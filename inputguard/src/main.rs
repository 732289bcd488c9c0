// inputguard/src/main.rs
//! InputGuard entry point.

use anyhow::Result;
use clap::Parser;

use inputguard::cli::{Cli, Commands};
use inputguard::commands::{self, check, config, redact, relay, session};
use inputguard::logger;
use inputguard::output::{self, Tone};

async fn run(args: Cli) -> Result<()> {
    let guard_config = commands::load_config(args.config.as_deref())?;

    match args.command {
        Commands::Relay => relay::run_relay(&guard_config).await,
        Commands::Check(cmd) => check::run_check(cmd, &guard_config).await,
        Commands::Redact(cmd) => redact::run_redact(cmd),
        Commands::Config(cmd) => config::run_config(cmd, &guard_config),
        Commands::Session(cmd) => session::run_session(cmd, &guard_config).await,
    }
}

#[tokio::main]
async fn main() {
    let args = Cli::parse();
    logger::init_logger(logger::level_from_flags(args.quiet, args.debug));

    if let Err(e) = run(args).await {
        output::err(Tone::Error, &format!("Error: {:#}", e));
        std::process::exit(1);
    }
}
