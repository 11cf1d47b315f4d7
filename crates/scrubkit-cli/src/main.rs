use clap::Parser;
use tracing_subscriber::EnvFilter;

mod args;
mod commands;
mod report;

use args::{Cli, Command};

fn main() {
    // Load .env file if present, before clap reads env-backed flags
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // RUST_LOG wins; otherwise -v switches the default from warn to debug.
    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match &cli.command {
        Command::Run(args) => commands::run::run(args),
        Command::Validate(args) => commands::validate::run(args),
        Command::Pii(args) => commands::pii::run(args),
        Command::Schema(args) => commands::schema::run(args),
    };

    if let Err(err) = result {
        eprintln!("Error: {:#}", err);
        std::process::exit(1);
    }
}
