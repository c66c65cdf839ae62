// src/main.rs

mod cli;
mod commands;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use cli::{Cli, Commands};
use commands::Session;
use std::io;
use tracing_subscriber::EnvFilter;

fn log_filter(verbose: u8) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(match verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        })
    })
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(cli.verbose))
        .with_writer(io::stderr)
        .init();

    if let Commands::Completions { shell } = &cli.command {
        clap_complete::generate(*shell, &mut Cli::command(), "kiln", &mut io::stdout());
        return Ok(());
    }

    let use_cache = !cli.no_cache && !matches!(cli.command, Commands::VerifyPlugins);
    let session = Session::open(cli.project_dir, cli.home, use_cache, cli.debug)?;

    match cli.command {
        Commands::Tasks => commands::cmd_tasks(&session, cli.verbose > 0),
        Commands::Run { task, args } => {
            let code = commands::cmd_run(&session, &task, &args)?;
            if code != 0 {
                std::process::exit(code);
            }
            Ok(())
        }
        Commands::VerifyPlugins => commands::cmd_verify_plugins(&session),
        Commands::UpgradeConfig => commands::cmd_upgrade_config(&session),
        Commands::Completions { .. } => Ok(()),
    }
}
