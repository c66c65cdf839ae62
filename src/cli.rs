// src/cli.rs
//! CLI definitions for kiln
//!
//! The command implementations are in the `commands` module.

use clap::{ArgAction, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "kiln")]
#[command(author = "Kiln Contributors")]
#[command(version)]
#[command(about = "Resolve build plugins and run the tasks they provide", long_about = None)]
pub struct Cli {
    /// Project directory (default: current directory)
    #[arg(short = 'C', long, global = true, value_name = "DIR")]
    pub project_dir: Option<PathBuf>,

    /// Kiln home directory (default: $KILN_HOME or ~/.kiln)
    #[arg(long, global = true, value_name = "DIR")]
    pub home: Option<PathBuf>,

    /// Neither read nor write the plugin cache
    #[arg(long, global = true)]
    pub no_cache: bool,

    /// Pass the debug flag to plugins that accept one
    #[arg(long, global = true)]
    pub debug: bool,

    /// Increase log verbosity (-v for info, -vv for debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the tasks provided by the project's plugins
    Tasks,

    /// Run a plugin task
    Run {
        /// Task name
        task: String,

        /// Arguments passed to the task
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Resolve the project's plugins and check that they are compatible
    VerifyPlugins,

    /// Upgrade plugin configuration files to their current format
    UpgradeConfig,

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}
