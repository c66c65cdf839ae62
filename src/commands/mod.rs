// src/commands/mod.rs
//! Command handlers for the kiln CLI

mod plugins;
mod session;
mod tasks;

pub use plugins::{cmd_upgrade_config, cmd_verify_plugins};
pub use session::Session;
pub use tasks::{cmd_run, cmd_tasks};
