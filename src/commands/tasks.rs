// src/commands/tasks.rs

//! Task listing and execution commands

use super::Session;
use anyhow::{bail, Result};
use tracing::info;

/// List the tasks provided by the project's plugins
pub fn cmd_tasks(session: &Session, verbose: bool) -> Result<()> {
    let loaded = session.load_tasks()?;

    if loaded.tasks.is_empty() {
        println!("No tasks available.");
        println!("\nDeclare plugins in kiln/config/kiln.toml to add tasks.");
        return Ok(());
    }

    let width = loaded.tasks.iter().map(|t| t.name.len()).max().unwrap_or(0);
    println!("Tasks ({}):", loaded.tasks.len());
    for task in &loaded.tasks {
        print!("  {:<width$}", task.name);
        if !task.description.is_empty() {
            print!("  {}", task.description);
        }
        if verbose {
            print!(" [{}]", task.plugin);
        }
        println!();
    }

    Ok(())
}

/// Run a task and return its exit code
pub fn cmd_run(session: &Session, name: &str, args: &[String]) -> Result<i32> {
    let loaded = session.load_tasks()?;

    let Some(task) = loaded.task(name) else {
        bail!("Unknown task '{}'. Use 'kiln tasks' to list available tasks.", name);
    };

    info!("Running task {} provided by {}", task.name, task.plugin);
    let status = task.run(&session.task_context(), args)?;
    // Terminated by a signal
    Ok(status.code().unwrap_or(1))
}
