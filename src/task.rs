// src/task.rs

//! Runnable tasks materialized from resolved plugins
//!
//! A [`Task`] binds a task declared by a plugin to the plugin executable and
//! asset files on disk. Running it spawns the plugin with the declared
//! command, the global flags the plugin understands, and the caller's
//! arguments.

use crate::error::{Error, Result};
use crate::locator::Locator;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use tracing::debug;

/// Flag used to pass asset paths to a plugin
pub const ASSETS_FLAG: &str = "--assets";

/// Names of the global flags a plugin task accepts
///
/// A flag is only passed when the plugin declares its name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalFlagOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug_flag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_dir_flag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_flag: Option<String>,
}

/// How a task participates in project-wide verification
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyOptions {
    /// Arguments added when verification should apply fixes
    #[serde(default)]
    pub apply_true_args: Vec<String>,
    /// Arguments added when verification should only check
    #[serde(default)]
    pub apply_false_args: Vec<String>,
    /// Relative ordering among verify tasks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ordering: Option<i32>,
}

/// Invocation-time values supplied by the caller
#[derive(Debug, Clone, Default)]
pub struct TaskContext {
    pub project_dir: Option<PathBuf>,
    /// Directory holding plugin configuration files
    pub config_dir: Option<PathBuf>,
    pub debug: bool,
}

/// The executable, fixed command and assets behind a task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskInvocation {
    pub executable: PathBuf,
    pub command: Vec<String>,
    pub asset_paths: Vec<PathBuf>,
    pub global_flags: GlobalFlagOptions,
}

impl TaskInvocation {
    /// Arguments preceding the task command: global flags then assets
    fn leading_args(&self, ctx: &TaskContext, config_file: Option<&str>) -> Vec<String> {
        let mut args = Vec::new();

        if ctx.debug
            && let Some(flag) = &self.global_flags.debug_flag
        {
            args.push(flag.clone());
        }
        if let (Some(flag), Some(dir)) = (&self.global_flags.project_dir_flag, &ctx.project_dir) {
            args.push(flag.clone());
            args.push(dir.to_string_lossy().to_string());
        }
        if let (Some(flag), Some(dir), Some(file)) =
            (&self.global_flags.config_flag, &ctx.config_dir, config_file)
        {
            args.push(flag.clone());
            args.push(dir.join(file).to_string_lossy().to_string());
        }
        if !self.asset_paths.is_empty() {
            let joined = self
                .asset_paths
                .iter()
                .map(|p| p.to_string_lossy().to_string())
                .collect::<Vec<_>>()
                .join(",");
            args.push(ASSETS_FLAG.to_string());
            args.push(joined);
        }

        args
    }
}

/// A runnable task provided by a plugin
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub name: String,
    pub description: String,
    /// Plugin that provides the task
    pub plugin: Locator,
    /// Configuration file name the plugin reads, if any
    pub config_file: Option<String>,
    pub verify: Option<VerifyOptions>,
    pub invocation: TaskInvocation,
}

impl Task {
    /// Build the process command without spawning it
    pub fn command(&self, ctx: &TaskContext, args: &[String]) -> Command {
        let mut cmd = Command::new(&self.invocation.executable);
        cmd.args(self.invocation.leading_args(ctx, self.config_file.as_deref()));
        cmd.args(&self.invocation.command);
        cmd.args(args);
        if let Some(dir) = &ctx.project_dir {
            cmd.current_dir(dir);
        }
        cmd
    }

    /// Run the task with inherited stdio and wait for it
    pub fn run(&self, ctx: &TaskContext, args: &[String]) -> Result<ExitStatus> {
        debug!("Running task {} from {}", self.name, self.plugin);
        self.command(ctx, args).status().map_err(|e| {
            Error::TaskError(format!(
                "failed to execute {} for task {}: {e}",
                self.invocation.executable.display(),
                self.name
            ))
        })
    }
}

/// Task that rewrites a plugin's configuration into its current format
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpgradeConfigTask {
    pub plugin: Locator,
    /// Current configuration file name
    pub config_file: String,
    /// Older file name to read when the current one is missing
    pub legacy_config_file: Option<String>,
    pub invocation: TaskInvocation,
}

impl UpgradeConfigTask {
    /// Feed `config` to the plugin on stdin and return the upgraded content
    pub fn run(&self, ctx: &TaskContext, config: &[u8]) -> Result<Vec<u8>> {
        let mut cmd = Command::new(&self.invocation.executable);
        cmd.args(self.invocation.leading_args(ctx, None));
        cmd.args(&self.invocation.command);
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let exec_error = |e: std::io::Error| {
            Error::TaskError(format!(
                "failed to upgrade configuration {} using {}: {e}",
                self.config_file,
                self.invocation.executable.display()
            ))
        };

        let mut child = cmd.spawn().map_err(exec_error)?;
        let stdin = child.stdin.take();

        // Feed stdin while stdout and stderr drain, or a plugin that writes
        // before reading all of its input fills the pipes and never exits
        let (written, output) = thread::scope(|scope| {
            let writer = scope.spawn(move || match stdin {
                Some(mut stdin) => stdin.write_all(config),
                None => Ok(()),
            });
            let output = child.wait_with_output();
            (writer.join(), output)
        });
        let output = output.map_err(exec_error)?;

        if !output.status.success() {
            return Err(Error::TaskError(format!(
                "upgrading configuration {} failed ({}): {}",
                self.config_file,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        match written {
            Ok(result) => result.map_err(exec_error)?,
            Err(_) => {
                return Err(Error::TaskError(format!(
                    "failed to write configuration {} to {}",
                    self.config_file,
                    self.invocation.executable.display()
                )));
            }
        }
        Ok(output.stdout)
    }

    /// Path of the current configuration file within `config_dir`
    pub fn config_path(&self, config_dir: &Path) -> PathBuf {
        config_dir.join(&self.config_file)
    }
}
