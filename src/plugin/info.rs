// src/plugin/info.rs

//! Plugin metadata and the info-query protocol
//!
//! Every plugin executable answers `<plugin> __plugin-info` by printing a JSON
//! document describing the tasks it provides:
//!
//! ```json
//! {
//!   "pluginSchemaVersion": "1",
//!   "id": "com.example:license-plugin:1.0.0",
//!   "configFileName": "license-plugin.toml",
//!   "tasks": [
//!     { "name": "license", "description": "Apply license headers", "command": ["run"] }
//!   ],
//!   "upgradeConfig": { "command": ["upgrade-config"], "legacyConfigFile": "license.yml" }
//! }
//! ```

use crate::error::{Error, Result};
use crate::locator::Locator;
use crate::task::{GlobalFlagOptions, Task, TaskInvocation, UpgradeConfigTask, VerifyOptions};
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::Duration;
use tracing::debug;

/// Argument that makes a plugin print its info document
pub const INFO_COMMAND: &str = "__plugin-info";

/// Info document schema version understood by this crate
pub const PLUGIN_SCHEMA_VERSION: &str = "1";

/// Attempts made when the freshly unpacked executable is still busy
const EXEC_BUSY_RETRIES: u32 = 5;

/// A task as declared by a plugin
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskInfo {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Arguments that select the task within the plugin executable
    #[serde(default)]
    pub command: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_flags: Option<GlobalFlagOptions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verify: Option<VerifyOptions>,
}

/// How a plugin upgrades its configuration file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpgradeConfigInfo {
    pub command: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legacy_config_file: Option<String>,
}

/// Metadata a resolved plugin publishes about itself
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginInfo {
    pub plugin_schema_version: String,
    /// Locator string of the plugin, `group:product:version`
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_file_name: Option<String>,
    #[serde(default)]
    pub tasks: Vec<TaskInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upgrade_config: Option<UpgradeConfigInfo>,
}

impl PluginInfo {
    /// True if the plugin reads a configuration file
    pub fn uses_config(&self) -> bool {
        self.config_file_name.is_some()
    }

    /// Declared task names, in declaration order
    pub fn task_names(&self) -> impl Iterator<Item = &str> {
        self.tasks.iter().map(|t| t.name.as_str())
    }

    /// Locator parsed from the `id` field
    pub fn locator(&self) -> Result<Locator> {
        Ok(Locator::parse(&self.id)?)
    }

    /// Check the document is usable for the plugin at `locator`
    pub fn validate(&self, locator: &Locator) -> std::result::Result<(), String> {
        if self.plugin_schema_version != PLUGIN_SCHEMA_VERSION {
            return Err(format!(
                "unsupported plugin schema version {:?} (expected {:?})",
                self.plugin_schema_version, PLUGIN_SCHEMA_VERSION
            ));
        }
        if self.id != locator.to_string() {
            return Err(format!(
                "plugin reports id {:?}, expected {:?}",
                self.id,
                locator.to_string()
            ));
        }
        let mut seen = std::collections::BTreeSet::new();
        for task in &self.tasks {
            if task.name.is_empty() {
                return Err("plugin declares a task with an empty name".to_string());
            }
            if !seen.insert(task.name.as_str()) {
                return Err(format!("plugin declares task {:?} more than once", task.name));
            }
        }
        if self.upgrade_config.is_some() && !self.uses_config() {
            return Err("plugin declares upgradeConfig but no configFileName".to_string());
        }
        Ok(())
    }

    fn invocation(
        &self,
        command: &[String],
        executable: &Path,
        asset_paths: &[PathBuf],
        flags: Option<&GlobalFlagOptions>,
    ) -> TaskInvocation {
        TaskInvocation {
            executable: executable.to_path_buf(),
            command: command.to_vec(),
            asset_paths: asset_paths.to_vec(),
            global_flags: flags.cloned().unwrap_or_default(),
        }
    }

    /// Materialize the declared tasks bound to the given executable and assets
    pub fn tasks(&self, executable: &Path, asset_paths: &[PathBuf]) -> Vec<Task> {
        let plugin = self.locator_or_placeholder();
        self.tasks
            .iter()
            .map(|info| Task {
                name: info.name.clone(),
                description: info.description.clone(),
                plugin: plugin.clone(),
                config_file: self.config_file_name.clone(),
                verify: info.verify.clone(),
                invocation: self.invocation(
                    &info.command,
                    executable,
                    asset_paths,
                    info.global_flags.as_ref(),
                ),
            })
            .collect()
    }

    /// Task upgrading this plugin's configuration, if it supports one
    pub fn upgrade_config_task(
        &self,
        executable: &Path,
        asset_paths: &[PathBuf],
    ) -> Option<UpgradeConfigTask> {
        let upgrade = self.upgrade_config.as_ref()?;
        let config_file = self.config_file_name.clone()?;
        Some(UpgradeConfigTask {
            plugin: self.locator_or_placeholder(),
            config_file,
            legacy_config_file: upgrade.legacy_config_file.clone(),
            invocation: self.invocation(&upgrade.command, executable, asset_paths, None),
        })
    }

    // `id` is validated against the locator before an info value is stored
    fn locator_or_placeholder(&self) -> Locator {
        self.locator()
            .unwrap_or_else(|_| Locator::new("unknown", self.id.clone(), "unknown"))
    }
}

/// Invoke the info query on `executable` and parse its answer
pub fn query_plugin_info(locator: &Locator, executable: &Path) -> Result<PluginInfo> {
    let info_error = |reason: String| Error::PluginInfoError {
        locator: locator.clone(),
        reason,
    };

    let output = run_info_command(executable)
        .map_err(|e| info_error(format!("failed to execute {}: {e}", executable.display())))?;

    if !output.status.success() {
        return Err(info_error(format!(
            "command {} {} failed ({}): {}",
            executable.display(),
            INFO_COMMAND,
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    let info: PluginInfo = serde_json::from_slice(&output.stdout)
        .map_err(|e| info_error(format!("failed to parse plugin info: {e}")))?;
    info.validate(locator).map_err(info_error)?;

    debug!("Plugin {} provides {} task(s)", locator, info.tasks.len());
    Ok(info)
}

fn run_info_command(executable: &Path) -> io::Result<Output> {
    let mut attempt = 0;
    loop {
        attempt += 1;
        match Command::new(executable).arg(INFO_COMMAND).output() {
            // A concurrent fork can briefly keep a write handle to a file that was just unpacked
            Err(e) if e.kind() == io::ErrorKind::ExecutableFileBusy && attempt < EXEC_BUSY_RETRIES => {
                debug!("{} is busy, retrying", executable.display());
                std::thread::sleep(Duration::from_millis(50 * attempt as u64));
            }
            result => return result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info_json() -> &'static str {
        r#"{
            "pluginSchemaVersion": "1",
            "id": "org:tool:1.0",
            "configFileName": "tool.toml",
            "tasks": [
                {"name": "lint", "description": "Lint", "command": ["lint"],
                 "globalFlags": {"debugFlag": "--debug"}},
                {"name": "fmt", "command": ["format", "--write"],
                 "verify": {"applyTrueArgs": [], "applyFalseArgs": ["--check"]}}
            ],
            "upgradeConfig": {"command": ["upgrade-config"], "legacyConfigFile": "tool.yml"}
        }"#
    }

    fn parsed() -> PluginInfo {
        serde_json::from_str(info_json()).unwrap()
    }

    #[test]
    fn test_parse_info_document() {
        let info = parsed();
        assert!(info.uses_config());
        assert_eq!(info.task_names().collect::<Vec<_>>(), vec!["lint", "fmt"]);
        assert_eq!(info.tasks[1].description, "");
        assert_eq!(
            info.tasks[1].verify.as_ref().unwrap().apply_false_args,
            vec!["--check".to_string()]
        );
        assert!(info.validate(&Locator::new("org", "tool", "1.0")).is_ok());
    }

    #[test]
    fn test_validate_rejects_mismatches() {
        let info = parsed();
        assert!(info.validate(&Locator::new("org", "tool", "2.0")).is_err());

        let mut bad_schema = parsed();
        bad_schema.plugin_schema_version = "0".to_string();
        assert!(bad_schema.validate(&Locator::new("org", "tool", "1.0")).is_err());

        let mut duplicate = parsed();
        duplicate.tasks.push(duplicate.tasks[0].clone());
        let err = duplicate.validate(&Locator::new("org", "tool", "1.0")).unwrap_err();
        assert!(err.contains("more than once"));

        let mut upgrade_without_config = parsed();
        upgrade_without_config.config_file_name = None;
        assert!(upgrade_without_config.validate(&Locator::new("org", "tool", "1.0")).is_err());
    }

    #[test]
    fn test_tasks_bound_to_paths() {
        let info = parsed();
        let assets = vec![PathBuf::from("/assets/x")];
        let tasks = info.tasks(Path::new("/plugins/org-tool-1.0"), &assets);

        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].name, "lint");
        assert_eq!(tasks[0].plugin, Locator::new("org", "tool", "1.0"));
        assert_eq!(tasks[0].config_file.as_deref(), Some("tool.toml"));
        assert_eq!(tasks[0].invocation.executable, PathBuf::from("/plugins/org-tool-1.0"));
        assert_eq!(tasks[0].invocation.asset_paths, assets);
        assert_eq!(tasks[0].invocation.global_flags.debug_flag.as_deref(), Some("--debug"));
        assert_eq!(tasks[1].invocation.command, vec!["format", "--write"]);
    }

    #[test]
    fn test_upgrade_config_task() {
        let info = parsed();
        let upgrade = info
            .upgrade_config_task(Path::new("/plugins/org-tool-1.0"), &[])
            .unwrap();
        assert_eq!(upgrade.config_file, "tool.toml");
        assert_eq!(upgrade.legacy_config_file.as_deref(), Some("tool.yml"));
        assert_eq!(upgrade.invocation.command, vec!["upgrade-config"]);

        let mut no_upgrade = parsed();
        no_upgrade.upgrade_config = None;
        assert!(no_upgrade.upgrade_config_task(Path::new("/p"), &[]).is_none());
    }

    #[test]
    fn test_serialization_skips_absent_fields() {
        let mut info = parsed();
        info.config_file_name = None;
        info.upgrade_config = None;
        let json = serde_json::to_string(&info).unwrap();
        assert!(!json.contains("configFileName"));
        assert!(!json.contains("upgradeConfig"));
        assert_eq!(serde_json::from_str::<PluginInfo>(&json).unwrap(), info);
    }

    #[cfg(unix)]
    #[test]
    fn test_query_failing_executable() {
        use std::os::unix::fs::PermissionsExt;

        let temp = tempfile::tempdir().unwrap();
        let exe = temp.path().join("broken");
        std::fs::write(&exe, "#!/bin/sh\necho boom >&2\nexit 3\n").unwrap();
        std::fs::set_permissions(&exe, std::fs::Permissions::from_mode(0o755)).unwrap();

        let err = query_plugin_info(&Locator::new("org", "broken", "1.0"), &exe).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("boom"), "{}", msg);
        assert!(matches!(err, Error::PluginInfoError { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_query_unparseable_output() {
        use std::os::unix::fs::PermissionsExt;

        let temp = tempfile::tempdir().unwrap();
        let exe = temp.path().join("chatty");
        std::fs::write(&exe, "#!/bin/sh\necho not json\n").unwrap();
        std::fs::set_permissions(&exe, std::fs::Permissions::from_mode(0o755)).unwrap();

        let err = query_plugin_info(&Locator::new("org", "chatty", "1.0"), &exe).unwrap_err();
        assert!(err.to_string().contains("failed to parse plugin info"), "{}", err);
    }
}
