// src/plugin/load.rs

//! Loading runnable tasks from plugin declarations

use super::resolve::resolve_plugins;
use super::verify::verify_plugin_compatibility;
use super::{PluginsParam, ResolvedPlugins};
use crate::cache::{read_cache, write_cache};
use crate::error::Result;
use crate::paths::{artifact_path, ResourceDirs};
use crate::platform::OsArch;
use crate::task::{Task, UpgradeConfigTask};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Tasks and upgrade-config tasks of a plugin set, in aggregation order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadedTasks {
    pub tasks: Vec<Task>,
    pub upgrade_configs: Vec<UpgradeConfigTask>,
}

impl LoadedTasks {
    /// Find a task by name
    pub fn task(&self, name: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.name == name)
    }
}

/// Flatten a resolved set into tasks
///
/// Plugins are visited in locator order and each plugin's tasks keep their
/// declared order. Nothing is reordered or deduplicated across plugins.
pub fn aggregate_tasks(
    plugins: &ResolvedPlugins,
    plugins_dir: &Path,
    assets_dir: &Path,
) -> LoadedTasks {
    let mut loaded = LoadedTasks::default();

    for (locator, plugin) in plugins {
        let executable = artifact_path(plugins_dir, locator);
        let asset_paths: Vec<PathBuf> = plugin
            .assets
            .iter()
            .map(|asset| artifact_path(assets_dir, asset))
            .collect();

        loaded.tasks.extend(plugin.info.tasks(&executable, &asset_paths));
        if let Some(upgrade) = plugin.info.upgrade_config_task(&executable, &asset_paths) {
            loaded.upgrade_configs.push(upgrade);
        }
    }

    loaded
}

/// Resolve (or load from cache), verify and aggregate the declared plugins
///
/// With a `cache_path`, an existing cache file is used as is. Otherwise the
/// set is resolved under the resolver lock, verified, and written to the
/// cache before aggregation. A corrupt cache, a failed verification and a
/// failed cache write are all errors.
pub fn load_plugins_tasks(
    param: &PluginsParam,
    dirs: &ResourceDirs,
    platform: &OsArch,
    cache_path: Option<&Path>,
) -> Result<LoadedTasks> {
    let cached = match cache_path {
        Some(path) => read_cache(path)?,
        None => None,
    };

    let plugins = match cached {
        Some(plugins) => {
            info!("Using cached plugin information ({} plugin(s))", plugins.len());
            plugins
        }
        None => {
            let plugins = resolve_plugins(dirs, platform, param)?;
            verify_plugin_compatibility(&plugins)?;
            if let Some(path) = cache_path {
                write_cache(path, &plugins)?;
            }
            plugins
        }
    };

    let loaded = aggregate_tasks(&plugins, &dirs.plugins, &dirs.assets);
    debug!(
        "Loaded {} task(s) and {} upgrade-config task(s)",
        loaded.tasks.len(),
        loaded.upgrade_configs.len()
    );
    Ok(loaded)
}
