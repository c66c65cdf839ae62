// src/commands/plugins.rs

//! Plugin verification and configuration upgrade commands

use super::Session;
use anyhow::{Context, Result};
use kiln::plugin::{resolve_plugins, verify_plugin_compatibility};
use kiln::task::UpgradeConfigTask;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Resolve every declared plugin and check the set for conflicts
///
/// Always resolves afresh; the cache is neither read nor written.
pub fn cmd_verify_plugins(session: &Session) -> Result<()> {
    let param = session.param()?;
    let plugins = resolve_plugins(&session.dirs, &session.platform, &param)?;
    verify_plugin_compatibility(&plugins)?;

    println!("Verified {} plugin(s):", plugins.len());
    for (locator, plugin) in &plugins {
        println!(
            "  {} ({} task(s), {} asset(s))",
            locator,
            plugin.info.tasks.len(),
            plugin.assets.len()
        );
    }
    Ok(())
}

/// Upgrade each plugin's configuration file in place
pub fn cmd_upgrade_config(session: &Session) -> Result<()> {
    let loaded = session.load_tasks()?;
    let config_dir = session.config_dir();
    let ctx = session.task_context();

    let mut upgraded = 0;
    for upgrade in &loaded.upgrade_configs {
        let Some((source, content)) = read_plugin_config(upgrade, &config_dir)? else {
            debug!("No configuration for {}, skipping", upgrade.plugin);
            continue;
        };

        let output = upgrade.run(&ctx, &content)?;
        let target = upgrade.config_path(&config_dir);
        if source == target && output == content {
            debug!("Configuration {} is up to date", target.display());
            continue;
        }

        write_atomic(&target, &output)?;
        if source != target {
            fs::remove_file(&source).with_context(|| {
                format!("Failed to remove legacy configuration {}", source.display())
            })?;
        }
        info!("Upgraded {} using {}", target.display(), upgrade.plugin);
        println!("Upgraded configuration for {}", upgrade.config_file);
        upgraded += 1;
    }

    if upgraded == 0 {
        println!("All plugin configuration is up to date.");
    }
    Ok(())
}

/// Current configuration file, or the legacy one if only that exists
fn read_plugin_config(
    upgrade: &UpgradeConfigTask,
    config_dir: &Path,
) -> Result<Option<(PathBuf, Vec<u8>)>> {
    let current = upgrade.config_path(config_dir);
    let mut candidates = vec![current];
    if let Some(legacy) = &upgrade.legacy_config_file {
        candidates.push(config_dir.join(legacy));
    }

    for path in candidates {
        if path.is_file() {
            let content =
                fs::read(&path).with_context(|| format!("Failed to read {}", path.display()))?;
            return Ok(Some((path, content)));
        }
    }
    Ok(None)
}

fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    let dir = path.parent().unwrap_or(Path::new("."));
    fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;

    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(content)?;
    temp.as_file().sync_all()?;
    temp.persist(path)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}
