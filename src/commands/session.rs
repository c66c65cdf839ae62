// src/commands/session.rs

//! Project, home directory and configuration shared by all commands

use anyhow::{Context, Result};
use kiln::cache::cache_file_name;
use kiln::config::{config_dir, ProjectConfig};
use kiln::task::TaskContext;
use kiln::{load_plugins_tasks, LoadedTasks, OsArch, PluginsParam, ResourceDirs};
use std::path::PathBuf;
use tracing::debug;

/// Everything a command needs to load the project's plugins
pub struct Session {
    pub project_dir: PathBuf,
    pub config: ProjectConfig,
    pub dirs: ResourceDirs,
    pub platform: OsArch,
    pub use_cache: bool,
    pub debug: bool,
}

impl Session {
    pub fn open(
        project_dir: Option<PathBuf>,
        home: Option<PathBuf>,
        use_cache: bool,
        debug: bool,
    ) -> Result<Self> {
        let project_dir = match project_dir {
            Some(dir) => dir,
            None => std::env::current_dir().context("Failed to determine current directory")?,
        };
        let dirs = match home {
            Some(home) => ResourceDirs::under(&home),
            None => ResourceDirs::from_env()?,
        };
        dirs.create_all()?;

        let config = ProjectConfig::load_project(&project_dir)?;
        debug!(
            "Project {} declares {} plugin(s)",
            project_dir.display(),
            config.plugins.plugins.len()
        );

        Ok(Self {
            project_dir,
            config,
            dirs,
            platform: OsArch::current(),
            use_cache,
            debug,
        })
    }

    pub fn param(&self) -> Result<PluginsParam> {
        self.config
            .plugins
            .to_param()
            .context("Invalid plugin configuration")
    }

    /// Cache file for the current configuration and platform
    pub fn cache_path(&self) -> Result<Option<PathBuf>> {
        if !self.use_cache {
            return Ok(None);
        }
        let fingerprint = self.config.plugins.fingerprint(&self.platform)?;
        Ok(Some(self.dirs.cache.join(cache_file_name(&fingerprint))))
    }

    pub fn load_tasks(&self) -> Result<LoadedTasks> {
        let param = self.param()?;
        let cache_path = self.cache_path()?;
        let loaded = load_plugins_tasks(&param, &self.dirs, &self.platform, cache_path.as_deref())
            .context("Failed to load plugins")?;
        Ok(loaded)
    }

    pub fn config_dir(&self) -> PathBuf {
        config_dir(&self.project_dir)
    }

    pub fn task_context(&self) -> TaskContext {
        TaskContext {
            project_dir: Some(self.project_dir.clone()),
            config_dir: Some(self.config_dir()),
            debug: self.debug,
        }
    }
}
