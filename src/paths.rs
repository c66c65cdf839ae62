// src/paths.rs

//! On-disk layout for resolved plugins, assets and downloads
//!
//! ```text
//! $KILN_HOME/
//!   plugins/    unpacked plugin executables + kiln-resolver.lock
//!   assets/     unpacked asset files
//!   downloads/  archives produced by resolvers
//!   cache/      persisted resolution results
//! ```

use crate::error::{Error, Result};
use crate::locator::Locator;
use crate::platform::OsArch;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable overriding the home directory
pub const HOME_ENV_VAR: &str = "KILN_HOME";

/// Name of the cross-process lock file inside the plugins directory
pub const RESOLVER_LOCK_FILE: &str = "kiln-resolver.lock";

/// Directories used by a resolution run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceDirs {
    pub plugins: PathBuf,
    pub assets: PathBuf,
    pub downloads: PathBuf,
    pub cache: PathBuf,
}

impl ResourceDirs {
    /// Layout rooted at an explicit home directory
    pub fn under(home: &Path) -> Self {
        Self {
            plugins: home.join("plugins"),
            assets: home.join("assets"),
            downloads: home.join("downloads"),
            cache: home.join("cache"),
        }
    }

    /// Layout rooted at `$KILN_HOME`, falling back to `~/.kiln`
    pub fn from_env() -> Result<Self> {
        if let Some(home) = std::env::var_os(HOME_ENV_VAR) {
            return Ok(Self::under(Path::new(&home)));
        }
        let home = dirs::home_dir().ok_or_else(|| {
            Error::NotFoundError(format!(
                "cannot determine home directory; set {} explicitly",
                HOME_ENV_VAR
            ))
        })?;
        Ok(Self::under(&home.join(".kiln")))
    }

    /// Create every directory in the layout
    pub fn create_all(&self) -> Result<()> {
        for dir in [&self.plugins, &self.assets, &self.downloads, &self.cache] {
            fs::create_dir_all(dir).map_err(|e| {
                Error::IoError(format!("Failed to create directory {}: {e}", dir.display()))
            })?;
        }
        Ok(())
    }

    pub fn resolver_lock_path(&self) -> PathBuf {
        self.plugins.join(RESOLVER_LOCK_FILE)
    }
}

/// File name of an unpacked plugin or asset
pub fn artifact_file_name(locator: &Locator) -> String {
    format!("{}-{}-{}", locator.group, locator.product, locator.version)
}

/// Location of an unpacked plugin or asset inside `dir`
pub fn artifact_path(dir: &Path, locator: &Locator) -> PathBuf {
    dir.join(artifact_file_name(locator))
}

/// Location of the archive a resolver writes for `locator`
pub fn download_path(downloads_dir: &Path, locator: &Locator, platform: &OsArch) -> PathBuf {
    downloads_dir.join(format!("{}-{}.tgz", artifact_file_name(locator), platform))
}
