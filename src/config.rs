// src/config.rs

//! Project configuration
//!
//! Plugins are declared in `kiln/config/kiln.toml` inside the project:
//!
//! ```toml
//! [plugins]
//! resolvers = ["https://repo.example.com/{{GroupPath}}/{{Product}}/{{Version}}/{{Product}}-{{Version}}-{{OS}}-{{Arch}}.tgz"]
//!
//! [[plugins.plugins]]
//! locator = "com.example:license-plugin:1.0.0"
//! checksums = { "linux-x86_64" = "..." }
//!
//! [[plugins.plugins.assets]]
//! locator = "com.example:license-asset:1.0.0"
//! ```
//!
//! The same directory holds the configuration files of the plugins.

use crate::artifact::{ArtifactDeclaration, Resolver, TemplateResolver};
use crate::error::{Error, Result};
use crate::hash::{sha256, Checksum};
use crate::locator::Locator;
use crate::platform::OsArch;
use crate::plugin::{PluginDeclaration, PluginsParam};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Configuration directory relative to the project directory
pub const CONFIG_DIR: &str = "kiln/config";

/// Name of the project configuration file
pub const CONFIG_FILE: &str = "kiln.toml";

/// Directory holding kiln and plugin configuration for a project
pub fn config_dir(project_dir: &Path) -> PathBuf {
    project_dir.join(CONFIG_DIR)
}

/// Top-level project configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    #[serde(default)]
    pub plugins: PluginsConfig,
}

/// Declared resolvers and plugins
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PluginsConfig {
    /// Resolver templates tried in order for plugins without their own
    #[serde(default)]
    pub resolvers: Vec<String>,
    #[serde(default)]
    pub plugins: Vec<PluginConfig>,
}

/// A single plugin entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PluginConfig {
    pub locator: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolver: Option<String>,
    /// SHA-256 of the executable, keyed by `os-arch`
    #[serde(default)]
    pub checksums: BTreeMap<String, String>,
    #[serde(default)]
    pub assets: Vec<AssetConfig>,
}

/// An asset entry of a plugin
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AssetConfig {
    pub locator: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolver: Option<String>,
    #[serde(default)]
    pub checksums: BTreeMap<String, String>,
}

impl ProjectConfig {
    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| Error::ConfigError(format!("Failed to parse configuration: {e}")))
    }

    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            Error::ConfigError(format!("Failed to read {}: {e}", path.display()))
        })?;
        Self::parse(&content).map_err(|e| match e {
            Error::ConfigError(msg) => Error::ConfigError(format!("{}: {msg}", path.display())),
            other => other,
        })
    }

    /// Load the configuration of the project at `project_dir`
    ///
    /// A project without a configuration file declares no plugins.
    pub fn load_project(project_dir: &Path) -> Result<Self> {
        let path = config_dir(project_dir).join(CONFIG_FILE);
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }
}

impl PluginsConfig {
    /// Validate the configuration and build the resolution parameter
    pub fn to_param(&self) -> Result<PluginsParam> {
        let default_resolvers = self
            .resolvers
            .iter()
            .map(|t| template_resolver(t))
            .collect::<Result<Vec<_>>>()?;

        let mut plugins = Vec::with_capacity(self.plugins.len());
        for plugin in &self.plugins {
            let mut decl = PluginDeclaration::new(artifact_declaration(
                &plugin.locator,
                plugin.resolver.as_deref(),
                &plugin.checksums,
            )?);
            for asset in &plugin.assets {
                decl = decl.with_asset(artifact_declaration(
                    &asset.locator,
                    asset.resolver.as_deref(),
                    &asset.checksums,
                )?);
            }
            plugins.push(decl);
        }

        Ok(PluginsParam {
            default_resolvers,
            plugins,
        })
    }

    /// Hex SHA-256 identifying this configuration on `platform`
    ///
    /// Any change to the declared plugins, their resolvers or checksums
    /// yields a different fingerprint.
    pub fn fingerprint(&self, platform: &OsArch) -> Result<String> {
        let encoded = toml::to_string(self)
            .map_err(|e| Error::ConfigError(format!("Failed to encode configuration: {e}")))?;
        Ok(sha256(format!("{platform}\n{encoded}").as_bytes()))
    }
}

fn template_resolver(template: &str) -> Result<Arc<dyn Resolver>> {
    Ok(Arc::new(TemplateResolver::new(template)?))
}

fn artifact_declaration(
    locator: &str,
    resolver: Option<&str>,
    checksums: &BTreeMap<String, String>,
) -> Result<ArtifactDeclaration> {
    let mut decl = ArtifactDeclaration::new(Locator::parse(locator)?);
    if let Some(template) = resolver {
        decl = decl.with_resolver(template_resolver(template)?);
    }
    for (platform, checksum) in checksums {
        let platform: OsArch = platform.parse().map_err(|e| {
            Error::ConfigError(format!("plugin {locator}: {e}"))
        })?;
        let checksum = Checksum::parse(checksum).map_err(|e| {
            Error::ConfigError(format!("plugin {locator}: checksum for {platform}: {e}"))
        })?;
        decl = decl.with_checksum(platform, checksum);
    }
    Ok(decl)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[plugins]
resolvers = ["/srv/repo/{{Product}}-{{Version}}-{{OS}}-{{Arch}}.tgz"]

[[plugins.plugins]]
locator = "com.example:license-plugin:1.0.0"
resolver = "https://mirror.example.com/{{GroupPath}}/{{Product}}.tgz"
checksums = { "linux-x86_64" = "E3B0C44298FC1C149AFBF4C8996FB92427AE41E4649B934CA495991B7852B855" }

[[plugins.plugins.assets]]
locator = "com.example:license-asset:1.0.0"

[[plugins.plugins]]
locator = "org.other:format:2.1"
"#;

    #[test]
    fn test_parse_and_convert() {
        let config = ProjectConfig::parse(SAMPLE).unwrap();
        assert_eq!(config.plugins.plugins.len(), 2);
        assert_eq!(config.plugins.plugins[0].assets.len(), 1);

        let param = config.plugins.to_param().unwrap();
        assert_eq!(param.default_resolvers.len(), 1);
        assert_eq!(param.plugins.len(), 2);

        let first = &param.plugins[0];
        assert_eq!(first.locator(), &Locator::new("com.example", "license-plugin", "1.0.0"));
        assert!(first.artifact.resolver.is_some());
        let checksum = &first.artifact.checksums[&OsArch::new("linux", "x86_64")];
        assert_eq!(
            checksum.as_str(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(first.assets[0].locator.product, "license-asset");
        assert!(param.plugins[1].artifact.resolver.is_none());
    }

    #[test]
    fn test_invalid_entries_rejected() {
        let bad_locator = ProjectConfig::parse("[[plugins.plugins]]\nlocator = \"a:b\"\n").unwrap();
        assert!(matches!(bad_locator.plugins.to_param(), Err(Error::InvalidLocator(_))));

        let bad_template = ProjectConfig::parse("[plugins]\nresolvers = [\"/x/{{Nope}}\"]\n").unwrap();
        assert!(matches!(bad_template.plugins.to_param(), Err(Error::ConfigError(_))));

        let bad_platform = ProjectConfig::parse(
            "[[plugins.plugins]]\nlocator = \"a:b:1\"\nchecksums = { \"linux\" = \"00\" }\n",
        )
        .unwrap();
        assert!(bad_platform.plugins.to_param().is_err());

        let bad_checksum = ProjectConfig::parse(
            "[[plugins.plugins]]\nlocator = \"a:b:1\"\nchecksums = { \"linux-x86_64\" = \"xyz\" }\n",
        )
        .unwrap();
        assert!(bad_checksum.plugins.to_param().is_err());

        assert!(ProjectConfig::parse("[plugins]\nunknown = 1\n").is_err());
    }

    #[test]
    fn test_fingerprint_tracks_changes() {
        let config = ProjectConfig::parse(SAMPLE).unwrap().plugins;
        let linux = OsArch::new("linux", "x86_64");
        let darwin = OsArch::new("darwin", "aarch64");

        let base = config.fingerprint(&linux).unwrap();
        assert_eq!(base.len(), 64);
        assert_eq!(base, config.fingerprint(&linux).unwrap());
        assert_ne!(base, config.fingerprint(&darwin).unwrap());

        let mut changed = config.clone();
        changed.plugins[1].locator = "org.other:format:2.2".to_string();
        assert_ne!(base, changed.fingerprint(&linux).unwrap());
    }

    #[test]
    fn test_load_project_without_config() {
        let temp = tempfile::tempdir().unwrap();
        assert_eq!(ProjectConfig::load_project(temp.path()).unwrap(), ProjectConfig::default());

        let dir = config_dir(temp.path());
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(CONFIG_FILE), SAMPLE).unwrap();
        assert_eq!(ProjectConfig::load_project(temp.path()).unwrap().plugins.plugins.len(), 2);
    }
}
