// src/plugin/mod.rs

//! Plugin resolution, compatibility verification and task loading
//!
//! # Pipeline
//!
//! ```text
//! PluginsParam ──► cache hit? ──yes──────────────────────────┐
//!                     │ no                                    │
//!                     ▼                                       ▼
//!              resolve_plugins (locked) ──► verify ──► write cache ──► aggregate_tasks
//! ```
//!
//! - [`resolve`]: makes every declared plugin and asset available on disk and
//!   queries each plugin for its [`PluginInfo`]
//! - [`verify`]: rejects plugin sets with duplicate products, colliding
//!   configuration files or overlapping task names
//! - [`load`]: ties the steps together with the cache and flattens the result
//!   into runnable tasks

pub mod info;
pub mod load;
pub mod resolve;
pub mod verify;

pub use info::{
    query_plugin_info, PluginInfo, TaskInfo, UpgradeConfigInfo, INFO_COMMAND,
    PLUGIN_SCHEMA_VERSION,
};
pub use load::{aggregate_tasks, load_plugins_tasks, LoadedTasks};
pub use resolve::resolve_plugins;
pub use verify::{find_conflicts, verify_plugin_compatibility, CompatibilityError, Conflict, ConflictReport};

use crate::artifact::{ArtifactDeclaration, Resolver};
use crate::locator::Locator;
use std::collections::BTreeMap;
use std::sync::Arc;

/// A plugin to resolve together with the assets it needs
#[derive(Debug, Clone)]
pub struct PluginDeclaration {
    pub artifact: ArtifactDeclaration,
    pub assets: Vec<ArtifactDeclaration>,
}

impl PluginDeclaration {
    pub fn new(artifact: ArtifactDeclaration) -> Self {
        Self {
            artifact,
            assets: Vec::new(),
        }
    }

    pub fn with_asset(mut self, asset: ArtifactDeclaration) -> Self {
        self.assets.push(asset);
        self
    }

    pub fn locator(&self) -> &Locator {
        &self.artifact.locator
    }
}

/// Everything a resolution run needs from the caller
#[derive(Debug, Clone, Default)]
pub struct PluginsParam {
    /// Tried in order for declarations without their own resolver
    pub default_resolvers: Vec<Arc<dyn Resolver>>,
    pub plugins: Vec<PluginDeclaration>,
}

/// Info of a resolved plugin and the locators of its resolved assets
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginWithAssets {
    pub info: PluginInfo,
    pub assets: Vec<Locator>,
}

/// Resolved plugins in locator order
pub type ResolvedPlugins = BTreeMap<Locator, PluginWithAssets>;
