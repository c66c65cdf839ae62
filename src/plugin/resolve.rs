// src/plugin/resolve.rs

//! Locked resolution of declared plugins and their assets

use super::info::query_plugin_info;
use super::{PluginDeclaration, PluginWithAssets, PluginsParam, ResolvedPlugins};
use crate::artifact::{resolve_artifact, Resolver};
use crate::error::{Error, ResolutionErrors, Result};
use crate::lock::ResolverLock;
use crate::locator::Locator;
use crate::paths::ResourceDirs;
use crate::platform::OsArch;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Resolve every plugin in `param` for `platform`
///
/// Holds the resolver lock in the plugins directory for the whole run, so only
/// one resolution touches the shared directories at a time, whether the
/// competitor is another thread or another process.
///
/// For each declaration:
///
/// - make the plugin executable available (resolving and unpacking it if it is
///   not already present) and verify its checksum for `platform`, if declared
/// - run the info query against the executable
/// - resolve all of its assets the same way into the assets directory
///
/// A failing declaration does not stop the others. If any declaration failed,
/// the returned error lists every failure in locator order.
pub fn resolve_plugins(
    dirs: &ResourceDirs,
    platform: &OsArch,
    param: &PluginsParam,
) -> Result<ResolvedPlugins> {
    let _lock = ResolverLock::acquire(dirs.resolver_lock_path())?;

    let mut plugins = ResolvedPlugins::new();
    let mut errors = ResolutionErrors::new();

    for decl in &param.plugins {
        match resolve_one(dirs, platform, &param.default_resolvers, decl) {
            Ok(resolved) => {
                plugins.insert(decl.locator().clone(), resolved);
            }
            Err(e) => {
                warn!("Failed to resolve plugin {}: {}", decl.locator(), e);
                errors.insert(decl.locator().clone(), e);
            }
        }
    }

    if !errors.is_empty() {
        return Err(Error::Resolution(errors));
    }

    info!("Resolved {} plugin(s)", plugins.len());
    Ok(plugins)
}

fn resolve_one(
    dirs: &ResourceDirs,
    platform: &OsArch,
    default_resolvers: &[Arc<dyn Resolver>],
    decl: &PluginDeclaration,
) -> Result<PluginWithAssets> {
    let locator = decl.locator();
    let executable = resolve_artifact(
        &decl.artifact,
        &dirs.plugins,
        &dirs.downloads,
        default_resolvers,
        platform,
    )?;

    let info = query_plugin_info(locator, &executable)?;

    let assets = resolve_assets(dirs, platform, default_resolvers, decl).map_err(|e| {
        Error::AssetError {
            locator: locator.clone(),
            source: Box::new(e),
        }
    })?;

    debug!("Plugin {} resolved with {} asset(s)", locator, assets.len());
    Ok(PluginWithAssets { info, assets })
}

fn resolve_assets(
    dirs: &ResourceDirs,
    platform: &OsArch,
    default_resolvers: &[Arc<dyn Resolver>],
    decl: &PluginDeclaration,
) -> Result<Vec<Locator>> {
    let mut assets = Vec::with_capacity(decl.assets.len());
    for asset in &decl.assets {
        resolve_artifact(asset, &dirs.assets, &dirs.downloads, default_resolvers, platform)?;
        assets.push(asset.locator.clone());
    }
    Ok(assets)
}
