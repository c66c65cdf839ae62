// src/cache.rs

//! Persisted cache of a resolved plugin set
//!
//! The cache is a pretty-printed JSON document:
//!
//! ```json
//! {
//!   "version": 1,
//!   "plugins": [
//!     { "locator": "org:tool:1.0", "pluginInfo": { ... }, "assets": ["org:asset:1.0"] }
//!   ]
//! }
//! ```
//!
//! Entries are written in locator order, so identical sets always encode to
//! identical bytes. A missing cache file means "resolve again"; any other
//! read or decode failure is reported rather than treated as a cold cache.
//! Cached plugin information is held to the same checks as a fresh query.

use crate::error::{Error, Result};
use crate::locator::Locator;
use crate::plugin::{PluginInfo, PluginWithAssets, ResolvedPlugins};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;

/// Cache document format version
pub const CACHE_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CacheEntry {
    locator: Locator,
    plugin_info: PluginInfo,
    #[serde(default)]
    assets: Vec<Locator>,
}

#[derive(Debug, Serialize, Deserialize)]
struct CacheDocument {
    version: u32,
    plugins: Vec<CacheEntry>,
}

/// Encode a resolved set into the cache format
pub fn encode(plugins: &ResolvedPlugins) -> Result<Vec<u8>> {
    let doc = CacheDocument {
        version: CACHE_FORMAT_VERSION,
        plugins: plugins
            .iter()
            .map(|(locator, plugin)| CacheEntry {
                locator: locator.clone(),
                plugin_info: plugin.info.clone(),
                assets: plugin.assets.clone(),
            })
            .collect(),
    };

    let mut bytes = serde_json::to_vec_pretty(&doc)
        .map_err(|e| Error::ParseError(format!("failed to encode plugin information: {e}")))?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// Decode a cache document, rejecting it as a whole on any problem
pub fn decode(bytes: &[u8]) -> Result<ResolvedPlugins> {
    let doc: CacheDocument =
        serde_json::from_slice(bytes).map_err(|e| Error::CacheDecodeError(e.to_string()))?;

    if doc.version != CACHE_FORMAT_VERSION {
        return Err(Error::CacheDecodeError(format!(
            "unsupported cache version {} (expected {})",
            doc.version, CACHE_FORMAT_VERSION
        )));
    }

    let mut plugins = ResolvedPlugins::new();
    for entry in doc.plugins {
        if plugins.contains_key(&entry.locator) {
            return Err(Error::CacheDecodeError(format!(
                "plugin {} appears more than once",
                entry.locator
            )));
        }
        entry.plugin_info.validate(&entry.locator).map_err(|reason| {
            Error::CacheDecodeError(format!("plugin {}: {}", entry.locator, reason))
        })?;
        plugins.insert(
            entry.locator,
            PluginWithAssets {
                info: entry.plugin_info,
                assets: entry.assets,
            },
        );
    }
    Ok(plugins)
}

/// Atomically replace the cache file at `path` with the encoded set
pub fn write_cache(path: &Path, plugins: &ResolvedPlugins) -> Result<()> {
    let write_error = |reason: String| Error::CacheWriteError {
        path: path.to_path_buf(),
        reason,
    };

    let bytes = encode(plugins).map_err(|e| write_error(e.to_string()))?;
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)
        .map_err(|e| write_error(format!("failed to create {}: {e}", dir.display())))?;

    let mut temp = NamedTempFile::new_in(dir)
        .map_err(|e| write_error(format!("failed to create temporary file: {e}")))?;
    temp.write_all(&bytes)
        .and_then(|_| temp.as_file().sync_all())
        .map_err(|e| write_error(e.to_string()))?;
    temp.persist(path)
        .map_err(|e| write_error(e.error.to_string()))?;

    debug!("Wrote {} plugin(s) to cache {}", plugins.len(), path.display());
    Ok(())
}

/// Read the cache at `path`, or `None` if there is no cache file
pub fn read_cache(path: &Path) -> Result<Option<ResolvedPlugins>> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!("No plugin cache at {}", path.display());
            return Ok(None);
        }
        Err(source) => {
            return Err(Error::CacheReadError {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    let plugins = decode(&bytes)?;
    debug!("Loaded {} plugin(s) from cache {}", plugins.len(), path.display());
    Ok(Some(plugins))
}

/// Cache file name for a configuration fingerprint
pub fn cache_file_name(fingerprint: &str) -> String {
    format!("plugins-{fingerprint}.json")
}
