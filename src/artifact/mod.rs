// src/artifact/mod.rs

//! Artifact resolution: locate, download, unpack and verify a single file
//!
//! Plugins and assets go through the same steps:
//!
//! 1. If the unpacked file already exists in the destination directory, reuse it.
//! 2. Otherwise try the declaration's own resolver, or else each default
//!    resolver in order, until one writes the archive into the downloads
//!    directory; then unpack the archive's single file into place.
//! 3. If a checksum is declared for the target platform, verify it.

mod archive;
mod client;
mod resolver;

pub use archive::{unpack_single_file, MAX_UNPACKED_SIZE};
pub use client::ArtifactClient;
pub use resolver::{ArtifactSource, Resolver, TemplateResolver, TEMPLATE_VARIABLES};

use crate::error::{Error, Result};
use crate::hash::{self, Checksum};
use crate::locator::Locator;
use crate::paths;
use crate::platform::OsArch;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A plugin or asset as declared by the caller
#[derive(Clone)]
pub struct ArtifactDeclaration {
    pub locator: Locator,
    /// Resolver used instead of the defaults when set
    pub resolver: Option<Arc<dyn Resolver>>,
    /// Expected SHA-256 of the unpacked file, per platform
    pub checksums: BTreeMap<OsArch, Checksum>,
}

impl ArtifactDeclaration {
    pub fn new(locator: Locator) -> Self {
        Self {
            locator,
            resolver: None,
            checksums: BTreeMap::new(),
        }
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn Resolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn with_checksum(mut self, platform: OsArch, checksum: Checksum) -> Self {
        self.checksums.insert(platform, checksum);
        self
    }

    /// Resolvers to try, in order
    fn resolvers<'a>(&'a self, defaults: &'a [Arc<dyn Resolver>]) -> Vec<&'a Arc<dyn Resolver>> {
        match &self.resolver {
            Some(custom) => vec![custom],
            None => defaults.iter().collect(),
        }
    }
}

impl fmt::Debug for ArtifactDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArtifactDeclaration")
            .field("locator", &self.locator.to_string())
            .field("resolver", &self.resolver.as_ref().map(|r| r.describe()))
            .field("checksums", &self.checksums)
            .finish()
    }
}

/// Make the file for `decl` available in `dest_dir` and return its path
///
/// Callers must hold the resolver lock for `dest_dir`'s plugins directory.
pub fn resolve_artifact(
    decl: &ArtifactDeclaration,
    dest_dir: &Path,
    downloads_dir: &Path,
    default_resolvers: &[Arc<dyn Resolver>],
    platform: &OsArch,
) -> Result<PathBuf> {
    let dest = paths::artifact_path(dest_dir, &decl.locator);

    if dest.exists() {
        debug!("{} already present at {}", decl.locator, dest.display());
    } else {
        let archive = paths::download_path(downloads_dir, &decl.locator, platform);
        fetch_archive(decl, &archive, default_resolvers, platform)?;
        unpack_single_file(&archive, &dest)?;
        info!("Resolved {} to {}", decl.locator, dest.display());
    }

    if let Some(expected) = decl.checksums.get(platform) {
        verify_checksum(&decl.locator, &dest, expected)?;
    }

    Ok(dest)
}

/// Run the resolver chain until one produces `archive`
fn fetch_archive(
    decl: &ArtifactDeclaration,
    archive: &Path,
    default_resolvers: &[Arc<dyn Resolver>],
    platform: &OsArch,
) -> Result<()> {
    let mut attempts = Vec::new();

    for resolver in decl.resolvers(default_resolvers) {
        debug!("Resolving {} using {}", decl.locator, resolver.describe());
        match resolver.resolve(&decl.locator, platform, archive) {
            Ok(()) => return Ok(()),
            Err(e) => {
                debug!("Resolver {} failed for {}: {}", resolver.describe(), decl.locator, e);
                attempts.push(format!("{}: {}", resolver.describe(), e));
            }
        }
    }

    Err(Error::ResolverExhausted {
        locator: decl.locator.clone(),
        attempts,
    })
}

fn verify_checksum(locator: &Locator, path: &Path, expected: &Checksum) -> Result<()> {
    match hash::verify_file_sha256(path, expected)? {
        Ok(()) => {
            debug!("Checksum verified for {}", locator);
            Ok(())
        }
        Err(mismatch) => {
            // Remove the bad file so the next run fetches it again
            warn!("Checksum mismatch for {}, removing {}", locator, path.display());
            let _ = fs::remove_file(path);
            Err(Error::ChecksumMismatch {
                locator: locator.clone(),
                expected: mismatch.expected,
                actual: mismatch.actual,
            })
        }
    }
}
