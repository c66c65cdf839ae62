// src/artifact/resolver.rs

//! Resolvers turn a locator into a downloaded archive
//!
//! A resolver is a template such as
//! `https://repo.example.com/{{GroupPath}}/{{Product}}/{{Version}}/{{Product}}-{{Version}}-{{OS}}-{{Arch}}.tgz`.
//! Rendering substitutes the locator and platform; `http://` and `https://`
//! results are downloaded, anything else is read from the local filesystem.

use super::client::ArtifactClient;
use crate::error::{Error, Result};
use crate::locator::Locator;
use crate::platform::OsArch;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Template variables understood by [`TemplateResolver`]
pub const TEMPLATE_VARIABLES: &[&str] =
    &["Group", "GroupPath", "Product", "Version", "OS", "Arch"];

/// Produces the archive for a locator at `dest`
pub trait Resolver: Send + Sync + fmt::Debug {
    /// Write the archive for `locator` on `platform` to `dest`
    fn resolve(&self, locator: &Locator, platform: &OsArch, dest: &Path) -> Result<()>;

    /// Short human-readable description used in errors and logs
    fn describe(&self) -> String;
}

/// Where a rendered template points
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactSource {
    Url(url::Url),
    File(PathBuf),
}

/// Resolver backed by a URL or filesystem path template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateResolver {
    template: String,
}

impl TemplateResolver {
    /// Validate a template, rejecting unknown `{{...}}` variables
    pub fn new(template: impl Into<String>) -> Result<Self> {
        let template = template.into();
        if template.trim().is_empty() {
            return Err(Error::ConfigError("resolver template is empty".to_string()));
        }

        let mut rest = template.as_str();
        while let Some(start) = rest.find("{{") {
            let after = &rest[start + 2..];
            let end = after.find("}}").ok_or_else(|| {
                Error::ConfigError(format!("unterminated variable in resolver {:?}", template))
            })?;
            let name = &after[..end];
            if !TEMPLATE_VARIABLES.contains(&name) {
                return Err(Error::ConfigError(format!(
                    "unknown variable {{{{{}}}}} in resolver {:?}",
                    name, template
                )));
            }
            rest = &after[end + 2..];
        }

        Ok(Self { template })
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    /// Substitute the locator and platform into the template
    pub fn render(&self, locator: &Locator, platform: &OsArch) -> String {
        self.template
            .replace("{{GroupPath}}", &locator.group_path())
            .replace("{{Group}}", &locator.group)
            .replace("{{Product}}", &locator.product)
            .replace("{{Version}}", &locator.version)
            .replace("{{OS}}", &platform.os)
            .replace("{{Arch}}", &platform.arch)
    }

    /// Render and classify the artifact location
    pub fn source(&self, locator: &Locator, platform: &OsArch) -> Result<ArtifactSource> {
        let rendered = self.render(locator, platform);
        if rendered.starts_with("http://") || rendered.starts_with("https://") {
            let url = url::Url::parse(&rendered)
                .map_err(|e| Error::ParseError(format!("invalid URL {}: {e}", rendered)))?;
            return Ok(ArtifactSource::Url(url));
        }
        if let Some(path) = rendered.strip_prefix("file://") {
            return Ok(ArtifactSource::File(PathBuf::from(path)));
        }
        Ok(ArtifactSource::File(PathBuf::from(rendered)))
    }
}

impl Resolver for TemplateResolver {
    fn resolve(&self, locator: &Locator, platform: &OsArch, dest: &Path) -> Result<()> {
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                Error::IoError(format!("Failed to create directory {}: {e}", parent.display()))
            })?;
        }

        match self.source(locator, platform)? {
            ArtifactSource::Url(url) => {
                let client = ArtifactClient::new()?;
                client.download_file(url.as_str(), dest)
            }
            ArtifactSource::File(path) => {
                if !path.is_file() {
                    return Err(Error::NotFoundError(format!(
                        "no file at {}",
                        path.display()
                    )));
                }
                debug!("Copying {} to {}", path.display(), dest.display());
                fs::copy(&path, dest).map_err(|e| {
                    Error::IoError(format!(
                        "Failed to copy {} to {}: {e}",
                        path.display(),
                        dest.display()
                    ))
                })?;
                Ok(())
            }
        }
    }

    fn describe(&self) -> String {
        self.template.clone()
    }
}
