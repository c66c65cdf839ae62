// tests/common/mod.rs

//! Shared test utilities and helpers for integration tests.
//!
//! Fake plugins are small shell scripts that answer the info query. They are
//! published into a local repository directory as single-file `.tgz`
//! archives and resolved through a template resolver.

#![allow(dead_code)]

use flate2::write::GzEncoder;
use flate2::Compression;
use kiln::artifact::{Resolver, TemplateResolver};
use kiln::hash::sha256;
use kiln::{Locator, OsArch, ResourceDirs};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// A temporary home directory plus a local artifact repository.
///
/// Keep the fixture alive to prevent cleanup.
pub struct Fixture {
    pub temp: TempDir,
    pub repo: PathBuf,
    pub dirs: ResourceDirs,
}

impl Fixture {
    pub fn new() -> Self {
        let temp = tempfile::tempdir().unwrap();
        let repo = temp.path().join("repo");
        fs::create_dir_all(&repo).unwrap();
        let dirs = ResourceDirs::under(&temp.path().join("home"));
        Self { temp, repo, dirs }
    }

    /// Another home directory sharing the same repository
    pub fn other_dirs(&self, name: &str) -> ResourceDirs {
        ResourceDirs::under(&self.temp.path().join(name))
    }

    pub fn cache_path(&self) -> PathBuf {
        self.dirs.cache.join("plugins.json")
    }

    /// Resolver reading `<repo>/<group>-<product>-<version>-<os>-<arch>.tgz`
    pub fn resolver(&self) -> Arc<dyn Resolver> {
        Arc::new(TemplateResolver::new(repo_template(&self.repo)).unwrap())
    }

    /// Publish a plugin answering the info query; returns the script checksum
    pub fn publish_plugin(
        &self,
        locator: &Locator,
        tasks: &[&str],
        config_file: Option<&str>,
    ) -> String {
        let script = plugin_script(locator, tasks, config_file);
        publish(&self.repo, locator, script.as_bytes());
        sha256(script.as_bytes())
    }

    pub fn publish_asset(&self, locator: &Locator, content: &[u8]) {
        publish(&self.repo, locator, content);
    }
}

pub fn repo_template(repo: &Path) -> String {
    format!(
        "{}/{{{{Group}}}}-{{{{Product}}}}-{{{{Version}}}}-{{{{OS}}}}-{{{{Arch}}}}.tgz",
        repo.display()
    )
}

/// Shell script implementing the info query for `locator`
pub fn plugin_script(locator: &Locator, tasks: &[&str], config_file: Option<&str>) -> String {
    let tasks_json = tasks
        .iter()
        .map(|t| format!(r#"{{"name":"{t}","description":"Run {t}","command":["{t}"]}}"#))
        .collect::<Vec<_>>()
        .join(",");
    let config_json = config_file
        .map(|c| format!(r#","configFileName":"{c}""#))
        .unwrap_or_default();

    format!(
        "#!/bin/sh\n\
         if [ \"$1\" = \"__plugin-info\" ]; then\n\
         \x20 echo '{{\"pluginSchemaVersion\":\"1\",\"id\":\"{locator}\"{config_json},\"tasks\":[{tasks_json}]}}'\n\
         \x20 exit 0\n\
         fi\n\
         echo \"$@\"\n"
    )
}

/// Write `content` as the single file of the archive for `locator`
pub fn publish(repo: &Path, locator: &Locator, content: &[u8]) {
    let platform = OsArch::current();
    let name = format!(
        "{}-{}-{}-{}.tgz",
        locator.group, locator.product, locator.version, platform
    );
    let file = File::create(repo.join(name)).unwrap();
    let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));

    let mut header = tar::Header::new_gnu();
    header.set_size(content.len() as u64);
    header.set_mode(0o755);
    header.set_cksum();
    builder
        .append_data(&mut header, &locator.product, content)
        .unwrap();
    builder.into_inner().unwrap().finish().unwrap();
}

pub fn locator(s: &str) -> Locator {
    Locator::parse(s).unwrap()
}
