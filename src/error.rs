// src/error.rs

//! Error types for plugin resolution, verification and caching

use crate::locator::Locator;
use crate::plugin::verify::CompatibilityError;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Number of spaces used for each indentation level in aggregated errors
pub const INDENT_SPACES: usize = 4;

/// Result type alias using the crate error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by the plugin engine
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("I/O error: {0}")]
    IoError(String),

    #[error("Download error: {0}")]
    DownloadError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Not found: {0}")]
    NotFoundError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid locator: {0}")]
    InvalidLocator(String),

    #[error("failed to lock resolver mutex file {path}: {source}")]
    LockError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to resolve {locator}: {}", format_attempts(.attempts))]
    ResolverExhausted {
        locator: Locator,
        attempts: Vec<String>,
    },

    #[error("invalid archive {path}: {reason}")]
    ArchiveError { path: PathBuf, reason: String },

    #[error("checksum mismatch for {locator}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        locator: Locator,
        expected: String,
        actual: String,
    },

    #[error("failed to get plugin info for {locator}: {reason}")]
    PluginInfoError { locator: Locator, reason: String },

    #[error("failed to get asset(s) for plugin {locator}: {source}")]
    AssetError {
        locator: Locator,
        #[source]
        source: Box<Error>,
    },

    #[error("{0}")]
    Resolution(#[from] ResolutionErrors),

    #[error("{0}")]
    Compatibility(#[from] CompatibilityError),

    #[error("failed to read plugin information from cache file at {path}: {source}")]
    CacheReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode plugin information: {0}")]
    CacheDecodeError(String),

    #[error("failed to write plugin information to cache file at {path}: {reason}")]
    CacheWriteError { path: PathBuf, reason: String },

    #[error("Task failed: {0}")]
    TaskError(String),
}

fn format_attempts(attempts: &[String]) -> String {
    if attempts.is_empty() {
        return "no resolvers available".to_string();
    }
    let mut out = String::from("all resolvers failed:");
    for attempt in attempts {
        out.push('\n');
        out.push_str(&indent(attempt, 1));
    }
    out
}

/// Indent every line of `text` by `levels` indentation levels
pub fn indent(text: &str, levels: usize) -> String {
    let pad = " ".repeat(INDENT_SPACES * levels);
    text.lines()
        .map(|line| format!("{pad}{line}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Per-declaration failures collected during a resolution run
///
/// Keyed by locator so the rendered message is always in sorted order.
#[derive(Debug, Default)]
pub struct ResolutionErrors {
    failures: BTreeMap<Locator, Error>,
}

impl ResolutionErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the failure for a locator, replacing any earlier one
    pub fn insert(&mut self, locator: Locator, error: Error) {
        self.failures.insert(locator, error);
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn len(&self) -> usize {
        self.failures.len()
    }

    /// Failed locators in sorted order
    pub fn locators(&self) -> impl Iterator<Item = &Locator> {
        self.failures.keys()
    }

    pub fn get(&self, locator: &Locator) -> Option<&Error> {
        self.failures.get(locator)
    }
}

impl fmt::Display for ResolutionErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to resolve {} plugin(s):", self.failures.len())?;
        for error in self.failures.values() {
            write!(f, "\n{}", indent(&error.to_string(), 1))?;
        }
        Ok(())
    }
}

impl std::error::Error for ResolutionErrors {}
