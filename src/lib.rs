// src/lib.rs

//! Kiln plugin engine
//!
//! Resolves build-tool plugins declared by a project, verifies that they can
//! be loaded together, and turns them into runnable tasks.
//!
//! # Architecture
//!
//! - Locators: every plugin and asset is identified by `group:product:version`
//! - Resolution: plugin executables and assets are fetched through template
//!   resolvers and unpacked into a shared home directory, serialized across
//!   processes by a file lock
//! - Info query: each plugin describes its tasks as JSON on `__plugin-info`
//! - Verification: duplicate products, colliding configuration files and
//!   overlapping task names are rejected before any task runs
//! - Cache: the resolved set is persisted so later runs skip resolution

pub mod artifact;
pub mod cache;
pub mod config;
mod error;
pub mod hash;
pub mod locator;
pub mod lock;
pub mod paths;
pub mod platform;
pub mod plugin;
pub mod task;

pub use error::{indent, Error, ResolutionErrors, Result, INDENT_SPACES};
pub use locator::Locator;
pub use paths::ResourceDirs;
pub use platform::OsArch;
pub use plugin::{load_plugins_tasks, LoadedTasks, PluginDeclaration, PluginsParam};
