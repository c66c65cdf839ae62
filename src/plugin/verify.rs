// src/plugin/verify.rs

//! Compatibility checks across a resolved plugin set
//!
//! Each unordered pair of plugins is checked once. The first matching rule
//! wins, so a pair is never reported twice:
//!
//! 1. same group and product: two versions of one plugin
//! 2. different group, same product, both use configuration: their
//!    configuration files would share a name
//! 3. overlapping task names
//!
//! A conflict is listed under the lower locator of its pair only, and the
//! error header counts pairs rather than plugins. The higher locator appears
//! as a partner line, never as a heading of its own.

use super::ResolvedPlugins;
use crate::error::indent;
use crate::locator::Locator;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::debug;

/// Why two plugins cannot be loaded together
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Conflict {
    /// Both are versions of the same plugin
    DuplicateProduct,
    /// Same product name and both read a configuration file
    SharedConfig,
    /// Both provide the listed tasks (sorted)
    ConflictingTasks(Vec<String>),
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Conflict::DuplicateProduct => write!(f, "different version of the same plugin"),
            Conflict::SharedConfig => write!(
                f,
                "plugins have the same product name and both use configuration (this is not currently supported)"
            ),
            Conflict::ConflictingTasks(tasks) => {
                write!(f, "provides conflicting tasks: [{}]", tasks.join(", "))
            }
        }
    }
}

/// Conflicts keyed by the lower locator of each pair, then by its partner
pub type ConflictReport = BTreeMap<Locator, BTreeMap<Locator, Conflict>>;

/// Aggregated compatibility failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompatibilityError {
    pub report: ConflictReport,
}

impl CompatibilityError {
    /// Number of conflicting pairs
    pub fn conflict_count(&self) -> usize {
        self.report.values().map(BTreeMap::len).sum()
    }
}

impl fmt::Display for CompatibilityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} plugin conflict(s) found:", self.conflict_count())?;
        for (plugin, partners) in &self.report {
            write!(f, "\n{}", indent(&format!("{}:", plugin), 1))?;
            for (partner, conflict) in partners {
                write!(f, "\n{}", indent(&format!("{}: {}", partner, conflict), 2))?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for CompatibilityError {}

/// Compute every conflict in the resolved set
pub fn find_conflicts(plugins: &ResolvedPlugins) -> ConflictReport {
    let mut report = ConflictReport::new();
    let entries: Vec<_> = plugins.iter().collect();

    for (i, (a, a_plugin)) in entries.iter().enumerate() {
        for (b, b_plugin) in &entries[i + 1..] {
            let conflict = if a.same_product(b) {
                Some(Conflict::DuplicateProduct)
            } else if a.product == b.product
                && a_plugin.info.uses_config()
                && b_plugin.info.uses_config()
            {
                Some(Conflict::SharedConfig)
            } else {
                let a_tasks: BTreeSet<&str> = a_plugin.info.task_names().collect();
                let common: Vec<String> = b_plugin
                    .info
                    .task_names()
                    .filter(|t| a_tasks.contains(t))
                    .collect::<BTreeSet<_>>()
                    .into_iter()
                    .map(str::to_string)
                    .collect();
                (!common.is_empty()).then_some(Conflict::ConflictingTasks(common))
            };

            if let Some(conflict) = conflict {
                debug!("Plugins {} and {} conflict: {}", a, b, conflict);
                report
                    .entry((*a).clone())
                    .or_default()
                    .insert((*b).clone(), conflict);
            }
        }
    }

    report
}

/// Fail with every conflict in the set, or succeed silently
pub fn verify_plugin_compatibility(plugins: &ResolvedPlugins) -> Result<(), CompatibilityError> {
    let report = find_conflicts(plugins);
    if report.is_empty() {
        Ok(())
    } else {
        Err(CompatibilityError { report })
    }
}
