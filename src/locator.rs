// src/locator.rs

//! Artifact locators
//!
//! A locator identifies a plugin or asset using the format
//! `group:product:version`, for example `com.example:license-plugin:1.2.0`.
//!
//! Locators order by group, then product, then version (plain string
//! comparison). Every map keyed by locator is a `BTreeMap`, so output and
//! diagnostics come out in the same order on every run.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identity of a plugin or asset artifact
///
/// Serialized as its `group:product:version` string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Locator {
    pub group: String,
    pub product: String,
    pub version: String,
}

impl Locator {
    pub fn new(
        group: impl Into<String>,
        product: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            group: group.into(),
            product: product.into(),
            version: version.into(),
        }
    }

    /// Parse a locator from `group:product:version`
    pub fn parse(s: &str) -> Result<Self, LocatorParseError> {
        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() != 3 {
            return Err(LocatorParseError::WrongComponentCount {
                input: s.to_string(),
                got: parts.len(),
            });
        }

        let valid_chars = |c: char| c.is_alphanumeric() || matches!(c, '.' | '-' | '_' | '+');
        for (part, name) in parts.iter().zip(["group", "product", "version"]) {
            if part.is_empty() {
                return Err(LocatorParseError::EmptyComponent {
                    input: s.to_string(),
                    component: name,
                });
            }
            if !part.chars().all(valid_chars) {
                return Err(LocatorParseError::InvalidComponent {
                    input: s.to_string(),
                    component: name,
                });
            }
        }

        Ok(Self::new(parts[0], parts[1], parts[2]))
    }

    /// True if both locators name the same plugin, ignoring version
    pub fn same_product(&self, other: &Locator) -> bool {
        self.group == other.group && self.product == other.product
    }

    /// Group with dots replaced by slashes, as used in repository layouts
    pub fn group_path(&self) -> String {
        self.group.replace('.', "/")
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group, self.product, self.version)
    }
}

impl FromStr for Locator {
    type Err = LocatorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Locator::parse(s)
    }
}

impl TryFrom<String> for Locator {
    type Error = LocatorParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Locator::parse(&s)
    }
}

impl From<Locator> for String {
    fn from(locator: Locator) -> Self {
        locator.to_string()
    }
}

/// Errors that can occur when parsing a locator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocatorParseError {
    /// Not exactly three `:`-separated components
    WrongComponentCount { input: String, got: usize },
    /// A component is empty
    EmptyComponent {
        input: String,
        component: &'static str,
    },
    /// A component contains characters outside `[A-Za-z0-9._+-]`
    InvalidComponent {
        input: String,
        component: &'static str,
    },
}

impl fmt::Display for LocatorParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WrongComponentCount { input, got } => write!(
                f,
                "locator {:?} must be of the form group:product:version (found {} components)",
                input, got
            ),
            Self::EmptyComponent { input, component } => {
                write!(f, "locator {:?} has an empty {}", input, component)
            }
            Self::InvalidComponent { input, component } => {
                write!(f, "locator {:?} has invalid characters in its {}", input, component)
            }
        }
    }
}

impl std::error::Error for LocatorParseError {}

impl From<LocatorParseError> for crate::Error {
    fn from(err: LocatorParseError) -> Self {
        crate::Error::InvalidLocator(err.to_string())
    }
}
