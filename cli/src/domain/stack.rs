//! Stack identity, eligibility rules and the inventory set.
//!
//! Pure types only: directory listing lives in `crate::infra::scanner`.

use std::borrow::Borrow;
use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::domain::error::StackError;

// ── Constants ────────────────────────────────────────────────────────────────

/// Accepted compose manifest filenames, in priority order.
pub const MANIFEST_FILENAMES: &[&str] = &[
    "docker-compose.yml",
    "docker-compose.yaml",
    "compose.yml",
    "compose.yaml",
];

/// Marker file whose presence excludes a directory from the inventory.
pub const IGNORE_MARKER: &str = "ignore";

/// Directories starting with this character are never stacks.
pub const HIDDEN_PREFIX: char = '.';

// ── StackName ────────────────────────────────────────────────────────────────

/// Directory name of a stack. Also used as the compose project name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StackName(String);

impl StackName {
    /// Validate and wrap a stack name.
    ///
    /// # Errors
    ///
    /// Returns `StackError::InvalidName` if the name is empty, `.`/`..`, or
    /// contains a path separator or NUL.
    pub fn new(name: impl Into<String>) -> Result<Self, StackError> {
        let name = name.into();
        let invalid = name.is_empty()
            || name == "."
            || name == ".."
            || name.contains(['/', '\\', '\0']);
        if invalid {
            return Err(StackError::InvalidName(name));
        }
        Ok(Self(name))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StackName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for StackName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for StackName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for StackName {
    type Error = StackError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for StackName {
    type Error = StackError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<StackName> for String {
    fn from(name: StackName) -> Self {
        name.0
    }
}

// ── Stack ────────────────────────────────────────────────────────────────────

/// A subdirectory of the inventory root as observed by the scanner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stack {
    pub name: StackName,
    pub path: PathBuf,
    /// First matching entry of [`MANIFEST_FILENAMES`], if any.
    pub manifest: Option<&'static str>,
    /// Whether the [`IGNORE_MARKER`] file is present.
    pub ignored: bool,
}

impl Stack {
    /// A stack is deployable iff it has a manifest and no ignore marker.
    #[must_use]
    pub fn is_eligible(&self) -> bool {
        self.manifest.is_some() && !self.ignored
    }
}

/// Returns `true` when a directory name follows the hidden-directory convention.
#[must_use]
pub fn is_hidden(dir_name: &str) -> bool {
    dir_name.starts_with(HIDDEN_PREFIX)
}

// ── Inventory ────────────────────────────────────────────────────────────────

/// A set of eligible stack names observed at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Inventory(BTreeSet<StackName>);

impl Inventory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the current inventory from scanned stacks, keeping eligible ones.
    #[must_use]
    pub fn from_stacks<'a>(stacks: impl IntoIterator<Item = &'a Stack>) -> Self {
        stacks
            .into_iter()
            .filter(|s| s.is_eligible())
            .map(|s| s.name.clone())
            .collect()
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(name)
    }

    /// Look up the stored name equal to `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&StackName> {
        self.0.get(name)
    }

    pub fn insert(&mut self, name: StackName) -> bool {
        self.0.insert(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &StackName> {
        self.0.iter()
    }

    /// Names in `self` that are absent from `other`.
    #[must_use]
    pub fn difference(&self, other: &Inventory) -> BTreeSet<StackName> {
        self.0.difference(&other.0).cloned().collect()
    }

    #[must_use]
    pub fn as_set(&self) -> &BTreeSet<StackName> {
        &self.0
    }
}

impl FromIterator<StackName> for Inventory {
    fn from_iter<T: IntoIterator<Item = StackName>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl From<BTreeSet<StackName>> for Inventory {
    fn from(set: BTreeSet<StackName>) -> Self {
        Self(set)
    }
}

impl<'a> IntoIterator for &'a Inventory {
    type Item = &'a StackName;
    type IntoIter = std::collections::btree_set::Iter<'a, StackName>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

// ── Unit tests ───────────────────────────────────────────────────────────────
