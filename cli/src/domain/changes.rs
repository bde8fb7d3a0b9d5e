//! Change set resolution: maps changed repository paths to stacks.
//!
//! Pure functions only. The caller logs `rejected_paths` and `new_stacks`.

use std::collections::BTreeSet;

use crate::domain::stack::{Inventory, StackName};

/// Separator used by git for repository-relative paths.
pub const PATH_SEPARATOR: char = '/';

const PARENT_DIR: &str = "..";
const CURRENT_DIR: &str = ".";

/// How a single changed path maps onto the inventory root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathTarget<'a> {
    /// The path may belong to the stack with this directory name.
    Candidate(&'a str),
    /// The first segment requests upward traversal. Never attributed.
    Escapes,
    /// The path refers to the root itself (`.`).
    Root,
}

/// Classify a changed path by its leading segment(s).
#[must_use]
pub fn path_target(path: &str) -> PathTarget<'_> {
    let mut segments = path.split(PATH_SEPARATOR);
    match segments.next() {
        Some(PARENT_DIR) => PathTarget::Escapes,
        Some(CURRENT_DIR) => segments.next().map_or(PathTarget::Root, PathTarget::Candidate),
        Some(first) => PathTarget::Candidate(first),
        None => PathTarget::Root,
    }
}

/// Re-express a repository-relative path relative to the stacks root, which
/// lives at `prefix` inside the repository. Paths outside the root give
/// `None`.
#[must_use]
pub fn relative_to_root<'a>(path: &'a str, prefix: &str) -> Option<&'a str> {
    let prefix = prefix.trim_matches(PATH_SEPARATOR);
    if prefix.is_empty() {
        return Some(path);
    }
    path.strip_prefix(prefix)?
        .strip_prefix(PATH_SEPARATOR)
        .filter(|rest| !rest.is_empty())
}

/// Result of resolving one change set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeResolution {
    /// Current stacks whose contents changed, plus every new stack.
    pub affected: BTreeSet<StackName>,
    /// Stacks present in the baseline but gone from disk.
    pub deleted: BTreeSet<StackName>,
    /// Current stacks absent from the baseline (subset of `affected`).
    pub new_stacks: BTreeSet<StackName>,
    /// Paths discarded because they escape the root.
    pub rejected_paths: Vec<String>,
}

/// Map changed paths plus current and persisted inventories to the affected
/// and deleted stack sets.
///
/// Membership of both sets is independent of the order of `changed`.
#[must_use]
pub fn resolve_changes<S: AsRef<str>>(
    changed: &[S],
    current: &Inventory,
    persisted: &Inventory,
) -> ChangeResolution {
    let mut resolution = ChangeResolution::default();

    for path in changed {
        let path = path.as_ref();
        match path_target(path) {
            PathTarget::Escapes => resolution.rejected_paths.push(path.to_string()),
            PathTarget::Root => {}
            PathTarget::Candidate(name) => {
                if let Some(stack) = current.get(name) {
                    resolution.affected.insert(stack.clone());
                }
            }
        }
    }

    resolution.new_stacks = current.difference(persisted);
    resolution
        .affected
        .extend(resolution.new_stacks.iter().cloned());
    resolution.deleted = persisted.difference(current);

    resolution
}

// ── Unit tests ───────────────────────────────────────────────────────────────
