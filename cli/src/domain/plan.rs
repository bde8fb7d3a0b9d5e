//! Reconciliation planner: decides what to deploy and what to remove.
//!
//! Pure functions only: no I/O, no async, no filesystem access.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::domain::changes::{ChangeResolution, relative_to_root, resolve_changes};
use crate::domain::stack::{Inventory, StackName};
use crate::domain::state::DeploymentState;

/// Changed paths between two revisions, or the fact that they are unknown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeSet {
    /// The diff could not be computed, or there is no previous revision.
    Unavailable,
    /// Repository-relative paths, as reported by the diff. May be empty.
    Paths(Vec<String>),
}

impl ChangeSet {
    #[must_use]
    pub fn paths(&self) -> &[String] {
        match self {
            Self::Unavailable => &[],
            Self::Paths(paths) => paths,
        }
    }

    /// Keep only the paths under the stacks root at `prefix`, relative to it.
    #[must_use]
    pub fn relative_to(&self, prefix: &str) -> Self {
        match self {
            Self::Unavailable => Self::Unavailable,
            Self::Paths(paths) => Self::Paths(
                paths
                    .iter()
                    .filter_map(|path| relative_to_root(path, prefix))
                    .map(str::to_string)
                    .collect(),
            ),
        }
    }
}

/// Whether every current stack deploys or only the affected ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanKind {
    Full,
    Targeted,
}

/// What to do with stacks whose last deploy failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryPolicy {
    /// Failed stacks are deployed again on the next targeted cycle.
    #[default]
    RetryFailed,
    /// Failed stacks are only deployed again when their own files change.
    OnChangeOnly,
}

impl RetryPolicy {
    #[must_use]
    pub fn from_flag(retry_failed: bool) -> Self {
        if retry_failed {
            Self::RetryFailed
        } else {
            Self::OnChangeOnly
        }
    }
}

/// The decision for one cycle.
///
/// `to_deploy ⊆ current`, `to_remove = persisted \ current`, and the two
/// sets are disjoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconciliationPlan {
    pub kind: PlanKind,
    pub to_deploy: BTreeSet<StackName>,
    pub to_remove: BTreeSet<StackName>,
    /// Stacks absent from the baseline.
    pub new_stacks: BTreeSet<StackName>,
    /// Previously failed stacks scheduled again by the retry policy.
    pub retried: BTreeSet<StackName>,
    /// Changed paths discarded because they escape the root.
    pub rejected_paths: Vec<String>,
}

impl ReconciliationPlan {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.to_deploy.is_empty() && self.to_remove.is_empty()
    }
}

/// Build the plan for one cycle.
///
/// A full plan is built when `initial` is set (first cycle after acquiring
/// repository content) or when the change set is unavailable.
#[must_use]
pub fn build_plan(
    changes: &ChangeSet,
    initial: bool,
    current: &Inventory,
    baseline: &DeploymentState,
    policy: RetryPolicy,
) -> ReconciliationPlan {
    let persisted = &baseline.deployed_stacks;
    let full = initial || matches!(changes, ChangeSet::Unavailable);

    let ChangeResolution {
        affected,
        deleted,
        new_stacks,
        rejected_paths,
    } = resolve_changes(changes.paths(), current, persisted);

    if full {
        return ReconciliationPlan {
            kind: PlanKind::Full,
            to_deploy: current.as_set().clone(),
            to_remove: deleted,
            new_stacks,
            retried: BTreeSet::new(),
            rejected_paths,
        };
    }

    let retried: BTreeSet<StackName> = match policy {
        RetryPolicy::RetryFailed => baseline
            .failed_stacks
            .iter()
            .filter(|name| current.contains(name.as_str()) && !affected.contains(*name))
            .cloned()
            .collect(),
        RetryPolicy::OnChangeOnly => BTreeSet::new(),
    };

    let mut to_deploy = affected;
    to_deploy.extend(retried.iter().cloned());

    ReconciliationPlan {
        kind: PlanKind::Targeted,
        to_deploy,
        to_remove: deleted,
        new_stacks,
        retried,
        rejected_paths,
    }
}

// ── Unit tests ───────────────────────────────────────────────────────────────
