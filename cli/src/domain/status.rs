//! Read-only view of the persisted baseline against the stacks on disk.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::stack::{Inventory, StackName};
use crate::domain::state::DeploymentState;

/// What `barnacle status` reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusSnapshot {
    pub state_found: bool,
    pub last_revision: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
    pub deployed: BTreeSet<StackName>,
    pub failed: BTreeSet<StackName>,
    /// Eligible stacks currently on disk. `None` when the root could not be read.
    pub on_disk: Option<BTreeSet<StackName>>,
    /// On disk but not yet in the baseline.
    pub pending_deploy: BTreeSet<StackName>,
    /// In the baseline but gone from disk.
    pub pending_remove: BTreeSet<StackName>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scan_error: Option<String>,
}

impl StatusSnapshot {
    #[must_use]
    pub fn new(baseline: Option<&DeploymentState>, current: Result<&Inventory, String>) -> Self {
        let empty = DeploymentState::default();
        let state = baseline.unwrap_or(&empty);

        let (on_disk, pending_deploy, pending_remove, scan_error) = match current {
            Ok(current) => (
                Some(current.as_set().clone()),
                current.difference(&state.deployed_stacks),
                state.deployed_stacks.difference(current),
                None,
            ),
            Err(e) => (None, BTreeSet::new(), BTreeSet::new(), Some(e)),
        };

        Self {
            state_found: baseline.is_some(),
            last_revision: state.last_revision.clone(),
            updated_at: state.updated_at,
            deployed: state.deployed_stacks.as_set().clone(),
            failed: state.failed_stacks.clone(),
            on_disk,
            pending_deploy,
            pending_remove,
            scan_error,
        }
    }

    /// Whether the next full cycle would change anything.
    #[must_use]
    pub fn is_in_sync(&self) -> bool {
        self.on_disk.is_some()
            && self.pending_deploy.is_empty()
            && self.pending_remove.is_empty()
            && self.failed.is_empty()
    }
}
