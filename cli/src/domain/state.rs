//! Durable deployment baseline.
//!
//! Pure data plus the rule that advances it at the end of a cycle. Loading
//! and saving live in `crate::infra::state`.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::domain::outcome::{ActionKind, CycleReport};
use crate::domain::stack::{Inventory, StackName};

/// The record persisted between cycles and across restarts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentState {
    /// Stacks considered deployed as of the last executed cycle.
    #[serde(default, deserialize_with = "deserialize_stack_set")]
    pub deployed_stacks: Inventory,

    /// Subset of `deployed_stacks` whose most recent deploy attempt failed.
    #[serde(default)]
    pub failed_stacks: BTreeSet<StackName>,

    /// Repository revision the baseline corresponds to.
    #[serde(default, alias = "last_commit", skip_serializing_if = "Option::is_none")]
    pub last_revision: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl DeploymentState {
    /// Advance the baseline after a cycle has executed.
    ///
    /// `deployed_stacks` becomes `current` whether or not individual actions
    /// succeeded. Failed deploys are remembered in `failed_stacks`; a stack
    /// that deployed successfully, or that left the inventory, is cleared.
    pub fn advance(
        &mut self,
        current: &Inventory,
        report: &CycleReport,
        revision: Option<&str>,
        now: DateTime<Utc>,
    ) {
        let mut failed: BTreeSet<StackName> = self
            .failed_stacks
            .iter()
            .filter(|name| current.contains(name.as_str()))
            .filter(|name| report.get(ActionKind::Deploy, name).is_none())
            .cloned()
            .collect();
        failed.extend(
            report
                .failed_deploys()
                .filter(|name| current.contains(name.as_str()))
                .cloned(),
        );

        self.deployed_stacks = current.clone();
        self.failed_stacks = failed;
        if let Some(rev) = revision {
            self.last_revision = Some(rev.to_string());
        }
        self.updated_at = Some(now);
    }
}

/// Accepts either a list of names or the legacy `{"name": bool}` map, where
/// only `true` entries are members.
fn deserialize_stack_set<'de, D>(deserializer: D) -> Result<Inventory, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StackSet {
        List(Vec<StackName>),
        Map(BTreeMap<StackName, bool>),
        Null(()),
    }

    Ok(match StackSet::deserialize(deserializer)? {
        StackSet::List(names) => names.into_iter().collect(),
        StackSet::Map(map) => map
            .into_iter()
            .filter_map(|(name, present)| present.then_some(name))
            .collect(),
        StackSet::Null(()) => Inventory::new(),
    })
}

// ── Unit tests ───────────────────────────────────────────────────────────────
