//! Per-stack action outcomes collected over one reconciliation cycle.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::stack::StackName;

/// Which action was applied to a stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Deploy,
    Remove,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Deploy => f.write_str("deploy"),
            Self::Remove => f.write_str("remove"),
        }
    }
}

/// Result of one action on one stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    pub stack: StackName,
    pub action: ActionKind,
    /// `None` on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Outcome {
    #[must_use]
    pub fn success(stack: StackName, action: ActionKind) -> Self {
        Self {
            stack,
            action,
            error: None,
        }
    }

    #[must_use]
    pub fn failure(stack: StackName, action: ActionKind, error: impl Into<String>) -> Self {
        Self {
            stack,
            action,
            error: Some(error.into()),
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Label used in reports: `web` for deploys, `web (removed)` for teardowns.
    #[must_use]
    pub fn label(&self) -> String {
        match self.action {
            ActionKind::Deploy => self.stack.to_string(),
            ActionKind::Remove => format!("{} (removed)", self.stack),
        }
    }
}

/// Aggregate status of a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleStatus {
    /// No action was attempted.
    Idle,
    Succeeded,
    Partial,
    Failed,
}

/// Every outcome of one cycle, keyed by `(action, stack)`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    outcomes: BTreeMap<(ActionKind, StackName), Outcome>,
}

impl CycleReport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an outcome. A later outcome for the same `(action, stack)`
    /// replaces the earlier one; outcomes of other keys are untouched.
    pub fn record(&mut self, outcome: Outcome) {
        self.outcomes
            .insert((outcome.action, outcome.stack.clone()), outcome);
    }

    #[must_use]
    pub fn get(&self, action: ActionKind, stack: &StackName) -> Option<&Outcome> {
        self.outcomes.get(&(action, stack.clone()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Outcome> {
        self.outcomes.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn succeeded(&self) -> impl Iterator<Item = &Outcome> {
        self.iter().filter(|o| o.is_success())
    }

    pub fn failed(&self) -> impl Iterator<Item = &Outcome> {
        self.iter().filter(|o| !o.is_success())
    }

    /// Stacks whose deploy action failed this cycle.
    pub fn failed_deploys(&self) -> impl Iterator<Item = &StackName> {
        self.failed()
            .filter(|o| o.action == ActionKind::Deploy)
            .map(|o| &o.stack)
    }

    #[must_use]
    pub fn status(&self) -> CycleStatus {
        let failed = self.failed().count();
        match (self.outcomes.len(), failed) {
            (0, _) => CycleStatus::Idle,
            (_, 0) => CycleStatus::Succeeded,
            (total, f) if f == total => CycleStatus::Failed,
            _ => CycleStatus::Partial,
        }
    }
}

// ── Unit tests ───────────────────────────────────────────────────────────────
