//! Application service: applies a reconciliation plan stack by stack.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.
//! Every action runs to completion before the next one starts, and a failed
//! action never prevents the remaining ones from being attempted.

use std::path::Path;

use crate::application::ports::{StackOrchestrator, StackScanner, TeardownTarget};
use crate::domain::{ActionKind, CycleReport, Outcome, ReconciliationPlan, StackName};

/// Deploy every stack in `plan.to_deploy`, then tear down every stack in
/// `plan.to_remove`, recording one outcome per action.
pub async fn execute_plan(
    orchestrator: &impl StackOrchestrator,
    scanner: &impl StackScanner,
    stacks_root: &Path,
    plan: &ReconciliationPlan,
) -> CycleReport {
    let mut report = CycleReport::new();

    for name in &plan.to_deploy {
        report.record(deploy(orchestrator, stacks_root, name).await);
    }
    for name in &plan.to_remove {
        report.record(remove(orchestrator, scanner, stacks_root, name).await);
    }

    report
}

async fn deploy(
    orchestrator: &impl StackOrchestrator,
    stacks_root: &Path,
    name: &StackName,
) -> Outcome {
    let dir = stacks_root.join(name.as_str());
    tracing::info!(stack = %name, "deploying stack");
    match orchestrator.up(&dir).await {
        Ok(()) => {
            tracing::info!(stack = %name, "stack deployed");
            Outcome::success(name.clone(), ActionKind::Deploy)
        }
        Err(e) => {
            let detail = format!("{e:#}");
            tracing::warn!(stack = %name, error = %detail, "failed to deploy stack");
            Outcome::failure(name.clone(), ActionKind::Deploy, detail)
        }
    }
}

async fn remove(
    orchestrator: &impl StackOrchestrator,
    scanner: &impl StackScanner,
    stacks_root: &Path,
    name: &StackName,
) -> Outcome {
    let target = teardown_target(scanner, stacks_root, name);
    tracing::info!(stack = %name, ?target, "stack was removed, tearing down");
    match orchestrator.down(&target).await {
        Ok(()) => {
            tracing::info!(stack = %name, "stack torn down");
            Outcome::success(name.clone(), ActionKind::Remove)
        }
        Err(e) => {
            let detail = format!("{e:#}");
            tracing::warn!(stack = %name, error = %detail, "failed to tear down stack");
            Outcome::failure(name.clone(), ActionKind::Remove, detail)
        }
    }
}

/// Address the stack by directory while compose can still read its manifest
/// there, otherwise by project name.
#[must_use]
pub fn teardown_target(
    scanner: &impl StackScanner,
    stacks_root: &Path,
    name: &StackName,
) -> TeardownTarget {
    let dir = stacks_root.join(name.as_str());
    if scanner.manifest_in(&dir).is_some() {
        TeardownTarget::Directory(dir)
    } else {
        TeardownTarget::Project(name.clone())
    }
}
