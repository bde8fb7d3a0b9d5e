//! Application service: one reconciliation cycle.
//!
//! scan → resolve → plan → execute → persist → notify. Only an unreadable
//! stacks root stops a cycle early; everything after planning degrades to a
//! logged warning.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;

use crate::application::ports::{DeploymentStateStore, Notifier, StackOrchestrator, StackScanner};
use crate::application::services::executor::execute_plan;
use crate::domain::{
    ChangeSet, CycleReport, DeploymentState, Inventory, ReconciliationPlan, RetryPolicy,
    build_plan,
};

/// Upper bound on a single notification delivery.
pub const NOTIFY_TIMEOUT: Duration = Duration::from_secs(15);

/// Static inputs shared by every cycle.
#[derive(Debug, Clone, Copy)]
pub struct CycleOptions<'a> {
    pub stacks_root: &'a Path,
    /// `stacks_root` relative to the repository, for mapping diff paths.
    pub stacks_prefix: &'a str,
    pub policy: RetryPolicy,
}

/// What triggered a cycle.
#[derive(Debug, Clone)]
pub struct CycleTrigger {
    pub changes: ChangeSet,
    /// First cycle after (re-)acquiring repository content.
    pub initial: bool,
    /// Revision the working tree is at, recorded in the baseline.
    pub revision: Option<String>,
}

/// Everything a finished cycle produced.
#[derive(Debug, Clone)]
pub struct CycleSummary {
    pub inventory: Inventory,
    pub plan: ReconciliationPlan,
    pub report: CycleReport,
}

/// Load the persisted baseline. Absence or corruption yields an empty one.
pub async fn load_baseline(store: &impl DeploymentStateStore) -> DeploymentState {
    match store.load_async().await {
        Ok(Some(state)) => {
            tracing::info!(
                stacks = state.deployed_stacks.len(),
                failed = state.failed_stacks.len(),
                "loaded deployment state"
            );
            state
        }
        Ok(None) => {
            tracing::info!("no deployment state found, starting with an empty baseline");
            DeploymentState::default()
        }
        Err(e) => {
            tracing::warn!(error = %format!("{e:#}"), "failed to load deployment state, starting with an empty baseline");
            DeploymentState::default()
        }
    }
}

/// Scan the stacks root and build the plan without executing anything.
///
/// # Errors
///
/// Returns an error if the stacks root cannot be listed.
pub fn preview(
    scanner: &impl StackScanner,
    baseline: &DeploymentState,
    opts: CycleOptions<'_>,
    trigger: &CycleTrigger,
) -> Result<(Inventory, ReconciliationPlan)> {
    let stacks = scanner
        .scan(opts.stacks_root)
        .context("scanning stacks root")?;
    let inventory = Inventory::from_stacks(&stacks);
    let changes = trigger.changes.relative_to(opts.stacks_prefix);
    let plan = build_plan(
        &changes,
        trigger.initial,
        &inventory,
        baseline,
        opts.policy,
    );
    Ok((inventory, plan))
}

/// Run one full reconciliation cycle and advance `baseline`.
///
/// # Errors
///
/// Returns an error only when the stacks root cannot be listed. In that case
/// no action runs and neither `baseline` nor the store is modified.
pub async fn run_cycle(
    orchestrator: &impl StackOrchestrator,
    scanner: &impl StackScanner,
    store: &impl DeploymentStateStore,
    notifier: &impl Notifier,
    baseline: &mut DeploymentState,
    opts: CycleOptions<'_>,
    trigger: CycleTrigger,
) -> Result<CycleSummary> {
    let (inventory, plan) = preview(scanner, baseline, opts, &trigger)?;
    log_plan(&inventory, &plan);

    let report = execute_plan(orchestrator, scanner, opts.stacks_root, &plan).await;

    baseline.advance(&inventory, &report, trigger.revision.as_deref(), Utc::now());
    if let Err(e) = store.save_async(baseline).await {
        tracing::warn!(error = %format!("{e:#}"), "failed to save deployment state");
    }

    tracing::info!(
        deployed = report.succeeded().count(),
        failed = report.failed().count(),
        status = ?report.status(),
        "reconciliation cycle complete"
    );

    if !report.is_empty() {
        deliver(notifier.cycle_completed(&report), "cycle outcome").await;
    }

    Ok(CycleSummary {
        inventory,
        plan,
        report,
    })
}

/// Await a notification with a bounded wait, logging any failure.
pub async fn deliver(send: impl Future<Output = Result<()>>, what: &str) {
    match tokio::time::timeout(NOTIFY_TIMEOUT, send).await {
        Ok(Ok(())) => tracing::debug!(notification = what, "notification sent"),
        Ok(Err(e)) => {
            tracing::warn!(notification = what, error = %format!("{e:#}"), "failed to send notification");
        }
        Err(_) => {
            tracing::warn!(
                notification = what,
                timeout_secs = NOTIFY_TIMEOUT.as_secs(),
                "notification timed out"
            );
        }
    }
}

fn log_plan(inventory: &Inventory, plan: &ReconciliationPlan) {
    for path in &plan.rejected_paths {
        tracing::warn!(path = %path, "skipping changed path outside the stacks root");
    }
    for name in &plan.new_stacks {
        tracing::info!(stack = %name, "new stack detected");
    }
    for name in &plan.to_remove {
        tracing::info!(stack = %name, "deleted stack detected");
    }
    for name in &plan.retried {
        tracing::info!(stack = %name, "retrying stack that failed to deploy previously");
    }
    tracing::info!(
        kind = ?plan.kind,
        stacks_on_disk = inventory.len(),
        deploy = plan.to_deploy.len(),
        remove = plan.to_remove.len(),
        "reconciliation plan ready"
    );
}
