//! Application service: one poll tick of the reconciliation daemon.
//!
//! The daemon owns the baseline and the repository phase. Each tick either
//! waits for the remote to receive content, performs the initial full
//! deploy, or pulls and reconciles whatever changed.

use anyhow::Result;

use crate::application::ports::{
    DeploymentStateStore, Notifier, RepoSource, RepoStatus, RevisionChange, StackOrchestrator,
    StackScanner,
};
use crate::application::services::reconcile::{
    CycleOptions, CycleSummary, CycleTrigger, deliver, run_cycle,
};
use crate::domain::{ChangeSet, DeploymentState};

/// Where the daemon stands with respect to the repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepoPhase {
    /// No usable clone yet (not cloned, or the remote is empty).
    AwaitingContent,
    /// Clone is ready; ticks pull and reconcile changes.
    Tracking,
}

/// What one tick did.
#[derive(Debug)]
pub enum TickOutcome {
    /// The remote is still empty.
    Waiting,
    /// Repository content was acquired and every stack was reconciled.
    InitialDeploy(CycleSummary),
    /// Nothing new upstream.
    UpToDate,
    /// New commits were pulled and reconciled.
    Updated(CycleSummary),
}

/// Collaborators used by the daemon.
pub struct DaemonPorts<'a, R, O, S, St, N> {
    pub repo: &'a R,
    pub orchestrator: &'a O,
    pub scanner: &'a S,
    pub store: &'a St,
    pub notifier: &'a N,
}

/// Mutable state owned by the single control loop.
#[derive(Debug, Clone)]
pub struct DaemonSession {
    pub phase: RepoPhase,
    pub baseline: DeploymentState,
    /// Pulled revisions whose cycle has not completed yet. The working tree
    /// is already at `to`, so later pulls will not report them again.
    pub pending: Option<RevisionChange>,
}

impl DaemonSession {
    #[must_use]
    pub fn new(baseline: DeploymentState) -> Self {
        Self {
            phase: RepoPhase::AwaitingContent,
            baseline,
            pending: None,
        }
    }
}

/// Run one tick.
///
/// # Errors
///
/// Returns an error for fatal-to-cycle conditions (clone/fetch failures,
/// missing credentials, unreadable stacks root). The session is left in a
/// state from which the next tick retries.
pub async fn tick<R, O, S, St, N>(
    ports: &DaemonPorts<'_, R, O, S, St, N>,
    session: &mut DaemonSession,
    opts: CycleOptions<'_>,
) -> Result<TickOutcome>
where
    R: RepoSource,
    O: StackOrchestrator,
    S: StackScanner,
    St: DeploymentStateStore,
    N: Notifier,
{
    match session.phase {
        RepoPhase::AwaitingContent => initial_tick(ports, session, opts).await,
        RepoPhase::Tracking => update_tick(ports, session, opts).await,
    }
}

async fn initial_tick<R, O, S, St, N>(
    ports: &DaemonPorts<'_, R, O, S, St, N>,
    session: &mut DaemonSession,
    opts: CycleOptions<'_>,
) -> Result<TickOutcome>
where
    R: RepoSource,
    O: StackOrchestrator,
    S: StackScanner,
    St: DeploymentStateStore,
    N: Notifier,
{
    let revision = match ports.repo.initialize().await? {
        RepoStatus::Empty => {
            tracing::info!("repository is empty, waiting for content to be pushed");
            return Ok(TickOutcome::Waiting);
        }
        RepoStatus::Ready { revision } => revision,
    };

    tracing::info!(revision = %short_revision(&revision), "repository ready, deploying all stacks");
    session.phase = RepoPhase::Tracking;

    let summary = run_cycle(
        ports.orchestrator,
        ports.scanner,
        ports.store,
        ports.notifier,
        &mut session.baseline,
        opts,
        CycleTrigger {
            changes: ChangeSet::Unavailable,
            initial: true,
            revision: Some(revision),
        },
    )
    .await;

    match summary {
        Ok(summary) => Ok(TickOutcome::InitialDeploy(summary)),
        Err(e) => {
            // The initial full deploy has not happened yet; try again next tick.
            session.phase = RepoPhase::AwaitingContent;
            Err(e)
        }
    }
}

async fn update_tick<R, O, S, St, N>(
    ports: &DaemonPorts<'_, R, O, S, St, N>,
    session: &mut DaemonSession,
    opts: CycleOptions<'_>,
) -> Result<TickOutcome>
where
    R: RepoSource,
    O: StackOrchestrator,
    S: StackScanner,
    St: DeploymentStateStore,
    N: Notifier,
{
    let pulled = ports.repo.pull().await?;
    let fresh = pulled.is_some();
    let Some(change) = merge_pending(session.pending.take(), pulled) else {
        tracing::info!("no updates found");
        return Ok(TickOutcome::UpToDate);
    };

    if fresh {
        tracing::info!(
            from = %short_revision(&change.from),
            to = %short_revision(&change.to),
            "repository updated"
        );
    } else {
        tracing::info!(
            from = %short_revision(&change.from),
            to = %short_revision(&change.to),
            "retrying unreconciled update"
        );
    }

    let changes = match ports.repo.changed_paths(&change.from, &change.to).await {
        Ok(paths) => ChangeSet::Paths(paths),
        Err(e) => {
            tracing::warn!(error = %format!("{e:#}"), "failed to get changed files, deploying all stacks");
            ChangeSet::Unavailable
        }
    };

    if fresh {
        deliver(
            ports.notifier.changes_detected(changes.paths()),
            "update detected",
        )
        .await;
    }

    let summary = run_cycle(
        ports.orchestrator,
        ports.scanner,
        ports.store,
        ports.notifier,
        &mut session.baseline,
        opts,
        CycleTrigger {
            changes,
            initial: false,
            revision: Some(change.to.clone()),
        },
    )
    .await;

    match summary {
        Ok(summary) => Ok(TickOutcome::Updated(summary)),
        Err(e) => {
            session.pending = Some(change);
            Err(e)
        }
    }
}

/// Combine a change left over from a failed cycle with a newly pulled one.
/// The result spans from the oldest unreconciled revision to the newest.
fn merge_pending(
    pending: Option<RevisionChange>,
    pulled: Option<RevisionChange>,
) -> Option<RevisionChange> {
    match (pending, pulled) {
        (Some(pending), Some(pulled)) => Some(RevisionChange {
            from: pending.from,
            to: pulled.to,
        }),
        (pending, pulled) => pulled.or(pending),
    }
}

/// Abbreviate a revision for logs.
#[must_use]
pub fn short_revision(revision: &str) -> &str {
    revision.get(..7).unwrap_or(revision)
}
