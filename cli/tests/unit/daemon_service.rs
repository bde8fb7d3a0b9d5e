//! Unit tests for the daemon tick state machine.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::path::Path;

use barnacle::application::ports::RepoStatus;
use barnacle::application::services::daemon::{
    DaemonPorts, DaemonSession, RepoPhase, TickOutcome, short_revision, tick,
};
use barnacle::application::services::reconcile::CycleOptions;
use barnacle::domain::{DeploymentState, PlanKind, RetryPolicy};

use crate::helpers::{
    ComposeCall, FakeScanner, MemoryStateStore, ROOT, RecordingNotifier, RecordingOrchestrator,
    ScriptedRepo, baseline, change, inventory, stack_dir,
};

struct Fixture {
    repo: ScriptedRepo,
    orchestrator: RecordingOrchestrator,
    scanner: FakeScanner,
    store: MemoryStateStore,
    notifier: RecordingNotifier,
}

impl Fixture {
    fn new(repo: ScriptedRepo, stacks: &[&str]) -> Self {
        Self {
            repo,
            orchestrator: RecordingOrchestrator::default(),
            scanner: FakeScanner::with(stacks),
            store: MemoryStateStore::default(),
            notifier: RecordingNotifier::default(),
        }
    }

    fn ports(&self) -> DaemonPorts<'_, ScriptedRepo, RecordingOrchestrator, FakeScanner, MemoryStateStore, RecordingNotifier> {
        DaemonPorts {
            repo: &self.repo,
            orchestrator: &self.orchestrator,
            scanner: &self.scanner,
            store: &self.store,
            notifier: &self.notifier,
        }
    }
}

fn opts() -> CycleOptions<'static> {
    CycleOptions {
        stacks_root: Path::new(ROOT),
        stacks_prefix: "",
        policy: RetryPolicy::RetryFailed,
    }
}

fn tracking(state: DeploymentState) -> DaemonSession {
    DaemonSession {
        phase: RepoPhase::Tracking,
        baseline: state,
        pending: None,
    }
}

#[tokio::test]
async fn test_empty_remote_waits_without_deploying() {
    let repo = ScriptedRepo::default();
    repo.push_init(Ok(RepoStatus::Empty));
    let fx = Fixture::new(repo, &["web"]);
    let mut session = DaemonSession::new(DeploymentState::default());

    let outcome = tick(&fx.ports(), &mut session, opts()).await.expect("tick");

    assert!(matches!(outcome, TickOutcome::Waiting));
    assert_eq!(session.phase, RepoPhase::AwaitingContent);
    assert!(fx.orchestrator.calls().is_empty());
    assert_eq!(fx.store.save_count(), 0);
}

#[tokio::test]
async fn test_content_arriving_triggers_full_deploy() {
    let repo = ScriptedRepo::default();
    repo.push_init(Ok(RepoStatus::Empty));
    repo.push_init(Ok(RepoStatus::Ready {
        revision: "abc1234567".into(),
    }));
    let fx = Fixture::new(repo, &["web", "db"]);
    // A stale baseline must not shrink the initial deploy.
    let mut session = DaemonSession::new(baseline(&["web", "db"], &[]));

    tick(&fx.ports(), &mut session, opts()).await.expect("first tick");
    let outcome = tick(&fx.ports(), &mut session, opts()).await.expect("second tick");

    let TickOutcome::InitialDeploy(summary) = outcome else {
        panic!("expected initial deploy, got {outcome:?}");
    };
    assert_eq!(summary.plan.kind, PlanKind::Full);
    assert_eq!(
        fx.orchestrator.calls(),
        vec![
            ComposeCall::Up(stack_dir("db")),
            ComposeCall::Up(stack_dir("web")),
        ]
    );
    assert_eq!(session.phase, RepoPhase::Tracking);
    assert_eq!(session.baseline.last_revision.as_deref(), Some("abc1234567"));
    assert!(fx.notifier.change_notifications().is_empty());
}

#[tokio::test]
async fn test_initialize_error_stays_awaiting_content() {
    let repo = ScriptedRepo::default();
    repo.push_init(Err("git clone failed: could not read from remote".into()));
    let fx = Fixture::new(repo, &["web"]);
    let mut session = DaemonSession::new(DeploymentState::default());

    tick(&fx.ports(), &mut session, opts())
        .await
        .expect_err("clone failure is fatal to the tick");

    assert_eq!(session.phase, RepoPhase::AwaitingContent);
}

#[tokio::test]
async fn test_initial_scan_failure_retries_full_deploy_next_tick() {
    let repo = ScriptedRepo::ready("abc1234");
    repo.push_init(Ok(RepoStatus::Ready {
        revision: "abc1234".into(),
    }));
    let fx = Fixture {
        scanner: FakeScanner::unreadable(),
        ..Fixture::new(repo, &[])
    };
    let mut session = DaemonSession::new(DeploymentState::default());

    tick(&fx.ports(), &mut session, opts())
        .await
        .expect_err("scan failure");
    assert_eq!(session.phase, RepoPhase::AwaitingContent);

    fx.scanner.set(&["web"]);
    let outcome = tick(&fx.ports(), &mut session, opts()).await.expect("retry");

    assert!(matches!(outcome, TickOutcome::InitialDeploy(_)));
    assert_eq!(fx.orchestrator.calls(), vec![ComposeCall::Up(stack_dir("web"))]);
}

#[tokio::test]
async fn test_up_to_date_pull_runs_no_cycle() {
    let repo = ScriptedRepo::default();
    repo.push_pull(Ok(None));
    let fx = Fixture::new(repo, &["web"]);
    let mut session = tracking(baseline(&["web"], &[]));

    let outcome = tick(&fx.ports(), &mut session, opts()).await.expect("tick");

    assert!(matches!(outcome, TickOutcome::UpToDate));
    assert!(fx.orchestrator.calls().is_empty());
    assert!(fx.notifier.change_notifications().is_empty());
    assert_eq!(fx.store.save_count(), 0);
}

#[tokio::test]
async fn test_update_notifies_and_runs_targeted_cycle() {
    let repo = ScriptedRepo::default();
    repo.push_pull(Ok(Some(change("aaaaaaa1", "bbbbbbb2"))));
    repo.set_diff(Ok(vec!["web/compose.yml"]));
    let fx = Fixture::new(repo, &["web", "db"]);
    let mut session = tracking(baseline(&["web", "db"], &[]));

    let outcome = tick(&fx.ports(), &mut session, opts()).await.expect("tick");

    let TickOutcome::Updated(summary) = outcome else {
        panic!("expected update, got {outcome:?}");
    };
    assert_eq!(summary.plan.kind, PlanKind::Targeted);
    assert_eq!(fx.orchestrator.calls(), vec![ComposeCall::Up(stack_dir("web"))]);
    assert_eq!(
        fx.notifier.change_notifications(),
        vec![vec!["web/compose.yml".to_string()]]
    );
    assert_eq!(fx.notifier.cycle_notifications().len(), 1);
    assert_eq!(session.baseline.last_revision.as_deref(), Some("bbbbbbb2"));
    assert_eq!(fx.store.saved().expect("saved").deployed_stacks, inventory(&["db", "web"]));
}

#[tokio::test]
async fn test_diff_failure_falls_back_to_full_plan() {
    let repo = ScriptedRepo::default();
    repo.push_pull(Ok(Some(change("aaaaaaa1", "bbbbbbb2"))));
    repo.set_diff(Err("bad object aaaaaaa1"));
    let fx = Fixture::new(repo, &["web", "db"]);
    let mut session = tracking(baseline(&["web", "db", "old"], &[]));

    let outcome = tick(&fx.ports(), &mut session, opts()).await.expect("tick");

    let TickOutcome::Updated(summary) = outcome else {
        panic!("expected update, got {outcome:?}");
    };
    assert_eq!(summary.plan.kind, PlanKind::Full);
    assert_eq!(summary.plan.to_deploy.len(), 2);
    assert_eq!(summary.plan.to_remove.len(), 1);
    assert_eq!(fx.notifier.change_notifications(), vec![Vec::<String>::new()]);
}

#[tokio::test]
async fn test_pull_failure_is_fatal_to_tick_only() {
    let repo = ScriptedRepo::default();
    repo.push_pull(Err("git fetch failed: connection reset".into()));
    repo.push_pull(Ok(None));
    let fx = Fixture::new(repo, &["web"]);
    let mut session = tracking(baseline(&["web"], &[]));

    tick(&fx.ports(), &mut session, opts())
        .await
        .expect_err("fetch failure");
    let outcome = tick(&fx.ports(), &mut session, opts()).await.expect("next tick");

    assert!(matches!(outcome, TickOutcome::UpToDate));
    assert_eq!(session.phase, RepoPhase::Tracking);
}

#[tokio::test]
async fn test_failed_update_cycle_is_retried_after_pull_reports_nothing_new() {
    let repo = ScriptedRepo::default();
    repo.push_pull(Ok(Some(change("aaaaaaa1", "bbbbbbb2"))));
    repo.push_pull(Ok(None));
    repo.set_diff(Ok(vec!["web/compose.yml"]));
    let fx = Fixture {
        scanner: FakeScanner::unreadable(),
        ..Fixture::new(repo, &[])
    };
    let mut session = tracking(baseline(&["web", "db"], &[]));

    tick(&fx.ports(), &mut session, opts())
        .await
        .expect_err("unreadable stacks root");
    assert!(fx.orchestrator.calls().is_empty());
    assert_eq!(fx.store.save_count(), 0);

    fx.scanner.set(&["web", "db"]);
    let outcome = tick(&fx.ports(), &mut session, opts()).await.expect("retry");

    let TickOutcome::Updated(summary) = outcome else {
        panic!("expected update, got {outcome:?}");
    };
    assert_eq!(summary.plan.kind, PlanKind::Targeted);
    assert_eq!(fx.orchestrator.calls(), vec![ComposeCall::Up(stack_dir("web"))]);
    assert_eq!(session.baseline.last_revision.as_deref(), Some("bbbbbbb2"));
    assert!(session.pending.is_none());
    // The update was announced once, when it was pulled.
    assert_eq!(fx.notifier.change_notifications().len(), 1);
}

#[tokio::test]
async fn test_unreconciled_update_spans_later_pull() {
    let repo = ScriptedRepo::default();
    repo.push_pull(Ok(Some(change("aaaaaaa1", "bbbbbbb2"))));
    repo.push_pull(Ok(Some(change("bbbbbbb2", "ccccccc3"))));
    repo.set_diff(Ok(vec!["web/compose.yml"]));
    let fx = Fixture {
        scanner: FakeScanner::unreadable(),
        ..Fixture::new(repo, &[])
    };
    let mut session = tracking(baseline(&["web"], &[]));

    tick(&fx.ports(), &mut session, opts())
        .await
        .expect_err("unreadable stacks root");
    fx.scanner.set(&["web"]);
    tick(&fx.ports(), &mut session, opts()).await.expect("retry");

    assert_eq!(
        fx.repo.diffs_requested(),
        vec![
            ("aaaaaaa1".to_string(), "bbbbbbb2".to_string()),
            ("aaaaaaa1".to_string(), "ccccccc3".to_string()),
        ]
    );
    assert_eq!(session.baseline.last_revision.as_deref(), Some("ccccccc3"));
}

#[tokio::test]
async fn test_pull_failure_keeps_unreconciled_update() {
    let repo = ScriptedRepo::default();
    repo.push_pull(Err("git fetch failed: connection reset".into()));
    repo.push_pull(Ok(None));
    repo.set_diff(Ok(vec!["web/compose.yml"]));
    let fx = Fixture::new(repo, &["web"]);
    let mut session = tracking(baseline(&["web"], &[]));
    session.pending = Some(change("aaaaaaa1", "bbbbbbb2"));

    tick(&fx.ports(), &mut session, opts())
        .await
        .expect_err("fetch failure");
    assert!(session.pending.is_some());

    let outcome = tick(&fx.ports(), &mut session, opts()).await.expect("next tick");

    assert!(matches!(outcome, TickOutcome::Updated(_)));
    assert_eq!(fx.orchestrator.calls(), vec![ComposeCall::Up(stack_dir("web"))]);
}

#[test]
fn test_short_revision() {
    assert_eq!(short_revision("0123456789abcdef"), "0123456");
    assert_eq!(short_revision("abc"), "abc");
}
