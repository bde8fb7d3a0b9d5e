//! Unit tests for the reconciliation cycle service.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::path::Path;

use barnacle::application::ports::TeardownTarget;
use barnacle::application::services::reconcile::{
    CycleOptions, CycleTrigger, load_baseline, run_cycle,
};
use barnacle::domain::{
    ActionKind, ChangeSet, CycleStatus, DeploymentState, PlanKind, RetryPolicy,
};

use crate::helpers::{
    ComposeCall, FakeScanner, MemoryStateStore, ROOT, RecordingNotifier, RecordingOrchestrator,
    baseline, inventory, name, names, stack_dir,
};

fn opts(policy: RetryPolicy) -> CycleOptions<'static> {
    CycleOptions {
        stacks_root: Path::new(ROOT),
        stacks_prefix: "",
        policy,
    }
}

fn full() -> CycleTrigger {
    CycleTrigger {
        changes: ChangeSet::Unavailable,
        initial: true,
        revision: Some("abc1234".into()),
    }
}

fn targeted(paths: &[&str]) -> CycleTrigger {
    CycleTrigger {
        changes: ChangeSet::Paths(paths.iter().map(ToString::to_string).collect()),
        initial: false,
        revision: Some("def5678".into()),
    }
}

#[tokio::test]
async fn test_full_cycle_one_failure_does_not_stop_the_batch() {
    let orchestrator = RecordingOrchestrator::failing(&["db"]);
    let scanner = FakeScanner::with(&["web", "db", "api"]);
    let store = MemoryStateStore::default();
    let notifier = RecordingNotifier::default();
    let mut state = DeploymentState::default();

    let summary = run_cycle(
        &orchestrator,
        &scanner,
        &store,
        &notifier,
        &mut state,
        opts(RetryPolicy::RetryFailed),
        full(),
    )
    .await
    .expect("cycle");

    assert_eq!(summary.plan.kind, PlanKind::Full);
    assert_eq!(
        orchestrator.calls(),
        vec![
            ComposeCall::Up(stack_dir("api")),
            ComposeCall::Up(stack_dir("db")),
            ComposeCall::Up(stack_dir("web")),
        ]
    );
    assert_eq!(summary.report.len(), 3);
    assert_eq!(summary.report.status(), CycleStatus::Partial);
    let db = summary
        .report
        .get(ActionKind::Deploy, &name("db"))
        .expect("db outcome");
    assert!(db.error.as_deref().unwrap_or_default().contains("db is broken"));
}

#[tokio::test]
async fn test_baseline_advances_even_when_every_action_fails() {
    let orchestrator = RecordingOrchestrator::failing(&["web", "db"]);
    let scanner = FakeScanner::with(&["web", "db"]);
    let store = MemoryStateStore::default();
    let notifier = RecordingNotifier::default();
    let mut state = DeploymentState::default();

    let summary = run_cycle(
        &orchestrator,
        &scanner,
        &store,
        &notifier,
        &mut state,
        opts(RetryPolicy::RetryFailed),
        full(),
    )
    .await
    .expect("cycle");

    assert_eq!(summary.report.status(), CycleStatus::Failed);
    assert_eq!(state.deployed_stacks, inventory(&["db", "web"]));
    assert_eq!(state.failed_stacks, names(&["db", "web"]));
    assert_eq!(state.last_revision.as_deref(), Some("abc1234"));
    assert_eq!(store.saved(), Some(state));
}

#[tokio::test]
async fn test_unreadable_root_aborts_before_any_action_or_write() {
    let orchestrator = RecordingOrchestrator::default();
    let scanner = FakeScanner::unreadable();
    let store = MemoryStateStore::default();
    let notifier = RecordingNotifier::default();
    let mut state = baseline(&["web"], &[]);
    let before = state.clone();

    let err = run_cycle(
        &orchestrator,
        &scanner,
        &store,
        &notifier,
        &mut state,
        opts(RetryPolicy::RetryFailed),
        full(),
    )
    .await
    .expect_err("scan failure aborts");

    assert!(format!("{err:#}").contains("scanning stacks root"));
    assert!(orchestrator.calls().is_empty());
    assert_eq!(store.save_count(), 0);
    assert_eq!(state, before);
    assert!(notifier.cycle_notifications().is_empty());
}

#[tokio::test]
async fn test_state_save_failure_still_returns_report() {
    let orchestrator = RecordingOrchestrator::default();
    let scanner = FakeScanner::with(&["web"]);
    let store = MemoryStateStore {
        fail_save: true,
        ..MemoryStateStore::default()
    };
    let notifier = RecordingNotifier::default();
    let mut state = DeploymentState::default();

    let summary = run_cycle(
        &orchestrator,
        &scanner,
        &store,
        &notifier,
        &mut state,
        opts(RetryPolicy::RetryFailed),
        full(),
    )
    .await
    .expect("save failure is not fatal");

    assert_eq!(summary.report.status(), CycleStatus::Succeeded);
    assert_eq!(store.save_count(), 1);
    assert_eq!(state.deployed_stacks, inventory(&["web"]));
}

#[tokio::test]
async fn test_notification_failure_does_not_fail_cycle() {
    let orchestrator = RecordingOrchestrator::default();
    let scanner = FakeScanner::with(&["web"]);
    let store = MemoryStateStore::default();
    let notifier = RecordingNotifier::failing();
    let mut state = DeploymentState::default();

    run_cycle(
        &orchestrator,
        &scanner,
        &store,
        &notifier,
        &mut state,
        opts(RetryPolicy::RetryFailed),
        full(),
    )
    .await
    .expect("notification failure is not fatal");

    assert_eq!(notifier.cycle_notifications().len(), 1);
}

#[tokio::test]
async fn test_deleted_stack_without_directory_is_torn_down_by_project() {
    let orchestrator = RecordingOrchestrator::default();
    let scanner = FakeScanner::with(&["web"]);
    let store = MemoryStateStore::default();
    let notifier = RecordingNotifier::default();
    let mut state = baseline(&["web", "old"], &[]);

    let summary = run_cycle(
        &orchestrator,
        &scanner,
        &store,
        &notifier,
        &mut state,
        opts(RetryPolicy::RetryFailed),
        targeted(&["old/compose.yml"]),
    )
    .await
    .expect("cycle");

    assert_eq!(
        orchestrator.calls(),
        vec![ComposeCall::Down(TeardownTarget::Project(name("old")))]
    );
    assert!(
        summary
            .report
            .get(ActionKind::Remove, &name("old"))
            .expect("remove outcome")
            .is_success()
    );
    assert_eq!(state.deployed_stacks, inventory(&["web"]));
}

#[tokio::test]
async fn test_targeted_cycle_deploys_only_affected_and_new_stacks() {
    let orchestrator = RecordingOrchestrator::default();
    let scanner = FakeScanner::with(&["web", "db", "cache"]);
    let store = MemoryStateStore::default();
    let notifier = RecordingNotifier::default();
    let mut state = baseline(&["web", "db"], &[]);

    let summary = run_cycle(
        &orchestrator,
        &scanner,
        &store,
        &notifier,
        &mut state,
        opts(RetryPolicy::RetryFailed),
        targeted(&["web/compose.yml", "README.md"]),
    )
    .await
    .expect("cycle");

    assert_eq!(summary.plan.kind, PlanKind::Targeted);
    assert_eq!(summary.plan.to_deploy, names(&["cache", "web"]));
    assert_eq!(summary.plan.new_stacks, names(&["cache"]));
}

#[tokio::test]
async fn test_retry_failed_redeploys_on_unrelated_update() {
    let orchestrator = RecordingOrchestrator::default();
    let scanner = FakeScanner::with(&["web", "db"]);
    let store = MemoryStateStore::default();
    let notifier = RecordingNotifier::default();
    let mut state = baseline(&["web", "db"], &["db"]);

    let summary = run_cycle(
        &orchestrator,
        &scanner,
        &store,
        &notifier,
        &mut state,
        opts(RetryPolicy::RetryFailed),
        targeted(&["README.md"]),
    )
    .await
    .expect("cycle");

    assert_eq!(summary.plan.retried, names(&["db"]));
    assert_eq!(orchestrator.calls(), vec![ComposeCall::Up(stack_dir("db"))]);
    assert!(state.failed_stacks.is_empty());
}

#[tokio::test]
async fn test_on_change_only_leaves_failed_stack_alone() {
    let orchestrator = RecordingOrchestrator::default();
    let scanner = FakeScanner::with(&["web", "db"]);
    let store = MemoryStateStore::default();
    let notifier = RecordingNotifier::default();
    let mut state = baseline(&["web", "db"], &["db"]);

    let summary = run_cycle(
        &orchestrator,
        &scanner,
        &store,
        &notifier,
        &mut state,
        opts(RetryPolicy::OnChangeOnly),
        targeted(&["README.md"]),
    )
    .await
    .expect("cycle");

    assert!(summary.plan.is_empty());
    assert!(orchestrator.calls().is_empty());
    assert_eq!(state.failed_stacks, names(&["db"]));
}

#[tokio::test]
async fn test_idle_cycle_sends_no_outcome_notification() {
    let orchestrator = RecordingOrchestrator::default();
    let scanner = FakeScanner::with(&["web"]);
    let store = MemoryStateStore::default();
    let notifier = RecordingNotifier::default();
    let mut state = baseline(&["web"], &[]);

    let summary = run_cycle(
        &orchestrator,
        &scanner,
        &store,
        &notifier,
        &mut state,
        opts(RetryPolicy::RetryFailed),
        targeted(&["README.md"]),
    )
    .await
    .expect("cycle");

    assert!(summary.report.is_empty());
    assert!(notifier.cycle_notifications().is_empty());
    assert_eq!(store.save_count(), 1);
}

#[tokio::test]
async fn test_load_baseline_corrupt_state_starts_empty() {
    let store = MemoryStateStore {
        fail_load: true,
        ..MemoryStateStore::default()
    };

    assert_eq!(load_baseline(&store).await, DeploymentState::default());
}

#[tokio::test]
async fn test_load_baseline_returns_persisted_state() {
    let store = MemoryStateStore::with(baseline(&["web"], &["web"]));

    let state = load_baseline(&store).await;

    assert_eq!(state.deployed_stacks, inventory(&["web"]));
    assert_eq!(state.failed_stacks, names(&["web"]));
}

#[tokio::test]
async fn test_nested_stacks_root_maps_repository_paths_to_stacks() {
    let orchestrator = RecordingOrchestrator::default();
    let scanner = FakeScanner::with(&["web", "db"]);
    let store = MemoryStateStore::default();
    let notifier = RecordingNotifier::default();
    let mut state = baseline(&["web", "db"], &[]);
    let nested = CycleOptions {
        stacks_prefix: "stacks",
        ..opts(RetryPolicy::RetryFailed)
    };

    let summary = run_cycle(
        &orchestrator,
        &scanner,
        &store,
        &notifier,
        &mut state,
        nested,
        targeted(&["stacks/web/compose.yml", "README.md", "db/compose.yml"]),
    )
    .await
    .expect("cycle");

    assert_eq!(summary.plan.kind, PlanKind::Targeted);
    assert_eq!(summary.plan.to_deploy, names(&["web"]));
    assert_eq!(orchestrator.calls(), vec![ComposeCall::Up(stack_dir("web"))]);
}
