//! Port trait definitions for the Application layer.
//!
//! Ports are the interfaces (contracts) that infrastructure must fulfill.
//! This file imports only from `crate::domain`, never from `crate::infra`,
//! `crate::commands`, or `crate::output`.

use std::path::{Path, PathBuf};
use std::process::Output;
use std::time::Duration;

use anyhow::Result;

use crate::domain::{CycleReport, DeploymentState, ScanError, Stack, StackName};

// ── Value Types ───────────────────────────────────────────────────────────────

/// State of the local clone after initialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepoStatus {
    /// The clone exists and has a checked-out revision.
    Ready { revision: String },
    /// The remote has no commits on the tracked branch yet.
    Empty,
}

/// HEAD moved from one revision to another during a pull.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevisionChange {
    pub from: String,
    pub to: String,
}

/// What a teardown addresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TeardownTarget {
    /// The stack directory still holds a manifest; run compose inside it.
    Directory(PathBuf),
    /// The directory or its manifest is gone; address the compose project
    /// by name.
    Project(StackName),
}

// ── Repository Port ───────────────────────────────────────────────────────────

/// Version-control operations on the tracked repository.
#[allow(async_fn_in_trait)]
pub trait RepoSource {
    /// Open the existing clone or clone the remote.
    async fn initialize(&self) -> Result<RepoStatus>;
    /// Fetch and hard-reset to the remote branch. `None` when HEAD did not move.
    async fn pull(&self) -> Result<Option<RevisionChange>>;
    /// Repository-relative paths that differ between two revisions.
    async fn changed_paths(&self, from: &str, to: &str) -> Result<Vec<String>>;
}

// ── Orchestration Port ────────────────────────────────────────────────────────

/// Brings a single stack up or down. Both actions are idempotent.
#[allow(async_fn_in_trait)]
pub trait StackOrchestrator {
    /// Create or update the stack's containers.
    async fn up(&self, stack_dir: &Path) -> Result<()>;
    /// Stop and remove the stack's containers.
    async fn down(&self, target: &TeardownTarget) -> Result<()>;
}

// ── Inventory Port ────────────────────────────────────────────────────────────

/// Lists candidate stacks below the inventory root.
pub trait StackScanner {
    /// Inspect every visible subdirectory of `root`.
    ///
    /// # Errors
    ///
    /// Returns `ScanError` when `root` cannot be listed. An empty directory
    /// is not an error.
    fn scan(&self, root: &Path) -> Result<Vec<Stack>, ScanError>;
    /// The manifest filename present directly inside `dir`, if any.
    fn manifest_in(&self, dir: &Path) -> Option<&'static str>;
}

// ── State Port ────────────────────────────────────────────────────────────────

/// Abstracts persistence of the deployment baseline.
#[allow(async_fn_in_trait)]
pub trait DeploymentStateStore {
    /// Load the persisted baseline, returning `None` if none exists.
    async fn load_async(&self) -> Result<Option<DeploymentState>>;
    /// Persist the given baseline.
    async fn save_async(&self, state: &DeploymentState) -> Result<()>;
}

// ── Notification Port ─────────────────────────────────────────────────────────

/// Delivers deploy events to operators. Failures are never fatal.
#[allow(async_fn_in_trait)]
pub trait Notifier {
    /// A pull brought in new commits touching these paths.
    async fn changes_detected(&self, paths: &[String]) -> Result<()>;
    /// A cycle finished with these outcomes.
    async fn cycle_completed(&self, report: &CycleReport) -> Result<()>;
}

// ── Command Runner Port ───────────────────────────────────────────────────────

/// Abstracts process execution so infrastructure can be swapped or mocked.
#[allow(async_fn_in_trait)]
pub trait CommandRunner {
    /// Run a program and capture its output.
    ///
    /// Implementations should delegate to `run_with_timeout` using the
    /// instance's configured default timeout.
    async fn run(&self, program: &str, args: &[&str]) -> Result<Output>;
    /// Run a program inside `dir` using the default timeout.
    async fn run_in_dir(&self, dir: &Path, program: &str, args: &[&str]) -> Result<Output>;
    /// Run a program with a custom timeout override.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned or exceeds `timeout`.
    /// On timeout, the child process must be killed (not left orphaned).
    async fn run_with_timeout(
        &self,
        dir: Option<&Path>,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<Output>;
}
