//! Infrastructure implementation of the `StackOrchestrator` port.
//!
//! Drives `docker compose` through a [`CommandRunner`], so every action is
//! bounded by the configured action timeout.

use std::path::Path;
use std::process::Output;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::application::ports::{CommandRunner, StackOrchestrator, TeardownTarget};
use crate::infra::command_runner::failure_detail;

const DOCKER: &str = "docker";
const UP_ARGS: &[&str] = &["compose", "up", "-d", "--remove-orphans"];
const DOWN_ARGS: &[&str] = &["compose", "down", "--remove-orphans"];

/// `docker compose` backed orchestrator.
pub struct DockerCompose<R> {
    runner: R,
    timeout: Duration,
}

impl<R: CommandRunner> DockerCompose<R> {
    #[must_use]
    pub fn new(runner: R, timeout: Duration) -> Self {
        Self { runner, timeout }
    }

    async fn compose(&self, dir: &Path, args: &[&str], action: &str) -> Result<()> {
        let output = self
            .runner
            .run_with_timeout(Some(dir), DOCKER, args, self.timeout)
            .await
            .with_context(|| format!("docker compose {action}"))?;
        log_output(&output);
        ensure_success(&output, action)
    }
}

impl<R: CommandRunner> StackOrchestrator for DockerCompose<R> {
    async fn up(&self, stack_dir: &Path) -> Result<()> {
        self.compose(stack_dir, UP_ARGS, "up").await
    }

    async fn down(&self, target: &TeardownTarget) -> Result<()> {
        match target {
            TeardownTarget::Directory(dir) => self.compose(dir, DOWN_ARGS, "down").await,
            TeardownTarget::Project(name) => {
                let args = [
                    "compose",
                    "-p",
                    name.as_str(),
                    "down",
                    "--remove-orphans",
                ];
                self.compose(Path::new("/"), &args, "down").await
            }
        }
    }
}

fn log_output(output: &Output) {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stdout.trim().is_empty() {
        tracing::debug!(stdout = %stdout.trim_end(), "docker compose output");
    }
    if !stderr.trim().is_empty() {
        tracing::debug!(stderr = %stderr.trim_end(), "docker compose output");
    }
}

fn ensure_success(output: &Output, action: &str) -> Result<()> {
    if output.status.success() {
        return Ok(());
    }
    let code = output
        .status
        .code()
        .map_or_else(|| "signal".to_string(), |c| c.to_string());
    anyhow::bail!(
        "docker compose {action} exited with {code}: {}",
        failure_detail(output)
    )
}
