//! Infrastructure implementation of the `RepoSource` port.
//!
//! Shells out to the `git` CLI through a [`CommandRunner`]. SSH remotes are
//! authenticated with the mounted deploy key via `core.sshCommand`.

use std::path::PathBuf;
use std::process::Output;

use anyhow::{Context, Result};

use crate::application::ports::{CommandRunner, RepoSource, RepoStatus, RevisionChange};
use crate::domain::config::is_ssh_url;
use crate::domain::error::RepoError;
use crate::infra::command_runner::failure_detail;

const GIT: &str = "git";

/// Substrings git prints when the tracked branch has no commits yet.
const EMPTY_REMOTE_MARKERS: &[&str] = &[
    "cloned an empty repository",
    "remote repository is empty",
    "not found in upstream origin",
    "couldn't find remote ref",
];

/// Remote coordinates of the tracked repository.
#[derive(Debug, Clone)]
pub struct GitRemote {
    pub url: String,
    pub branch: String,
    pub deploy_key: PathBuf,
}

/// A local clone driven by the `git` CLI.
pub struct GitRepository<R> {
    runner: R,
    remote: GitRemote,
    path: PathBuf,
}

impl<R: CommandRunner> GitRepository<R> {
    #[must_use]
    pub fn new(runner: R, remote: GitRemote, path: PathBuf) -> Self {
        Self {
            runner,
            remote,
            path,
        }
    }

    /// `-c core.sshCommand=...` for SSH remotes, nothing otherwise.
    fn auth_args(&self) -> Result<Vec<String>, RepoError> {
        if !is_ssh_url(&self.remote.url) {
            return Ok(Vec::new());
        }
        if !self.remote.deploy_key.is_file() {
            return Err(RepoError::DeployKeyMissing(self.remote.deploy_key.clone()));
        }
        Ok(vec![
            "-c".to_string(),
            format!(
                "core.sshCommand=ssh -i {} -o IdentitiesOnly=yes -o StrictHostKeyChecking=accept-new",
                self.remote.deploy_key.display()
            ),
        ])
    }

    /// Run git inside the clone, with auth arguments when `network` is set.
    async fn git(&self, network: bool, args: &[&str]) -> Result<Output> {
        let auth = if network { self.auth_args()? } else { Vec::new() };
        let mut full: Vec<&str> = auth.iter().map(String::as_str).collect();
        full.extend_from_slice(args);
        self.runner
            .run_in_dir(&self.path, GIT, &full)
            .await
            .with_context(|| format!("running git {}", args.first().unwrap_or(&"")))
    }

    async fn head(&self) -> Result<Option<String>> {
        let output = self.git(false, &["rev-parse", "--verify", "HEAD"]).await?;
        if !output.status.success() {
            return Ok(None);
        }
        let revision = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Ok((!revision.is_empty()).then_some(revision))
    }

    async fn clone_remote(&self) -> Result<RepoStatus> {
        tracing::info!(url = %self.remote.url, path = %self.path.display(), "cloning repository");
        if let Some(parent) = self.path.parent() {
            tokio::task::spawn_blocking({
                let parent = parent.to_path_buf();
                move || std::fs::create_dir_all(&parent)
            })
            .await
            .context("create clone parent task panicked")?
            .with_context(|| format!("creating directory {}", parent.display()))?;
        }

        let auth = self.auth_args()?;
        let path = self.path.to_string_lossy();
        let mut args: Vec<&str> = auth.iter().map(String::as_str).collect();
        args.extend_from_slice(&[
            "clone",
            "--branch",
            self.remote.branch.as_str(),
            "--single-branch",
            self.remote.url.as_str(),
            path.as_ref(),
        ]);
        let output = self.runner.run(GIT, &args).await.context("running git clone")?;

        if is_empty_remote(&output) {
            tracing::info!("remote repository is empty, will wait for content to be pushed");
            return Ok(RepoStatus::Empty);
        }
        ensure_success(&output, "clone")?;
        tracing::info!("repository cloned successfully");

        match self.head().await? {
            Some(revision) => Ok(RepoStatus::Ready { revision }),
            None => Ok(RepoStatus::Empty),
        }
    }

    /// Fetch the tracked branch and hard-reset the working tree onto it.
    /// Returns `false` when the remote branch does not exist yet.
    async fn sync_to_remote(&self) -> Result<bool> {
        let fetch = self
            .git(true, &["fetch", "origin", self.remote.branch.as_str()])
            .await?;
        if is_empty_remote(&fetch) {
            return Ok(false);
        }
        ensure_success(&fetch, "fetch")?;

        let reset = self.git(false, &["reset", "--hard", "FETCH_HEAD"]).await?;
        ensure_success(&reset, "reset")?;
        Ok(true)
    }
}

impl<R: CommandRunner> RepoSource for GitRepository<R> {
    async fn initialize(&self) -> Result<RepoStatus> {
        if !self.path.join(".git").exists() {
            return self.clone_remote().await;
        }

        if let Some(revision) = self.head().await? {
            tracing::info!(path = %self.path.display(), "repository already exists, using existing clone");
            return Ok(RepoStatus::Ready { revision });
        }

        // A previous clone of an empty remote; see whether content arrived.
        if !self.sync_to_remote().await? {
            return Ok(RepoStatus::Empty);
        }
        match self.head().await? {
            Some(revision) => Ok(RepoStatus::Ready { revision }),
            None => Ok(RepoStatus::Empty),
        }
    }

    async fn pull(&self) -> Result<Option<RevisionChange>> {
        let before = self
            .head()
            .await?
            .context("repository has no HEAD revision")?;

        if !self.sync_to_remote().await? {
            anyhow::bail!(RepoError::Git {
                operation: "fetch".into(),
                detail: format!("remote branch {} disappeared", self.remote.branch),
            });
        }

        let after = self
            .head()
            .await?
            .context("repository has no HEAD revision after reset")?;

        if before == after {
            return Ok(None);
        }
        Ok(Some(RevisionChange {
            from: before,
            to: after,
        }))
    }

    async fn changed_paths(&self, from: &str, to: &str) -> Result<Vec<String>> {
        // `-z` keeps paths verbatim; without it git C-quotes non-ASCII names.
        let output = self
            .git(false, &["diff", "--name-only", "-z", "--no-renames", from, to])
            .await?;
        ensure_success(&output, "diff")?;
        Ok(String::from_utf8_lossy(&output.stdout)
            .split('\0')
            .filter(|p| !p.is_empty())
            .map(String::from)
            .collect())
    }
}

fn is_empty_remote(output: &Output) -> bool {
    let stderr = String::from_utf8_lossy(&output.stderr).to_lowercase();
    EMPTY_REMOTE_MARKERS.iter().any(|m| stderr.contains(m))
}

fn ensure_success(output: &Output, operation: &str) -> Result<(), RepoError> {
    if output.status.success() {
        return Ok(());
    }
    Err(RepoError::Git {
        operation: operation.to_string(),
        detail: failure_detail(output),
    })
}
