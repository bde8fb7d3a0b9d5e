//! Process configuration read once at startup.
//!
//! Parsing of raw values is pure. Reading the process environment happens in
//! `RawSettings::from_env`, which hands the variables to `envy`.

use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use serde::Deserialize;

use crate::domain::error::ConfigError;
use crate::domain::plan::RetryPolicy;

// ── Defaults ─────────────────────────────────────────────────────────────────

pub const DEFAULT_BRANCH: &str = "main";
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;
pub const DEFAULT_STATE_FILE: &str = "/app/barnacle-state.json";
pub const DEFAULT_DEPLOY_KEY_PATH: &str = "/ssh/deploy_key";
pub const DEFAULT_ACTION_TIMEOUT_SECS: u64 = 600;
/// Parent directory of the clone when `REPO_PATH` is not set.
pub const DEFAULT_CLONE_PARENT: &str = "/opt";

// ── Raw environment schema ───────────────────────────────────────────────────

/// Environment variables as read by `envy` (field `repo_url` ↔ `REPO_URL`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawSettings {
    pub repo_url: Option<String>,
    pub repo_path: Option<String>,
    pub branch: Option<String>,
    pub stacks_root: Option<String>,
    pub discord_webhook: Option<String>,
    pub poll_interval_secs: Option<String>,
    pub state_file: Option<String>,
    pub deploy_key_path: Option<String>,
    pub action_timeout_secs: Option<String>,
    pub retry_failed: Option<String>,
}

impl RawSettings {
    /// Read the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is not valid unicode.
    pub fn from_env() -> Result<Self> {
        Ok(envy::from_env()?)
    }

    /// Fields set in `overrides` replace the ones in `self`.
    #[must_use]
    pub fn overridden_by(self, overrides: RawSettings) -> Self {
        Self {
            repo_url: overrides.repo_url.or(self.repo_url),
            repo_path: overrides.repo_path.or(self.repo_path),
            branch: overrides.branch.or(self.branch),
            stacks_root: overrides.stacks_root.or(self.stacks_root),
            discord_webhook: overrides.discord_webhook.or(self.discord_webhook),
            poll_interval_secs: overrides.poll_interval_secs.or(self.poll_interval_secs),
            state_file: overrides.state_file.or(self.state_file),
            deploy_key_path: overrides.deploy_key_path.or(self.deploy_key_path),
            action_timeout_secs: overrides.action_timeout_secs.or(self.action_timeout_secs),
            retry_failed: overrides.retry_failed.or(self.retry_failed),
        }
    }
}

// ── Validated settings ───────────────────────────────────────────────────────

/// Validated process-wide configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Remote to clone. Required only by `barnacle run`.
    pub repo_url: Option<String>,
    pub repo_path: PathBuf,
    pub branch: String,
    /// Directory whose subdirectories are stacks. Always inside `repo_path`.
    pub stacks_root: PathBuf,
    /// `stacks_root` relative to `repo_path`, `/`-separated. Empty when they
    /// are the same directory.
    pub stacks_prefix: String,
    pub discord_webhook: Option<String>,
    pub poll_interval: Duration,
    pub state_file: PathBuf,
    pub deploy_key_path: PathBuf,
    pub action_timeout: Duration,
    pub retry_policy: RetryPolicy,
}

impl Settings {
    /// Load settings from an explicit set of variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable has an invalid value or no repository
    /// path can be determined.
    pub fn from_vars(vars: impl IntoIterator<Item = (String, String)>) -> Result<Self> {
        let raw: RawSettings = envy::from_iter(vars)?;
        Ok(Self::from_raw(raw)?)
    }

    /// Validate raw values and apply defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` for invalid numbers/booleans, a missing
    /// repository path, or a stacks root outside the repository. A relative
    /// `STACKS_ROOT` is resolved against the repository path.
    pub fn from_raw(raw: RawSettings) -> Result<Self, ConfigError> {
        let repo_url = non_empty(raw.repo_url);
        let repo_path = match (non_empty(raw.repo_path), repo_url.as_deref()) {
            (Some(path), _) => PathBuf::from(path),
            (None, Some(url)) => Path::new(DEFAULT_CLONE_PARENT).join(extract_repo_name(url)),
            (None, None) => return Err(ConfigError::MissingRepoPath),
        };
        let stacks_root = non_empty(raw.stacks_root).map_or_else(|| repo_path.clone(), |root| repo_path.join(root));
        let stacks_prefix = stacks_prefix(&repo_path, &stacks_root)?;

        Ok(Self {
            repo_url,
            stacks_root,
            stacks_prefix,
            repo_path,
            branch: non_empty(raw.branch).unwrap_or_else(|| DEFAULT_BRANCH.to_string()),
            discord_webhook: non_empty(raw.discord_webhook),
            poll_interval: Duration::from_secs(parse_positive(
                "POLL_INTERVAL_SECS",
                raw.poll_interval_secs,
                DEFAULT_POLL_INTERVAL_SECS,
            )?),
            state_file: PathBuf::from(
                non_empty(raw.state_file).unwrap_or_else(|| DEFAULT_STATE_FILE.to_string()),
            ),
            deploy_key_path: PathBuf::from(
                non_empty(raw.deploy_key_path)
                    .unwrap_or_else(|| DEFAULT_DEPLOY_KEY_PATH.to_string()),
            ),
            action_timeout: Duration::from_secs(parse_positive(
                "ACTION_TIMEOUT_SECS",
                raw.action_timeout_secs,
                DEFAULT_ACTION_TIMEOUT_SECS,
            )?),
            retry_policy: RetryPolicy::from_flag(parse_bool("RETRY_FAILED", raw.retry_failed, true)?),
        })
    }

    /// The repository URL, required by the daemon.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingRepoUrl` when `REPO_URL` is unset.
    pub fn require_repo_url(&self) -> Result<&str, ConfigError> {
        self.repo_url.as_deref().ok_or(ConfigError::MissingRepoUrl)
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

/// Empty values count as unset.
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Location of the stacks root inside the repository, in git path form.
fn stacks_prefix(repo_path: &Path, stacks_root: &Path) -> Result<String, ConfigError> {
    let outside = || ConfigError::StacksRootOutsideRepo {
        stacks_root: stacks_root.to_path_buf(),
        repo_path: repo_path.to_path_buf(),
    };
    let relative = stacks_root.strip_prefix(repo_path).map_err(|_| outside())?;

    let mut segments = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(segment) => segments.push(segment.to_string_lossy().into_owned()),
            Component::CurDir => {}
            _ => return Err(outside()),
        }
    }
    Ok(segments.join("/"))
}

fn parse_positive(key: &str, value: Option<String>, default: u64) -> Result<u64, ConfigError> {
    let Some(value) = non_empty(value) else {
        return Ok(default);
    };
    match value.trim().parse::<u64>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value,
            reason: "expected a positive number of seconds".to_string(),
        }),
    }
}

fn parse_bool(key: &str, value: Option<String>, default: bool) -> Result<bool, ConfigError> {
    let Some(value) = non_empty(value) else {
        return Ok(default);
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value,
            reason: "expected true or false".to_string(),
        }),
    }
}

/// Derive a directory name from a repository URL.
///
/// Handles `https://host/owner/name(.git)` and scp-style
/// `git@host:owner/name(.git)`.
#[must_use]
pub fn extract_repo_name(repo_url: &str) -> String {
    let trimmed = repo_url.trim_end_matches('/');
    let trimmed = trimmed.strip_suffix(".git").unwrap_or(trimmed);
    let path = if trimmed.contains('@') && !trimmed.contains("://") {
        trimmed.rsplit(':').next().unwrap_or(trimmed)
    } else {
        trimmed
    };
    path.rsplit('/').next().unwrap_or(path).to_string()
}

/// Whether the URL uses SSH transport (and therefore the deploy key).
#[must_use]
pub fn is_ssh_url(repo_url: &str) -> bool {
    repo_url.starts_with("ssh://") || (repo_url.contains('@') && !repo_url.contains("://"))
}

// ── Unit tests ───────────────────────────────────────────────────────────────
