//! Typed domain error enums.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All error types implement `thiserror::Error` and convert to `anyhow::Error`
//! via the `?` operator.

use std::path::PathBuf;

use thiserror::Error;

// ── Stack errors ──────────────────────────────────────────────────────────────

/// Errors related to stack identity.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StackError {
    #[error("Invalid stack name '{0}': must be a single non-empty path segment")]
    InvalidName(String),
}

// ── Scan errors ───────────────────────────────────────────────────────────────

/// Errors raised while listing the inventory root.
///
/// These abort the current cycle. An empty inventory is *not* an error.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Cannot read stacks root {}: {source}", path.display())]
    RootUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Stacks root {} is not a directory", .0.display())]
    NotADirectory(PathBuf),
}

// ── Repository errors ─────────────────────────────────────────────────────────

/// Errors raised by the repository source.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Deploy key not found at {}. Mount it or set DEPLOY_KEY_PATH.", .0.display())]
    DeployKeyMissing(PathBuf),

    #[error("git {operation} failed: {detail}")]
    Git { operation: String, detail: String },
}

// ── Config errors ─────────────────────────────────────────────────────────────

/// Errors related to process configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("REPO_URL environment variable is required")]
    MissingRepoUrl,

    #[error("Cannot determine repository path. Set REPO_PATH or REPO_URL.")]
    MissingRepoPath,

    #[error("Invalid value for {key}: {value} ({reason})")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    #[error("STACKS_ROOT {} must be inside REPO_PATH {}", stacks_root.display(), repo_path.display())]
    StacksRootOutsideRepo {
        stacks_root: PathBuf,
        repo_path: PathBuf,
    },
}
