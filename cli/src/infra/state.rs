//! Infrastructure implementation of the `DeploymentStateStore` port.
//!
//! `JsonStateStore` provides async load/save using `tokio::task::spawn_blocking`
//! with atomic write (temp file + rename) so a crash mid-write never leaves a
//! truncated baseline behind.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::application::ports::DeploymentStateStore;
use crate::domain::DeploymentState;

/// State file manager backed by a single JSON document.
#[derive(Debug, Clone)]
pub struct JsonStateStore {
    path: PathBuf,
}

impl JsonStateStore {
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load_sync(path: &Path) -> Result<Option<DeploymentState>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading state file {}", path.display()))?;
        if content.trim().is_empty() {
            return Ok(None);
        }
        let state = serde_json::from_str(&content)
            .with_context(|| format!("parsing state file {}", path.display()))?;
        Ok(Some(state))
    }

    fn save_sync(path: &Path, state: &DeploymentState) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating directory {}", parent.display()))?;
        }
        let content = serde_json::to_string_pretty(state).context("serializing state")?;

        let temp_path = path.with_extension("json.tmp");
        std::fs::write(&temp_path, &content)
            .with_context(|| format!("writing temp file {}", temp_path.display()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&temp_path, std::fs::Permissions::from_mode(0o600))
                .with_context(|| format!("setting permissions on {}", temp_path.display()))?;
        }

        std::fs::rename(&temp_path, path)
            .with_context(|| format!("finalizing state file {}", path.display()))?;

        Ok(())
    }
}

impl DeploymentStateStore for JsonStateStore {
    async fn load_async(&self) -> Result<Option<DeploymentState>> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || Self::load_sync(&path))
            .await
            .context("state load task panicked")?
    }

    async fn save_async(&self, state: &DeploymentState) -> Result<()> {
        let path = self.path.clone();
        let state = state.clone();
        tokio::task::spawn_blocking(move || Self::save_sync(&path, &state))
            .await
            .context("state save task panicked")?
    }
}
