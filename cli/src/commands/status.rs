//! Status command: persisted baseline versus the stacks on disk.

use anyhow::{Context, Result};

use crate::app::AppContext;
use crate::application::ports::{DeploymentStateStore, StackScanner};
use crate::domain::{Inventory, StatusSnapshot};

/// Entry point for `barnacle status`.
///
/// # Errors
///
/// Returns an error if the state file exists but cannot be read or parsed.
pub async fn run(app: &AppContext) -> Result<()> {
    let baseline = app
        .state_store()
        .load_async()
        .await
        .context("loading deployment state")?;

    let current = app
        .scanner()
        .scan(&app.settings.stacks_root)
        .map(|stacks| Inventory::from_stacks(&stacks))
        .map_err(|e| e.to_string());

    let snapshot = StatusSnapshot::new(baseline.as_ref(), current.as_ref().map_err(Clone::clone));
    app.renderer().render_status(&snapshot)
}
