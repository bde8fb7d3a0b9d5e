//! Plan command: dry run of one reconciliation cycle.
//!
//! Scans the stacks root and loads the baseline, then prints what a cycle
//! would deploy and tear down. Never touches compose or the state file.

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::application::services::reconcile::{CycleTrigger, load_baseline, preview};
use crate::domain::ChangeSet;

/// Arguments for the plan command.
#[derive(Args)]
pub struct PlanArgs {
    /// Repository-relative path that changed (repeatable). Without any, the
    /// plan covers every stack.
    #[arg(long = "changed", value_name = "PATH")]
    pub changed: Vec<String>,
}

impl PlanArgs {
    fn change_set(&self) -> ChangeSet {
        if self.changed.is_empty() {
            ChangeSet::Unavailable
        } else {
            ChangeSet::Paths(self.changed.clone())
        }
    }
}

/// Entry point for `barnacle plan`.
///
/// # Errors
///
/// Returns an error if the stacks root cannot be listed.
pub async fn run(app: &AppContext, args: &PlanArgs) -> Result<()> {
    let baseline = load_baseline(&app.state_store()).await;
    let trigger = CycleTrigger {
        changes: args.change_set(),
        initial: false,
        revision: None,
    };

    let (_inventory, plan) = preview(&app.scanner(), &baseline, app.cycle_options(), &trigger)?;
    app.renderer().render_plan(&plan)
}
