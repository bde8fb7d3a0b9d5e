//! Human-readable terminal renderer.

use owo_colors::OwoColorize as _;

use crate::domain::{PlanKind, ReconciliationPlan, StackName, StatusSnapshot};
use crate::output::OutputContext;

/// Renders domain types as human-readable terminal output using `OutputContext`.
pub struct HumanRenderer<'a> {
    ctx: &'a OutputContext,
}

impl<'a> HumanRenderer<'a> {
    /// Create a new `HumanRenderer` wrapping the given output context.
    #[must_use]
    pub fn new(ctx: &'a OutputContext) -> Self {
        Self { ctx }
    }

    /// Render the CLI version information.
    pub fn render_version(&self, version: &str) {
        if self.ctx.quiet {
            return;
        }
        println!("barnacle {version}");
    }

    /// Render a dry-run plan.
    pub fn render_plan(&self, plan: &ReconciliationPlan) {
        let kind = match plan.kind {
            PlanKind::Full => "full",
            PlanKind::Targeted => "targeted",
        };
        self.ctx.header(&format!("Plan ({kind})"));

        if plan.is_empty() {
            self.ctx.success("Nothing to do");
        } else {
            self.list("Deploy:", plan.to_deploy.iter(), |name| {
                let mut line = name.to_string();
                if plan.new_stacks.contains(name) {
                    line.push_str(&format!(" {}", "(new)".style(self.ctx.styles.dim)));
                }
                if plan.retried.contains(name) {
                    line.push_str(&format!(" {}", "(retry)".style(self.ctx.styles.dim)));
                }
                line
            });
            self.list("Remove:", plan.to_remove.iter(), ToString::to_string);
        }

        for path in &plan.rejected_paths {
            self.ctx
                .warn(&format!("Ignoring path outside the stacks root: {path}"));
        }
    }

    /// Render the persisted baseline and its drift from disk.
    pub fn render_status(&self, status: &StatusSnapshot) {
        if status.state_found {
            self.ctx.kv(
                "Revision:",
                status.last_revision.as_deref().unwrap_or("unknown"),
            );
            let updated = status
                .updated_at
                .map_or_else(|| "unknown".to_string(), |t| t.to_rfc3339());
            self.ctx.kv("Updated:", &updated);
        } else {
            self.ctx.info("No deployment state recorded yet");
        }

        println!();
        self.list("Deployed:", status.deployed.iter(), |name| {
            if status.failed.contains(name) {
                format!("{name} {}", "(last deploy failed)".style(self.ctx.styles.error))
            } else {
                name.to_string()
            }
        });

        if let Some(err) = &status.scan_error {
            self.ctx.error(&format!("Cannot list stacks: {err}"));
            return;
        }
        if status.is_in_sync() {
            self.ctx.success("Stacks on disk match the deployed baseline");
            return;
        }
        self.list("Pending deploy:", status.pending_deploy.iter(), ToString::to_string);
        self.list("Pending removal:", status.pending_remove.iter(), ToString::to_string);
        if !status.failed.is_empty() {
            self.ctx.warn(&format!(
                "{} stack(s) failed their last deploy",
                status.failed.len()
            ));
        }
    }

    fn list<'n>(
        &self,
        title: &str,
        names: impl Iterator<Item = &'n StackName>,
        label: impl Fn(&StackName) -> String,
    ) {
        let mut names = names.peekable();
        if names.peek().is_none() {
            return;
        }
        self.ctx.header(title);
        for name in names {
            self.ctx.item(&label(name));
        }
    }
}
