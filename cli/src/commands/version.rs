//! Version command

use anyhow::Result;

use crate::app::OutputFlags;
use crate::output::{HumanRenderer, JsonRenderer, OutputContext};

/// Run the version command.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn run(flags: &OutputFlags) -> Result<()> {
    let version = env!("CARGO_PKG_VERSION");

    if flags.json {
        JsonRenderer::render_version(version)
    } else {
        let ctx = OutputContext::new(flags.no_color, flags.quiet);
        HumanRenderer::new(&ctx).render_version(version);
        Ok(())
    }
}
