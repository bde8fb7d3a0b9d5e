//! JSON output helpers.
//!
//! Every `--json` code path prints one pretty-printed document to stdout;
//! logs stay on stderr.

use anyhow::{Context, Result};
use serde::Serialize;

use crate::domain::{ReconciliationPlan, StatusSnapshot};

/// Renders domain types as pretty-printed JSON on stdout.
pub struct JsonRenderer;

impl JsonRenderer {
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn render_plan(plan: &ReconciliationPlan) -> Result<()> {
        print_json(plan)
    }

    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn render_status(status: &StatusSnapshot) -> Result<()> {
        print_json(status)
    }

    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn render_version(version: &str) -> Result<()> {
        print_json(&serde_json::json!({ "version": version }))
    }
}

fn print_json(value: &impl Serialize) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("JSON serialization failed")?;
    println!("{text}");
    Ok(())
}

/// Format a JSON error object.
///
/// Output (pretty-printed):
/// ```json
/// {
///   "error": true,
///   "message": "...",
///   "code": "..."
/// }
/// ```
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn format_error(message: &str, code: &str) -> Result<String> {
    let obj = serde_json::json!({
        "error": true,
        "message": message,
        "code": code,
    });
    serde_json::to_string_pretty(&obj).context("JSON serialization failed")
}

/// Stable error code for the JSON error object.
#[must_use]
pub fn error_code(err: &anyhow::Error) -> &'static str {
    use crate::domain::{ConfigError, RepoError, ScanError};

    if err.chain().any(|e| e.is::<ConfigError>()) {
        "CONFIG"
    } else if err.chain().any(|e| e.is::<ScanError>()) {
        "SCAN"
    } else if err.chain().any(|e| e.is::<RepoError>()) {
        "REPO"
    } else {
        "ERROR"
    }
}
