//! Domain layer: pure reconciliation logic, types, and validation.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All functions are synchronous and take data in, returning data out.

pub mod changes;
pub mod config;
pub mod error;
pub mod outcome;
pub mod plan;
pub mod stack;
pub mod state;
pub mod status;

pub use changes::{ChangeResolution, resolve_changes};
pub use config::Settings;
pub use error::{ConfigError, RepoError, ScanError, StackError};
pub use outcome::{ActionKind, CycleReport, CycleStatus, Outcome};
pub use plan::{ChangeSet, PlanKind, ReconciliationPlan, RetryPolicy, build_plan};
pub use stack::{Inventory, Stack, StackName};
pub use state::DeploymentState;
pub use status::StatusSnapshot;
