//! Command implementations

pub mod plan;
pub mod run;
pub mod status;
pub mod version;
