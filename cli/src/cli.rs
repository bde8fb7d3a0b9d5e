//! CLI argument parsing with clap derive

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};

use crate::app::{AppContext, OutputFlags};
use crate::commands;
use crate::domain::config::RawSettings;

/// GitOps reconciliation loop for docker compose stacks
#[derive(Parser)]
#[command(
    name = "barnacle",
    version,
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    #[command(flatten)]
    pub paths: PathOverrides,

    #[command(subcommand)]
    pub command: Command,
}

/// Command-line overrides for path settings normally taken from the
/// environment.
#[derive(Args, Default)]
pub struct PathOverrides {
    /// Local clone of the repository (overrides REPO_PATH)
    #[arg(long, global = true, value_name = "DIR")]
    pub repo_path: Option<PathBuf>,

    /// Directory whose subdirectories are stacks, inside the repository (overrides STACKS_ROOT)
    #[arg(long, global = true, value_name = "DIR")]
    pub stacks_root: Option<PathBuf>,

    /// Deployment state file (overrides STATE_FILE)
    #[arg(long, global = true, value_name = "FILE")]
    pub state_file: Option<PathBuf>,
}

impl PathOverrides {
    fn into_raw(self) -> RawSettings {
        let to_string = |p: PathBuf| p.to_string_lossy().into_owned();
        RawSettings {
            repo_path: self.repo_path.map(to_string),
            stacks_root: self.stacks_root.map(to_string),
            state_file: self.state_file.map(to_string),
            ..RawSettings::default()
        }
    }
}

#[derive(Subcommand)]
pub enum Command {
    /// Poll the repository and reconcile stacks until interrupted
    Run(commands::run::RunArgs),

    /// Show what a reconciliation cycle would do, without doing it
    Plan(commands::plan::PlanArgs),

    /// Show the deployed baseline and how the stacks on disk differ from it
    Status,

    /// Show version
    Version,
}

impl Cli {
    /// Execute the CLI command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration is invalid or the command fails.
    pub async fn run(self) -> Result<()> {
        let Cli {
            json,
            quiet,
            no_color,
            paths,
            command,
        } = self;
        let flags = OutputFlags {
            no_color,
            quiet,
            json,
        };

        if let Command::Version = command {
            return commands::version::run(&flags);
        }

        let app = AppContext::new(&flags, paths.into_raw())?;
        match command {
            Command::Run(args) => commands::run::run(&app, &args).await,
            Command::Plan(args) => commands::plan::run(&app, &args).await,
            Command::Status => commands::status::run(&app).await,
            Command::Version => commands::version::run(&flags),
        }
    }
}
