//! Application context: unified state passed to every command handler.
//!
//! `AppContext` owns the output context, the validated settings, and builds
//! the infrastructure adapters commands need.

use anyhow::{Context, Result};

use crate::application::services::reconcile::CycleOptions;
use crate::domain::config::RawSettings;
use crate::domain::Settings;
use crate::infra::command_runner::{DEFAULT_CMD_TIMEOUT, TokioCommandRunner};
use crate::infra::compose::DockerCompose;
use crate::infra::git::{GitRemote, GitRepository};
use crate::infra::notify::DiscordNotifier;
use crate::infra::scanner::FsStackScanner;
use crate::infra::state::JsonStateStore;
use crate::output::{HumanRenderer, JsonRenderer, OutputContext, Renderer};

/// Output rendering mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-readable terminal output (default).
    Human,
    /// Machine-readable JSON output.
    Json,
}

/// Output rendering flags.
pub struct OutputFlags {
    /// Disable ANSI color output.
    pub no_color: bool,
    /// Suppress non-error output.
    pub quiet: bool,
    /// Enable JSON output mode.
    pub json: bool,
}

/// Unified application context passed to every command handler.
pub struct AppContext {
    /// Terminal output context (colors, quiet mode).
    pub output: OutputContext,
    /// Output rendering mode (human vs JSON).
    pub mode: OutputMode,
    /// Validated process configuration.
    pub settings: Settings,
}

impl AppContext {
    /// Construct an `AppContext` from CLI flags, the environment, and any
    /// command-line overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(flags: &OutputFlags, overrides: RawSettings) -> Result<Self> {
        let raw = RawSettings::from_env()
            .context("reading configuration from the environment")?
            .overridden_by(overrides);
        let settings = Settings::from_raw(raw)?;
        Ok(Self::with_settings(flags, settings))
    }

    /// Construct an `AppContext` around already validated settings.
    #[must_use]
    pub fn with_settings(flags: &OutputFlags, settings: Settings) -> Self {
        let mode = if flags.json {
            OutputMode::Json
        } else {
            OutputMode::Human
        };
        Self {
            output: OutputContext::new(flags.no_color, flags.quiet),
            mode,
            settings,
        }
    }

    /// Returns `true` when JSON output mode is active.
    #[must_use]
    pub fn is_json(&self) -> bool {
        self.mode == OutputMode::Json
    }

    /// Returns the appropriate `Renderer` variant for the current output mode.
    #[must_use]
    pub fn renderer(&self) -> Renderer<'_> {
        match self.mode {
            OutputMode::Human => Renderer::Human(HumanRenderer::new(&self.output)),
            OutputMode::Json => Renderer::Json(JsonRenderer),
        }
    }

    #[must_use]
    pub fn cycle_options(&self) -> CycleOptions<'_> {
        CycleOptions {
            stacks_root: &self.settings.stacks_root,
            stacks_prefix: &self.settings.stacks_prefix,
            policy: self.settings.retry_policy,
        }
    }

    #[must_use]
    pub fn scanner(&self) -> FsStackScanner {
        FsStackScanner
    }

    #[must_use]
    pub fn state_store(&self) -> JsonStateStore {
        JsonStateStore::new(self.settings.state_file.clone())
    }

    #[must_use]
    pub fn orchestrator(&self) -> DockerCompose<TokioCommandRunner> {
        DockerCompose::new(
            TokioCommandRunner::new(self.settings.action_timeout),
            self.settings.action_timeout,
        )
    }

    /// # Errors
    ///
    /// Returns an error if `REPO_URL` is not configured.
    pub fn repository(&self) -> Result<GitRepository<TokioCommandRunner>> {
        let remote = GitRemote {
            url: self.settings.require_repo_url()?.to_string(),
            branch: self.settings.branch.clone(),
            deploy_key: self.settings.deploy_key_path.clone(),
        };
        Ok(GitRepository::new(
            TokioCommandRunner::new(DEFAULT_CMD_TIMEOUT),
            remote,
            self.settings.repo_path.clone(),
        ))
    }

    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn notifier(&self) -> Result<DiscordNotifier> {
        DiscordNotifier::new(self.settings.discord_webhook.clone())
    }
}
