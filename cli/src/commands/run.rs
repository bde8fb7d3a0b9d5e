//! Run command: the reconciliation daemon.
//!
//! A single control loop: every poll interval it runs one daemon tick, and a
//! tick runs to completion before the next interval is awaited. Shutdown
//! signals are observed between ticks only.

use anyhow::Result;
use clap::Args;
use tokio::time::MissedTickBehavior;

use crate::app::AppContext;
use crate::application::services::daemon::{DaemonPorts, DaemonSession, tick};
use crate::application::services::reconcile::load_baseline;

/// Arguments for the run command.
#[derive(Args)]
pub struct RunArgs {
    /// Initialize and run a single cycle, then exit
    #[arg(long)]
    pub once: bool,
}

/// Entry point for `barnacle run`.
///
/// # Errors
///
/// Returns an error if `REPO_URL` is missing or the notifier cannot be built.
/// With `--once`, also returns the error of the single tick.
pub async fn run(app: &AppContext, args: &RunArgs) -> Result<()> {
    let settings = &app.settings;
    let repo = app.repository()?;
    let orchestrator = app.orchestrator();
    let scanner = app.scanner();
    let store = app.state_store();
    let notifier = app.notifier()?;

    tracing::info!(
        repo_url = settings.repo_url.as_deref().unwrap_or_default(),
        repo_path = %settings.repo_path.display(),
        branch = %settings.branch,
        stacks_root = %settings.stacks_root.display(),
        poll_interval_secs = settings.poll_interval.as_secs(),
        notifications = notifier.is_enabled(),
        "starting barnacle"
    );

    let ports = DaemonPorts {
        repo: &repo,
        orchestrator: &orchestrator,
        scanner: &scanner,
        store: &store,
        notifier: &notifier,
    };
    let opts = app.cycle_options();
    let mut session = DaemonSession::new(load_baseline(&store).await);

    if args.once {
        tick(&ports, &mut session, opts).await?;
        return Ok(());
    }

    let mut interval = tokio::time::interval(settings.poll_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            () = &mut shutdown => break,
        }
        if let Err(e) = tick(&ports, &mut session, opts).await {
            tracing::error!(error = %format!("{e:#}"), "reconciliation tick failed, retrying next interval");
        }
    }

    tracing::info!("barnacle stopped");
    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on unix (`docker stop`).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
    tracing::info!("received shutdown signal");
}
