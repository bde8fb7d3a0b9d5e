//! Barnacle - GitOps reconciliation loop for docker compose stacks

use barnacle::cli::Cli;
use barnacle::output::json;
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("barnacle=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let json_errors = cli.json;
    if let Err(e) = cli.run().await {
        let message = format!("{e:#}");
        match json_errors.then(|| json::format_error(&message, json::error_code(&e))) {
            Some(Ok(body)) => println!("{body}"),
            _ => eprintln!("Error: {message}"),
        }
        std::process::exit(1);
    }
}
