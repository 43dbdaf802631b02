use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use sky_gateway::bootstrap;
use sky_gateway::cli::{load_config, run_oneshot, Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        // Default to serve when no subcommand is given.
        None | Some(Command::Serve) => {
            init_tracing();
            let config = load_config(&cli.config)?;
            bootstrap::run_server(Arc::new(config)).await
        }
        Some(Command::Run {
            message,
            language,
            fresh,
        }) => {
            init_cli_tracing();
            let config = load_config(&cli.config)?;
            run_oneshot(Arc::new(config), message, language, fresh).await
        }
        Some(Command::Version) => {
            println!("skychat {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

/// Structured logging for the server.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
}

/// Quieter default for one-shot CLI use: warnings only unless overridden.
fn init_cli_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .without_time()
        .init();
}
