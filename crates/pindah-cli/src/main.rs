//! pindah - migration tool for IoT platform deployments.
//!
//! This is a thin wrapper over the `pindah-migrate` library: it parses
//! flags and environment variables into one configuration value, wires
//! Ctrl-C into the cancellation token, and runs the selected operation.

mod cli;
mod output;

use anyhow::Result;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.verbose, cli.json_logs);

    let config = cli.migration_config()?;
    let cancel = CancellationToken::new();

    // Ctrl-C requests a clean stop: in-flight stages finish, undispatched
    // work is skipped, already-written and already-submitted records stay.
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                output::note("interrupt received, stopping after in-flight work");
                cancel.cancel();
            }
        });
    }

    output::note(&format!(
        "{} ({} -> {})",
        config.operation, config.from_version, config.to_version
    ));

    match pindah_migrate::migrate(&config, &cancel).await {
        Ok(()) => {
            if cancel.is_cancelled() {
                output::note(&format!("{} cancelled", config.operation));
            } else {
                output::success(&format!("{} finished", config.operation));
            }
            Ok(())
        }
        Err(e) => {
            output::error(&format!("{} failed", config.operation));
            Err(e.into())
        }
    }
}

fn init_logging(verbosity: u8, json: bool) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(false))
            .init();
    }
}
