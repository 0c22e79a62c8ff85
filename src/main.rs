use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ridebook::cli::{self, Cli};
use ridebook::config::Config;
use ridebook::error::ClientError;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = cli::load_config(&cli)?;

    // Initialize logging
    let log_level = cli
        .log_level
        .as_ref()
        .unwrap_or(&config.logging.level)
        .clone();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level)),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::debug!("ridebook v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("{}", Config::source_note(&cli.config));

    if let Err(e) = cli::run_command(&cli, config).await {
        // Workflow failures have already been shown as notices
        if e.downcast_ref::<ClientError>().is_none() {
            eprintln!("[!!] {:#}", e);
        }
        std::process::exit(1);
    }

    Ok(())
}
