//! ClipShare - shared clipboard server
//!
//! This is the main entry point for the `clipshare` binary.

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use clipshare::cli::{log_directive, Cli, CliHandler};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut handler = CliHandler::new(cli.config)?;

    // Initialize logging
    let directive = log_directive(cli.verbose, Some(&handler.config().log_level))?;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| directive.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "ClipShare v{} ({}, built {})",
        clipshare::VERSION,
        env!("TARGET"),
        env!("BUILD_DATE")
    );

    handler.handle_command(cli.command).await?;

    Ok(())
}
