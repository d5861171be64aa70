//! printlayers CLI
//!
//! Command-line driver for the print layer session controller.

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use printlayers::cli::commands::{self, ProcessOptions};
use printlayers::cli::{Cli, Commands};
use printlayers::ClientConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logger
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    tracing::info!("printlayers v{}", env!("CARGO_PKG_VERSION"));

    let config = ClientConfig::load(cli.config.as_deref()).context("loading configuration")?;

    match cli.command {
        Some(Commands::Process {
            input,
            layers,
            opacity,
            hide,
            out,
            composite,
            export_all,
        }) => {
            let options = ProcessOptions {
                input,
                layers,
                opacity,
                hide,
                out,
                composite,
                export_all,
            };
            commands::process(&config, &options)
                .await
                .with_context(|| format!("processing {}", options.input.display()))?;
        }
        Some(Commands::Health) => {
            if !commands::health(&config).await? {
                std::process::exit(1);
            }
        }
        None => {
            println!("printlayers v{}", env!("CARGO_PKG_VERSION"));
            println!("Use --help for available commands");
        }
    }
    Ok(())
}
