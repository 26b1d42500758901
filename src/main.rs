//! Mural main entry point
//!
//! Command-line interface for the portal content migration pipeline.

use clap::{Parser, Subcommand};
use mural::config::load_config;
use mural::migrate::MigrationOrchestrator;
use mural::remote::{DryRunClient, HttpRemoteClient};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Mural: a portal content migration pipeline
///
/// Mural collects article URLs from a public portal, scrapes and extracts
/// their content with rate limiting and checkpointed resume, classifies
/// legal documents into a folder taxonomy, and republishes everything into
/// a remote content platform.
#[derive(Parser, Debug)]
#[command(name = "mural")]
#[command(version = "1.0.0")]
#[command(about = "A portal content migration pipeline", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Collect article URLs from the portal's paginated listing
    Collect,

    /// Fetch and extract pending articles, resuming from the checkpoint
    Scrape,

    /// Classify documents, build the remote folder taxonomy, and upload
    Migrate {
        /// Dry run: classify and plan, skip all remote writes
        #[arg(long = "test")]
        test: bool,

        /// Override the configured batch size
        #[arg(long, value_name = "N")]
        batch_size: Option<usize>,

        /// Print the classification preview before migrating
        #[arg(long)]
        analyze_first: bool,
    },

    /// Classify documents and print the folder hierarchy without uploading
    Analyze,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let mut config = match load_config(&cli.config) {
        Ok(cfg) => {
            tracing::info!("Configuration loaded successfully");
            cfg
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    // Cooperative shutdown: first interrupt stops between work items,
    // in-flight requests are allowed to finish.
    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = stop.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Interrupt received, finishing in-flight work");
                stop.store(true, Ordering::Relaxed);
            }
        });
    }

    match cli.command {
        Command::Collect => {
            let mut orchestrator = MigrationOrchestrator::new(config, stop);
            let count = orchestrator.collect().await?;
            println!("✓ Collected {} article URLs", count);
        }
        Command::Scrape => {
            let mut orchestrator = MigrationOrchestrator::new(config, stop);
            let stats = orchestrator.scrape().await?;
            tracing::info!(
                "Scrape finished: {} succeeded, {} failed",
                stats.succeeded,
                stats.failed
            );
        }
        Command::Migrate {
            test,
            batch_size,
            analyze_first,
        } => {
            if let Some(n) = batch_size {
                tracing::info!("Batch size overridden to {}", n);
                config.pipeline.batch_size = n;
            }
            let remote_config = config.remote.clone();
            let mut orchestrator = MigrationOrchestrator::new(config, stop);

            if analyze_first {
                orchestrator.analyze()?;
                println!();
            }

            if test {
                tracing::info!("Dry run: no remote writes will be performed");
                let client = DryRunClient::new();
                let stats = orchestrator.migrate(&client).await?;
                println!(
                    "✓ Dry run: would create {} folders and upload {} documents",
                    stats.folders_created, stats.uploads
                );
            } else {
                let client = HttpRemoteClient::new(&remote_config)?;
                let stats = orchestrator.migrate(&client).await?;
                tracing::info!(
                    "Migration finished: {} succeeded, {} failed",
                    stats.succeeded,
                    stats.failed
                );
            }
        }
        Command::Analyze => {
            let mut orchestrator = MigrationOrchestrator::new(config, stop);
            orchestrator.analyze()?;
        }
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("mural=info,warn"),
            1 => EnvFilter::new("mural=debug,info"),
            2 => EnvFilter::new("mural=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}
