use anyhow::{Context, Result, bail};
use clap::Parser;
use configuration::{Overrides, load_config};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// The main entry point for the sqlrunner application.
///
/// Everything runs on one thread: discovery, then each script in turn.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // Load environment variables from .env file, if there is one.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    tracing::info!("Starting...");
    let settings =
        load_config(cli.config.as_deref(), &cli.overrides).context("Failed to load configuration")?;

    let report = executor::run(&settings).await.context("Script run aborted")?;

    if !report.is_empty() {
        println!("{}", report.summary_table());
    }
    if !report.is_success() {
        bail!(
            "{} of {} scripts failed",
            report.failures(),
            report.len()
        );
    }

    tracing::info!("... Finished ({} scripts)", report.len());
    Ok(())
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Runs every SQL script in a directory, in order, against one PostgreSQL schema.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file (.toml, .ini, .json, or a legacy .properties file).
    /// Defaults to `config.*` in the working directory, if present.
    #[arg(long, short)]
    config: Option<PathBuf>,

    #[command(flatten)]
    overrides: Overrides,
}
