//! Monsterdex Ingest - data pipeline CLI

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mdex_common::logging::{init_logging, LogConfig, LogLevel};
use mdex_ingest::{
    pick_random, HttpTransport, IngestConfig, LastPick, MonsterSource, Orchestrator, RecordMode,
};
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "mdex-ingest")]
#[command(author, version, about = "Monsterdex data ingestion tool")]
struct Cli {
    /// Pipeline stage to run
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Refresh the ID lists under data/meta
    Discover,

    /// Fetch every listed pokemon, species and form
    Fetch {
        /// Store payloads verbatim under data/raw-<kind>
        #[arg(long)]
        raw: bool,
    },

    /// Join pokemon and species into data/monster
    Build {
        /// Read data/raw-* instead of the normalized records
        #[arg(long)]
        from_raw: bool,
    },

    /// Discover, fetch and build
    All,

    /// Count records on disk
    Count {
        /// Count raw payloads instead of normalized records
        #[arg(long)]
        raw: bool,
    },

    /// Print a random monster
    Random,
}

fn mode(raw: bool) -> RecordMode {
    if raw {
        RecordMode::Raw
    } else {
        RecordMode::Normalized
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    // Environment variables take precedence over the flag
    let log_config = LogConfig::builder()
        .level(log_level)
        .log_file_prefix("mdex-ingest")
        .build()
        .merge_env()?;

    let _guard = init_logging(&log_config)?;

    let config = IngestConfig::from_env().context("Invalid ingest configuration")?;
    let transport = Arc::new(HttpTransport::new(&config)?);
    let orchestrator = Orchestrator::new(config, transport);

    match cli.command {
        Command::Discover => {
            let report = orchestrator.discover_all().await?;
            info!("Discovered: {:?}", report.counts);
        }
        Command::Fetch { raw } => {
            orchestrator.fetch_all(mode(raw)).await?;
            orchestrator.summarize(mode(raw)).await?;
        }
        Command::Build { from_raw } => {
            let source = if from_raw {
                MonsterSource::Raw
            } else {
                MonsterSource::Normalized
            };
            let report = orchestrator.build_monsters(source).await?;
            info!(
                "Built {} monsters, skipped {}",
                report.written,
                report.skipped.total()
            );
        }
        Command::All => {
            orchestrator.run_full().await?;
            orchestrator.summarize(RecordMode::Normalized).await?;
        }
        Command::Count { raw } => {
            let counts = orchestrator.summarize(mode(raw)).await?;
            println!("{}", serde_json::to_string_pretty(&counts)?);
        }
        Command::Random => {
            let monster = pick_random(orchestrator.store(), &LastPick::new()).await?;
            println!("{}", serde_json::to_string_pretty(&monster)?);
        }
    }

    info!("Done");
    Ok(())
}
