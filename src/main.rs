//! Catalog-Harvest main entry point
//!
//! This is the command-line interface for the Catalog-Harvest sampler.

use anyhow::Context;
use catalog_harvest::config::{load_config_with_hash, Config};
use catalog_harvest::harvester::{run_harvest, HttpFetcher};
use catalog_harvest::output::{load_statistics, print_statistics, print_summary};
use catalog_harvest::state::HarvestPhase;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Catalog-Harvest: a polite, resumable catalog sampler
///
/// Catalog-Harvest draws a random sample of record identifiers from a library
/// catalog, fetches each record page one at a time with a pause in between,
/// and keeps the records that have a title. Progress is checkpointed so an
/// interrupted run picks up where it left off.
#[derive(Parser, Debug)]
#[command(name = "catalog-harvest")]
#[command(version = "1.0.0")]
#[command(about = "A polite, resumable catalog sampler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Resume from the checkpoint if one exists (default behavior)
    #[arg(long, conflicts_with = "fresh")]
    resume: bool,

    /// Start a fresh harvest, ignoring the checkpoint
    #[arg(long, conflicts_with = "resume")]
    fresh: bool,

    /// Validate config and show the harvest plan without fetching anything
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics for the harvested records and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config)
    } else if cli.stats {
        handle_stats(&config)
    } else {
        handle_harvest(config, cli.fresh).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("catalog_harvest=info,warn"),
            1 => EnvFilter::new("catalog_harvest=debug,info"),
            2 => EnvFilter::new("catalog_harvest=trace,debug"),
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

/// Handles the --dry-run mode: validates config and shows the harvest plan
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    println!("=== Catalog-Harvest Dry Run ===\n");

    println!("Catalog:");
    println!("  URL template: {}", config.catalog.url_template);
    println!("  Not-found marker: {:?}", config.catalog.not_found_marker);
    println!(
        "  Identifier range: {} - {} ({} identifiers)",
        config.catalog.id_min,
        config.catalog.id_max,
        config.catalog.id_max - config.catalog.id_min + 1
    );

    println!("\nHarvest:");
    println!("  Target records: {}", config.harvest.target);
    println!(
        "  Candidates sampled: {}",
        config.harvest.effective_sample_size()
    );
    println!(
        "  Request timeout: {}s",
        config.harvest.request_timeout_secs
    );
    println!(
        "  Checkpoint every: {} records",
        config.harvest.checkpoint_interval
    );
    println!(
        "  Pause between requests: {}-{}ms",
        config.harvest.min_delay_ms, config.harvest.max_delay_ms
    );

    println!("\nIdentity:");
    println!("  User-Agent: {}", config.identity.user_agent);
    println!("  Accept-Language: {}", config.identity.accept_language);
    if let Some(referer) = &config.identity.referer {
        println!("  Referer: {}", referer);
    }

    println!("\nOutput:");
    println!("  Records: {}", config.output.output_path);
    println!("  Checkpoint: {}", config.output.checkpoint_path().display());

    // Building the fetcher also checks the identity headers.
    let fetcher = HttpFetcher::from_config(config)?;
    println!("\nFirst record URL: {}", fetcher.url_for(config.catalog.id_min));

    println!("\n✓ Configuration is valid");
    Ok(())
}

/// Handles the --stats mode: summarizes the output file, or the checkpoint if
/// no output has been written yet
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    let output = PathBuf::from(&config.output.output_path);
    let path = if output.exists() {
        output
    } else {
        config.output.checkpoint_path()
    };

    println!("Records: {}\n", path.display());
    let stats = load_statistics(&path)
        .with_context(|| format!("Failed to read records from {}", path.display()))?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the main harvest operation
async fn handle_harvest(config: Config, fresh: bool) -> anyhow::Result<()> {
    if fresh {
        tracing::info!("Starting fresh harvest (ignoring previous progress)");
    } else {
        tracing::info!("Starting harvest (will resume from checkpoint if present)");
    }

    let summary = match run_harvest(config, fresh).await {
        Ok(summary) => summary,
        Err(e) => {
            tracing::error!("Harvest failed: {}", e);
            return Err(e.into());
        }
    };

    print_summary(&summary);
    if summary.outcome == HarvestPhase::Interrupted {
        tracing::info!("Run again with the same configuration to resume");
    }

    Ok(())
}
