//! Atelier-Rank main entry point
//!
//! Command-line interface for the creator-ranking pipeline. Each stage is a
//! discrete subcommand that is idempotent and safely re-runnable; `run`
//! sequences all of them.

use atelier_rank::config::load_config_with_hash;
use atelier_rank::pipeline::{Pipeline, PipelineStats, Stage};
use atelier_rank::storage::{SqliteStore, StageReport};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Atelier-Rank: a polite creator-ranking pipeline
///
/// Discovers creators on an indie game storefront, backfills their full
/// publication history, enriches games with rating metadata, and maintains
/// a Bayesian ranking of creators.
#[derive(Parser, Debug)]
#[command(name = "atelier-rank")]
#[command(version = "1.0.0")]
#[command(about = "A polite creator-ranking pipeline", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(short, long, value_name = "CONFIG", default_value = "config.toml")]
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
    /// Initialize the database schema and exit
    InitDb,

    /// Run discovery: seeds, release feeds, browse pages
    Discover,

    /// Backfill publication histories for unfinished creators
    Backfill,

    /// Enrich due items with rating metadata
    Enrich,

    /// Recompute all creator scores
    Rescore,

    /// Run the full pipeline: discover, backfill, enrich, rescore
    Run,

    /// Show store counts and the current ranking
    Stats {
        /// How many ranked creators to show
        #[arg(long, default_value_t = 25)]
        top: u32,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => (cfg, hash),
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if let Command::InitDb = cli.command {
        let path = std::path::Path::new(&config.storage.database_path);
        SqliteStore::new(path)?;
        println!("Database initialized at {}", config.storage.database_path);
        return Ok(());
    }

    let pipeline = Pipeline::new(config, config_hash)?;

    // Ctrl-C stops workers from picking up new work; in-progress entities
    // are left in their last consistent state.
    let cancel = pipeline.cancel_sender();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, cancelling run");
            let _ = cancel.send(true);
        }
    });

    match cli.command {
        Command::InitDb => unreachable!("handled above"),
        Command::Discover => {
            let report = pipeline.run_stage(Stage::Discover).await?;
            print_report("Discover", &report);
        }
        Command::Backfill => {
            let report = pipeline.run_stage(Stage::Backfill).await?;
            print_report("Backfill", &report);
        }
        Command::Enrich => {
            let report = pipeline.run_stage(Stage::Enrich).await?;
            print_report("Enrich", &report);
        }
        Command::Rescore => {
            let report = pipeline.run_stage(Stage::Rescore).await?;
            print_report("Rescore", &report);
        }
        Command::Run => {
            let reports = pipeline.run_all().await?;
            println!("Pipeline complete:");
            for (stage, report) in reports {
                print_report(stage.as_str(), &report);
            }
        }
        Command::Stats { top } => {
            let stats = pipeline.stats(top)?;
            print_stats(&stats);
        }
    }

    Ok(())
}

/// Sets up the tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("atelier_rank=info,warn"),
            1 => EnvFilter::new("atelier_rank=debug,info"),
            2 => EnvFilter::new("atelier_rank=trace,debug"),
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

fn print_report(stage: &str, report: &StageReport) {
    println!(
        "  {}: processed {}, succeeded {}, failed {}",
        stage, report.processed, report.succeeded, report.failed
    );
}

fn print_stats(stats: &PipelineStats) {
    println!("Creators: {}", stats.parents);
    println!("  not started: {}", stats.parents_not_started);
    println!("  in progress: {}", stats.parents_in_progress);
    println!("  complete:    {}", stats.parents_complete);
    println!("Items: {}", stats.items);
    println!("  unvisited:      {}", stats.items_unvisited);
    println!("  settled:        {}", stats.items_settled);
    println!("  ratings hidden: {}", stats.items_hidden);

    if stats.ranking.is_empty() {
        println!("\nNo ranked creators yet (run enrich + rescore first)");
        return;
    }

    println!("\nTop creators:");
    for (i, ranked) in stats.ranking.iter().enumerate() {
        println!(
            "  {:>3}. {:<24} score {:.4}  (avg {:.2} over {} ratings, {} items)",
            i + 1,
            ranked.handle,
            ranked.score.bayesian_score.unwrap_or_default(),
            ranked.score.avg_rating.unwrap_or_default(),
            ranked.score.total_ratings,
            ranked.score.item_count
        );
    }
}
