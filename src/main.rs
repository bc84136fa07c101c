//! Follownet main entry point
//!
//! This is the command-line interface for the Follownet follow-graph crawler.

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use follownet::config::{
    compute_config_hash, load_config, render_config, validate_run_id, Config, ConfigOverrides,
};
use follownet::crawler::{build_fetcher, Coordinator, CrawlSettings, CrawlSummary};
use follownet::output::{
    compute_statistics, export_users_db, print_statistics, save_statistics, USERS_DB_FILE,
};
use follownet::storage::{begin_run, open_run, run_id_for_today, RunStatus};
use follownet::NodeId;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Follownet: a resumable follow-graph crawler
///
/// Follownet walks the follow graph outward from a seed account, storing each
/// account's following or followers list under a per-run directory. Re-running
/// with the same run ID resumes without spending request quota again.
#[derive(Parser, Debug)]
#[command(name = "follownet")]
#[command(version)]
#[command(about = "A resumable follow-graph crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(short, long, value_name = "CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Directory holding one subdirectory per run (overrides data-path)
    #[arg(long, value_name = "DIR", global = true)]
    data_path: Option<PathBuf>,

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
    /// Crawl the follow graph from a seed user
    Crawl(CrawlArgs),

    /// Print the effective configuration and its hash
    Config,

    /// Compute, print and save statistics for a run
    Stats {
        /// Run to summarize
        #[arg(long)]
        run_id: String,
    },

    /// Export a run into an SQLite users database
    Export {
        /// Run to export
        #[arg(long)]
        run_id: String,
    },
}

#[derive(Args, Debug)]
struct CrawlArgs {
    /// Seed user ID (defaults to FOLLOWNET_SEED_USER_ID)
    #[arg(long)]
    user_id: Option<String>,

    /// Maximum number of hops from the seed
    #[arg(long)]
    depth: Option<u32>,

    /// Relationship to expand: following or followers
    #[arg(long)]
    edge: Option<String>,

    /// Run identifier (defaults to {seed}_{YYYYMMDD})
    #[arg(long)]
    run_id: Option<String>,

    /// Node fetches kept in flight per depth level
    #[arg(long)]
    workers: Option<u32>,

    /// Re-fetch every edge-set, overwriting stored records
    #[arg(long)]
    fresh: bool,
}

impl CrawlArgs {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            seed_user_id: self.user_id.clone(),
            edge: self.edge.clone(),
            max_depth: self.depth,
            workers: self.workers,
            data_path: None,
        }
    }
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        let mut overrides = match &self.command {
            Command::Crawl(args) => args.overrides(),
            _ => ConfigOverrides::default(),
        };
        overrides.data_path = self.data_path.clone();
        overrides
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let overrides = cli.overrides();

    if let Some(path) = &cli.config {
        tracing::info!("Loading configuration from: {}", path.display());
    }
    let config = load_config(cli.config.as_deref(), &overrides)
        .context("Failed to load configuration")?;

    match &cli.command {
        Command::Crawl(args) => handle_crawl(config, args).await,
        Command::Config => handle_config(&config),
        Command::Stats { run_id } => handle_stats(&config, run_id),
        Command::Export { run_id } => handle_export(&config, run_id),
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("follownet=info,warn"),
            1 => EnvFilter::new("follownet=debug,info"),
            2 => EnvFilter::new("follownet=trace,debug"),
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

/// Handles the `config` subcommand: prints the effective configuration
fn handle_config(config: &Config) -> anyhow::Result<()> {
    println!("=== Follownet Configuration ===\n");
    println!("{}", render_config(config)?);
    println!(
        "Bearer token: {}",
        if config.bearer_token().is_ok() {
            "set"
        } else {
            "not set"
        }
    );
    println!("Config hash: {}", compute_config_hash(config)?);
    Ok(())
}

/// Handles the `stats` subcommand
fn handle_stats(config: &Config, run_id: &str) -> anyhow::Result<()> {
    validate_run_id(run_id)?;
    let store = open_run(&config.output.data_path, run_id);
    if !store.run_dir().is_dir() {
        bail!("No run directory at {}", store.run_dir().display());
    }

    let stats = compute_statistics(&store)?;
    print_statistics(&stats);

    let path = save_statistics(&stats, store.run_dir())?;
    println!("\nStatistics saved to: {}", path.display());
    Ok(())
}

/// Handles the `export` subcommand
fn handle_export(config: &Config, run_id: &str) -> anyhow::Result<()> {
    validate_run_id(run_id)?;
    let store = open_run(&config.output.data_path, run_id);
    if !store.run_dir().is_dir() {
        bail!("No run directory at {}", store.run_dir().display());
    }

    let db_path = store.run_dir().join(USERS_DB_FILE);
    let summary = export_users_db(&store, &db_path)?;
    println!(
        "Exported {} users and {} edges to: {}",
        summary.users,
        summary.edges,
        db_path.display()
    );
    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, args: &CrawlArgs) -> anyhow::Result<()> {
    let seed: NodeId = config.seed_user_id()?;
    let denylist = config.denylist()?;
    let config_hash = compute_config_hash(&config)?;
    let run_id = args
        .run_id
        .clone()
        .unwrap_or_else(|| run_id_for_today(&seed));
    validate_run_id(&run_id)?;

    let store = Arc::new(open_run(&config.output.data_path, &run_id));
    let fetcher = Arc::new(build_fetcher(&config, store.clone())?);

    let mut manifest = begin_run(
        &store,
        &seed,
        config.crawler.edge,
        config.crawler.max_depth,
        &config_hash,
    )
    .with_context(|| format!("Failed to open run {}", run_id))?;

    if args.fresh {
        tracing::info!("Starting fresh crawl (stored edge-sets will be re-fetched)");
    } else {
        tracing::info!("Starting crawl (stored edge-sets are reused)");
    }
    tracing::info!(
        "Run {}: seed {}, edge {}, depth {}, {} denylisted",
        run_id,
        seed,
        config.crawler.edge,
        config.crawler.max_depth,
        denylist.len()
    );

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping after the current requests");
            interrupt.cancel();
        }
    });

    let expanded = Arc::new(AtomicU64::new(0));
    let counter = expanded.clone();
    let mut coordinator =
        Coordinator::new(fetcher.clone(), CrawlSettings::from_config(&config, !args.fresh))
            .with_denylist(move |id: &NodeId| denylist.contains(id))
            .with_cancellation(cancel)
            .with_progress(move |_report| {
                let done = counter.fetch_add(1, Ordering::Relaxed) + 1;
                if done % 10 == 0 {
                    tracing::info!("Progress: {} users expanded", done);
                }
            });

    let summary = coordinator.crawl_from(seed).await;

    let status = if summary.cancelled {
        RunStatus::Interrupted
    } else {
        RunStatus::Completed
    };
    manifest.finish(status);
    store.save_manifest(&manifest)?;

    print_summary(&run_id, &summary, fetcher.requests_made());
    tracing::info!("Run {} {}", run_id, status.as_str());
    Ok(())
}

fn print_summary(run_id: &str, summary: &CrawlSummary, requests: u64) {
    println!("\n=== Crawl Summary: {} ===\n", run_id);
    println!("  Users crawled: {}", summary.crawled_count);
    println!("  Users expanded: {}", summary.nodes_expanded);
    println!("    fetched: {}", summary.fetched);
    println!("    cached: {}", summary.cached);
    println!("    empty: {}", summary.empty);
    println!("    failed: {}", summary.failed);
    println!("  Skipped: {}", summary.skipped);
    println!("  Depth reached: {}", summary.depth_reached);
    println!("  API requests: {}", requests);
    if summary.cancelled {
        println!("\nCrawl was interrupted; run again with --run-id {} to resume", run_id);
    }
}
