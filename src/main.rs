//! NRL Harvest main entry point
//!
//! This is the command-line interface for the match data crawler.

use anyhow::{bail, Context};
use clap::Parser;
use nrl_harvest::config::{load_config_with_hash, Config};
use nrl_harvest::crawler::{draw_address, run_crawl};
use nrl_harvest::output::{load_statistics, print_statistics, write_dump};
use nrl_harvest::storage::{RecordStore, RunStatus, SqliteStore};
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// NRL Harvest: an idempotent crawler for rugby league match data
///
/// Walks a competition's seasons, rounds and matches, storing team lists,
/// play-by-play and match statistics. Re-running a crawl updates what is
/// stored without duplicating it.
#[derive(Parser, Debug)]
#[command(name = "nrl-harvest")]
#[command(version)]
#[command(about = "An idempotent crawler for rugby league match data", long_about = None)]
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

    /// Crawl this season instead of the configured ones (repeatable)
    #[arg(long = "season", value_name = "YEAR", conflicts_with = "all_seasons")]
    seasons: Vec<String>,

    /// Crawl every listed season
    #[arg(long)]
    all_seasons: bool,

    /// Validate config and show what would be crawled without crawling
    #[arg(long, conflicts_with_all = ["stats", "export"])]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with_all = ["dry_run", "export"])]
    stats: bool,

    /// Rebuild the result tree from the database, write the dump and exit
    #[arg(long, conflicts_with_all = ["dry_run", "stats"])]
    export: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if !cli.seasons.is_empty() {
        config.crawler.seasons = cli.seasons.clone();
    }
    if cli.all_seasons {
        config.crawler.all_seasons = true;
    }

    if cli.dry_run {
        handle_dry_run(&config)
    } else if cli.stats {
        handle_stats(&config).await
    } else if cli.export {
        handle_export(&config).await
    } else {
        handle_crawl(&config, &config_hash).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("nrl_harvest=info,warn"),
            1 => EnvFilter::new("nrl_harvest=debug,info"),
            2 => EnvFilter::new("nrl_harvest=trace,debug"),
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

/// Handles the --dry-run mode: shows what would be crawled
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    let crawler = &config.crawler;
    let base = url::Url::parse(&crawler.base_url).context("invalid base-url")?;

    println!("=== NRL Harvest Dry Run ===\n");

    println!("Crawl:");
    println!(
        "  Competition: {} ({})",
        crawler.competition_name, crawler.competition_id
    );
    let seasons = if crawler.all_seasons {
        "all listed".to_string()
    } else if crawler.seasons.is_empty() {
        "most recent listed".to_string()
    } else {
        crawler.seasons.join(", ")
    };
    println!("  Seasons: {}", seasons);
    println!("  Draw page: {}", draw_address(&base, crawler.competition_id, 1, None));
    println!("  Max concurrent fetches: {}", crawler.max_concurrent_fetches);
    println!("  Fetch timeout: {}s", crawler.fetch_timeout_secs);

    println!("\nFetcher:");
    println!("  Mode: {:?}", config.fetcher.mode);
    println!("  Browser: {}", config.fetcher.browser_path.display());
    println!("  Render budget: {}ms", config.fetcher.render_budget_ms);

    println!("\nDatabase:");
    println!("  Path: {}", config.database.path);
    println!("  Max connections: {}", config.database.max_connections);
    println!("  Connect deadline: {}s", config.database.connect_deadline_secs);

    println!("\nOutput:");
    println!("  Dump: {}", config.output.dump_path);

    println!("\n✓ Configuration is valid");
    Ok(())
}

/// Handles the --stats mode: shows statistics from the database
async fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.database.path);

    let store = SqliteStore::open(&config.database)?;
    let stats = load_statistics(&store).await?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the --export mode: rebuilds the tree from stored rows
async fn handle_export(config: &Config) -> anyhow::Result<()> {
    let store = SqliteStore::open(&config.database)?;

    tracing::info!("Loading stored data from {}", config.database.path);
    let Some(competition) = store.load_competition(config.crawler.competition_id).await? else {
        bail!(
            "competition {} has not been crawled into {}",
            config.crawler.competition_id,
            config.database.path
        );
    };

    write_dump(&competition, Path::new(&config.output.dump_path))?;
    println!("✓ Results exported to: {}", config.output.dump_path);

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: &Config, config_hash: &str) -> anyhow::Result<()> {
    let cancel = CancellationToken::new();

    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupt received, draining crawl");
                cancel.cancel();
            }
        });
    }

    let report = run_crawl(config, config_hash, cancel).await?;

    if let Some(competition) = &report.competition {
        write_dump(competition, Path::new(&config.output.dump_path))?;
    }

    match report.status {
        RunStatus::Completed => {
            tracing::info!("Crawl completed successfully");
            Ok(())
        }
        status => bail!("crawl run {} ended {}", report.run_id, status.to_db_string()),
    }
}
