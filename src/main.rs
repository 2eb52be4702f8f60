//! Colorway main entry point
//!
//! This is the command-line interface for the Colorway storefront tracker.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use colorway::automation::webdriver::WebDriverSession;
use colorway::automation::PageSurface;
use colorway::config::Config;
use colorway::crawler::run_crawl;
use colorway::output::CsvLog;
use colorway::storage::SqliteStore;

/// Colorway: a polite storefront colorway tracker
///
/// Colorway walks one category of a rendered storefront, enumerates each
/// product's color options, reconciles prices and per-size availability from
/// several sources, and records one observation per colorway per run.
#[derive(Parser, Debug)]
#[command(name = "colorway")]
#[command(version)]
#[command(about = "A polite storefront colorway tracker", long_about = None)]
struct Cli {
    /// Category URL to crawl, or a single product URL for one-page mode.
    /// Defaults to the configured category.
    #[arg(value_name = "START_URL")]
    start_url: Option<String>,

    /// Stop after this many discovered links (absolute index cap)
    #[arg(value_name = "LIMIT")]
    limit: Option<usize>,

    /// Skip the first N discovered links (overrides START_AT)
    #[arg(value_name = "OFFSET")]
    offset: Option<usize>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate configuration and show what would be crawled without crawling
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let mut config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };
    if let Some(offset) = cli.offset {
        config.crawl.start_at = offset;
    }

    let start_url = cli
        .start_url
        .clone()
        .unwrap_or_else(|| config.crawl.base_url.clone());

    if cli.dry_run {
        handle_dry_run(&config, &start_url, cli.limit);
        return Ok(());
    }

    handle_crawl(config, &start_url, cli.limit).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("colorway=info,warn"),
            1 => EnvFilter::new("colorway=debug,info"),
            2 => EnvFilter::new("colorway=trace,debug"),
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

/// Handles the --dry-run mode: validates config and shows the crawl plan
fn handle_dry_run(config: &Config, start_url: &str, limit: Option<usize>) {
    println!("=== Colorway Dry Run ===\n");

    println!("Start URL: {}", start_url);
    match limit {
        Some(limit) => println!("Link limit: {}", limit),
        None => println!("Link limit: none"),
    }
    println!("Start offset: {}", config.crawl.start_at);

    println!("\nCrawl:");
    println!("  Category: {}", config.crawl.base_url);
    println!(
        "  Jitter window: {}..{}ms",
        config.crawl.jitter_min_ms, config.crawl.jitter_max_ms
    );
    println!("  Detail page delay: {}ms", config.crawl.pdp_delay_ms);
    println!("  Page parse timeout: {}s", config.crawl.page_timeout_secs);
    match config.crawl.max_colors {
        0 => println!("  Colour cap: none"),
        n => println!("  Colour cap: {}", n),
    }

    println!("\nSession:");
    println!("  WebDriver: {}", config.session.webdriver_url);
    println!("  User agent: {}", config.session.user_agent);
    if config.session.proxy_url.is_empty() {
        println!("  Proxy: none");
    } else {
        println!("  Proxy: {}", config.session.proxy_url);
    }

    println!("\nOutput:");
    println!("  CSV log: {}", config.output.csv_path);
    println!("  Database: {}", config.output.db_path);
    println!("  Source tag: {}", config.output.source_tag);

    println!("\n✓ Configuration is valid");
}

/// Handles the main crawl operation
async fn handle_crawl(
    config: Config,
    start_url: &str,
    limit: Option<usize>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut store = SqliteStore::new(std::path::Path::new(&config.output.db_path))?;
    let mut sink = CsvLog::open(&config.output.csv_path)?;

    tracing::info!("Starting browser session at {}", config.session.webdriver_url);
    let session = WebDriverSession::start(&config.session).await?;

    let result = run_crawl(&session, &mut store, &mut sink, &config, start_url, limit).await;

    if let Err(e) = session.close().await {
        tracing::warn!("Failed to close browser session: {}", e);
    }

    match result {
        Ok(summary) => {
            tracing::info!(
                "Crawl completed: {} rows from {} pages ({} discovered, {} duplicates, {} failed)",
                summary.rows_written,
                summary.visited,
                summary.discovered,
                summary.duplicates_skipped,
                summary.pages_failed,
            );
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}
