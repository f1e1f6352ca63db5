//! Sumi-Crawl main entry point
//!
//! This is the command-line interface for the Sumi-Crawl polite downloader.

use anyhow::{bail, Context};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use sumi_crawl::config::{load_config_with_hash, validate, Config};
use sumi_crawl::crawler::{crawl_once, CrawlSettings, Crawler, ReqwestDownloader, Request};
use sumi_crawl::output::{print_report, ResultWriter};
use sumi_crawl::url::{is_crawlable, read_url_list};
use tracing_subscriber::EnvFilter;

/// Sumi-Crawl: a polite web downloader
///
/// Sumi-Crawl downloads a list of URLs while respecting robots.txt, waiting
/// between requests to the same host and bounding parallel downloads.
#[derive(Parser, Debug)]
#[command(name = "sumi-crawl")]
#[command(version)]
#[command(about = "A polite web downloader", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// File with one URL per line
    #[arg(short = 'f', long = "url-list", value_name = "FILE", required_unless_present = "url")]
    url_list: Option<PathBuf>,

    /// URL to download (repeatable)
    #[arg(short, long, value_name = "URL")]
    url: Vec<String>,

    /// Prefix of result file names
    #[arg(long)]
    prefix: Option<String>,

    /// Maximum number of parallel downloads
    #[arg(long)]
    parallel_downloads: Option<usize>,

    /// Maximum accepted document size in bytes
    #[arg(long)]
    max_content_length: Option<usize>,

    /// Maximum number of URLs read from the URL list
    #[arg(long)]
    max_urls: Option<usize>,

    /// Print the URLs before downloading them
    #[arg(long)]
    print_urls: bool,

    /// Validate config and URLs without downloading anything
    #[arg(long)]
    dry_run: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let mut config = load_configuration(cli.config.as_deref())?;
    apply_overrides(&mut config, &cli);
    validate(&config).context("invalid configuration after command-line overrides")?;

    let urls = collect_urls(&cli, &config)?;
    if urls.is_empty() {
        bail!("no URLs to download");
    }

    if cli.print_urls {
        for url in &urls {
            println!("{}", url);
        }
    }

    if cli.dry_run {
        handle_dry_run(&config, &urls);
        return Ok(());
    }

    handle_crawl(config, urls).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sumi_crawl=info,warn"),
            1 => EnvFilter::new("sumi_crawl=debug,info"),
            2 => EnvFilter::new("sumi_crawl=trace,debug"),
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

fn load_configuration(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        tracing::info!("No configuration file given, using defaults");
        return Ok(Config::default());
    };

    tracing::info!("Loading configuration from: {}", path.display());
    let (config, hash) = load_config_with_hash(path)
        .with_context(|| format!("failed to load configuration from {}", path.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);
    Ok(config)
}

fn apply_overrides(config: &mut Config, cli: &Cli) {
    if let Some(prefix) = &cli.prefix {
        config.output.prefix = prefix.clone();
    }
    if let Some(parallel) = cli.parallel_downloads {
        config.crawler.max_active_downloads = parallel;
    }
    if let Some(max_content_length) = cli.max_content_length {
        config.crawler.max_content_length = max_content_length;
    }
    if let Some(max_urls) = cli.max_urls {
        config.crawler.max_urls = max_urls;
    }
}

fn collect_urls(cli: &Cli, config: &Config) -> anyhow::Result<Vec<String>> {
    let mut urls = Vec::new();
    if let Some(path) = &cli.url_list {
        urls = read_url_list(path, config.crawler.max_urls)
            .with_context(|| format!("failed to read URL list {}", path.display()))?;
        tracing::info!("Read {} URLs from {}", urls.len(), path.display());
    }
    urls.extend(cli.url.iter().cloned());
    Ok(urls)
}

/// Handles the --dry-run mode: shows what would be downloaded
fn handle_dry_run(config: &Config, urls: &[String]) {
    println!("=== Sumi-Crawl Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Max active downloads: {}", config.crawler.max_active_downloads);
    println!("  Per-host timeout: {}ms", config.crawler.per_host_timeout);
    println!("  Max content length: {} bytes", config.crawler.max_content_length);
    println!(
        "  Accepted media types: {}",
        if config.crawler.accepted_media_types.is_empty() {
            "(all)".to_string()
        } else {
            config.crawler.accepted_media_types.join(", ")
        }
    );

    println!("\nUser Agent: {}", config.user_agent.header_value());

    println!("\nOutput:");
    println!("  Directory: {}", config.output.directory);
    println!("  Prefix: {}", config.output.prefix);

    let crawlable = urls.iter().filter(|url| is_crawlable(url)).count();
    println!("\nURLs ({}):", urls.len());
    for url in urls {
        let mark = if is_crawlable(url) { "*" } else { "x" };
        println!("  {} {}", mark, url);
    }

    println!("\n✓ Configuration is valid");
    println!(
        "✓ Would download {} URLs, {} dropped as not crawlable",
        crawlable,
        urls.len() - crawlable
    );
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, urls: Vec<String>) -> anyhow::Result<()> {
    let writer = ResultWriter::spawn(&config.output.directory, config.output.prefix.clone(), urls.len());
    let sender = writer.sender();
    let downloader = Arc::new(ReqwestDownloader::from_config(&config)?);

    let mut batch = Some(urls);
    let dispatcher = move || -> Vec<Request> {
        batch
            .take()
            .unwrap_or_default()
            .into_iter()
            .enumerate()
            .map(|(id, url)| {
                let sender = sender.clone();
                Request::new(url, id as i64 + 1, move |result| sender.send(result))
            })
            .collect()
    };

    let mut crawler = Crawler::new(
        CrawlSettings::from_config(&config),
        downloader,
        dispatcher,
        crawl_once(),
    )?;

    let report = match crawler.crawl().await {
        Ok(report) => report,
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            return Err(e.into());
        }
    };

    // The crawler owns the last result sender through its dispatcher
    drop(crawler);
    let written = writer.finish().await?;
    tracing::info!(
        "Wrote {} result files to {} ({} failed)",
        written.written,
        config.output.directory,
        written.failed
    );

    print_report(&report);
    Ok(())
}
