//! Sumi-Binder main entry point
//!
//! This is the command-line interface for the Sumi-Binder article harvester.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use sumi_binder::config::{load_config_with_hash, Config};
use sumi_binder::output::print_statistics;
use sumi_binder::{Pipeline, RunMode};
use tracing_subscriber::EnvFilter;

/// Sumi-Binder: harvests a paginated article listing for offline reading
///
/// Sumi-Binder walks a site's listing pages, downloads every linked article,
/// localizes embedded images and leaves normalized HTML fragments plus a TOC
/// snapshot in one output directory, ready for an e-book writer.
#[derive(Parser, Debug)]
#[command(name = "sumi-binder")]
#[command(version = "1.0.0")]
#[command(about = "Harvests article listings into offline book content", long_about = None)]
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

    /// Reuse the TOC snapshot of an earlier run instead of crawling
    #[arg(long)]
    resume: bool,

    /// Validate config and show what would be harvested without any network access
    #[arg(long, conflicts_with = "toc_only")]
    dry_run: bool,

    /// Build and save the table of contents, then stop
    #[arg(long, conflicts_with = "dry_run")]
    toc_only: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("invalid configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    let pipeline = Pipeline::new(config)
        .context("failed to build HTTP client")?
        .with_config_hash(config_hash);

    // Ctrl-C stops retries and leaves queued entries unstarted
    let cancel = pipeline.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, cancelling run");
            cancel.cancel();
        }
    });

    let mode = if cli.resume {
        RunMode::Resume
    } else {
        RunMode::Fresh
    };

    if cli.toc_only {
        handle_toc_only(&pipeline, mode).await
    } else {
        handle_harvest(&pipeline, mode).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sumi_binder=info,warn"),
            1 => EnvFilter::new("sumi_binder=debug,info"),
            2 => EnvFilter::new("sumi_binder=trace,debug"),
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

/// Handles the --dry-run mode: shows the parsed configuration
fn handle_dry_run(config: &Config) {
    println!("=== Sumi-Binder Dry Run ===\n");

    println!("Target:");
    println!("  URL: {}", config.target.url);
    println!("  Link selector: {}", config.target.link_selector);
    match &config.target.next_page_selector {
        Some(rule) => println!("  Next-page selector: {}", rule),
        None => println!("  Next-page selector: (none, single page)"),
    }
    println!("  Max pages: {}", config.target.max_pages);

    println!("\nExtraction:");
    println!("  Content selector: {}", config.extract.content_selector);
    println!("  Remove selectors ({}):", config.extract.remove_selectors.len());
    for rule in &config.extract.remove_selectors {
        println!("    - {}", rule);
    }

    println!("\nFetch:");
    println!("  Max retries: {}", config.fetch.max_retries);
    println!(
        "  Timeouts: connect {}s, read {}s (escalation {})",
        config.fetch.connect_timeout_secs,
        config.fetch.read_timeout_secs,
        if config.fetch.escalate_read_timeout {
            "on"
        } else {
            "off"
        }
    );
    println!("  Backoff unit: {}ms", config.fetch.backoff_unit_ms);
    println!(
        "  Proxy source: {}",
        config.fetch.proxy_source.as_deref().unwrap_or("(direct)")
    );
    println!(
        "  User agents: {}",
        if config.fetch.user_agents.is_empty() {
            "built-in".to_string()
        } else {
            config.fetch.user_agents.len().to_string()
        }
    );

    println!("\nPipeline:");
    println!("  Workers: {}", config.pipeline.workers);
    println!("  Listing page attempts: {}", config.pipeline.listing_page_attempts);
    println!("  Skip existing: {}", config.pipeline.skip_existing);

    println!("\nOutput:");
    println!("  Directory: {}", config.output.directory);
    println!("  Snapshot: {}", config.output.snapshot_file);
    println!("  Report: {}", config.output.report_file);

    println!("\n✓ Configuration is valid");
}

/// Handles the --toc-only mode: builds (or reloads) the TOC and lists it
async fn handle_toc_only(pipeline: &Pipeline, mode: RunMode) -> anyhow::Result<()> {
    let toc = match mode {
        RunMode::Fresh => pipeline.build_toc().await,
        RunMode::Resume => pipeline.load_toc().await,
    }
    .context("could not build the table of contents")?;

    println!("=== Table of Contents ({} entries) ===\n", toc.len());
    for (n, entry) in toc.entries().iter().enumerate() {
        println!("{:>4}. {}  <{}>", n + 1, entry.title(), entry.source_url());
    }

    if !pipeline.ledger().is_empty() {
        println!("\n{} listing fetch failure(s):", pipeline.ledger().len());
        for record in pipeline.ledger().snapshot() {
            println!("  - {}: {}", record.url, record.reason);
        }
    }

    Ok(())
}

/// Handles the main harvest operation
async fn handle_harvest(pipeline: &Pipeline, mode: RunMode) -> anyhow::Result<()> {
    match mode {
        RunMode::Fresh => tracing::info!("Starting fresh harvest"),
        RunMode::Resume => tracing::info!("Resuming harvest from saved table of contents"),
    }

    let report = pipeline.run(mode).await.context("harvest aborted")?;
    print_statistics(&report);

    Ok(())
}
