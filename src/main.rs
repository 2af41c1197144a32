//! site-audit main entry point
//!
//! This is the command-line interface for the site-audit crawler.

use anyhow::{bail, Context};
use clap::Parser;
use site_audit::config::{load_config_with_hash, validate_seed_url, Config};
use site_audit::crawler::{CrawlEvent, CrawlRegistry, CrawlSummary};
use site_audit::issues::evaluate_issues;
use site_audit::state::CrawlPhase;
use site_audit::storage::{open_storage, SqliteStorage, Storage};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use url::Url;

/// site-audit: a polite website crawler and SEO issue detector
///
/// Crawls one site from a seed URL while respecting robots.txt, stores a
/// record for every processed URL and reports SEO issues once the crawl
/// completes.
#[derive(Parser, Debug)]
#[command(name = "site-audit")]
#[command(version)]
#[command(about = "A polite website crawler and SEO issue detector", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// URL the crawl starts from
    #[arg(value_name = "SEED_URL")]
    seed: String,

    /// Project the crawl is stored under
    #[arg(long, default_value_t = 1)]
    project: i64,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and seed and show the effective settings without crawling
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    let seed = validate_seed_url(&cli.seed).context("Invalid seed URL")?;

    if cli.dry_run {
        handle_dry_run(&config, &seed);
        return Ok(());
    }

    handle_crawl(&config, &config_hash, seed, cli.project).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("site_audit=info,warn"),
            1 => EnvFilter::new("site_audit=debug,info"),
            2 => EnvFilter::new("site_audit=trace,debug"),
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
fn handle_dry_run(config: &Config, seed: &Url) {
    let crawler = &config.crawler;

    println!("=== site-audit Dry Run ===\n");
    println!("Seed: {}", seed);

    println!("\nCrawler:");
    println!("  Crawl limit: {}", crawler.crawl_limit);
    println!("  Workers: {}", crawler.workers);
    println!("  Max politeness delay: {}ms", crawler.max_delay_ms);
    println!("  Ignore robots.txt: {}", crawler.ignore_robots_txt);
    println!("  Follow nofollow: {}", crawler.follow_nofollow);
    println!("  Include noindex: {}", crawler.include_noindex);
    println!("  Crawl sitemap: {}", crawler.crawl_sitemap);
    println!("  Allow subdomains: {}", crawler.allow_subdomains);
    println!("  Check external links: {}", crawler.check_external_links);

    println!("\nHTTP:");
    println!("  User agent: {}", config.http.user_agent);
    println!("  Timeout: {}s", config.http.timeout_secs);
    println!("  Max redirects: {}", config.http.max_redirects);
    println!(
        "  Basic auth: {}",
        if config.http.basic_auth.is_some() {
            "yes"
        } else {
            "no"
        }
    );

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);

    println!("\n✓ Configuration is valid");
}

/// Handles the main crawl operation
///
/// Persists every event, then evaluates and stores issues if the crawl
/// completed. Ctrl-C stops the crawl; pages stored so far are kept.
async fn handle_crawl(
    config: &Config,
    config_hash: &str,
    seed: Url,
    project_id: i64,
) -> anyhow::Result<()> {
    let mut storage = open_storage(Path::new(&config.output.database_path))
        .with_context(|| format!("Failed to open {}", config.output.database_path))?;
    let crawl_id = storage.create_crawl(project_id, seed.as_str(), config_hash)?;

    let registry = CrawlRegistry::new();
    let mut events = registry.start(project_id, seed, config)?;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut stop_requested = false;
    let mut outcome: Option<CrawlSummary> = None;
    let mut failure: Option<String> = None;

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                match event {
                    CrawlEvent::Response(result) => {
                        storage.insert_page(crawl_id, &result.page)?;
                    }
                    CrawlEvent::Status(status) => {
                        tracing::info!(
                            "Progress: {} crawled, {} discovered",
                            status.crawled,
                            status.discovered
                        );
                    }
                    CrawlEvent::Completed(summary) => {
                        storage.finish_crawl(crawl_id, &summary)?;
                        outcome = Some(summary);
                    }
                    CrawlEvent::Error(message) => {
                        tracing::error!("Crawl failed: {}", message);
                        let summary = CrawlSummary {
                            phase: CrawlPhase::Stopped,
                            status: registry.status(project_id).unwrap_or_default(),
                            robots_exists: false,
                            sitemap_exists: false,
                        };
                        storage.finish_crawl(crawl_id, &summary)?;
                        failure = Some(message);
                    }
                }
            }
            _ = &mut ctrl_c, if !stop_requested => {
                tracing::info!("Interrupted, stopping crawl");
                stop_requested = true;
                registry.stop(project_id);
            }
        }
    }

    if let Some(message) = failure {
        bail!("Crawl failed: {}", message);
    }

    match outcome {
        Some(summary) if summary.phase == CrawlPhase::Completed => {
            tracing::info!(
                "Crawl completed: {} crawled, {} discovered (robots.txt: {}, sitemap: {})",
                summary.status.crawled,
                summary.status.discovered,
                summary.robots_exists,
                summary.sitemap_exists
            );
            report_issues(&mut storage, crawl_id)
        }
        Some(summary) => {
            tracing::info!(
                "Crawl {} after {} URLs, skipping issue detection",
                summary.phase,
                summary.status.crawled
            );
            Ok(())
        }
        None => bail!("Crawl ended without a completion signal"),
    }
}

/// Evaluates issues over the stored pages and logs per-type counts
fn report_issues(storage: &mut SqliteStorage, crawl_id: i64) -> anyhow::Result<()> {
    let pages = storage.load_pages(crawl_id)?;
    let issues = evaluate_issues(&pages);
    let inserted = storage.insert_issues(crawl_id, &issues)?;
    tracing::info!(
        "Found {} issues on {} pages ({} new)",
        issues.len(),
        pages.len(),
        inserted
    );

    let mut counts: Vec<_> = storage.count_issues_by_type(crawl_id)?.into_iter().collect();
    counts.sort();
    for (issue_type, count) in counts {
        tracing::info!("  {}: {}", issue_type, count);
    }

    Ok(())
}
