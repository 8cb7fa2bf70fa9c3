// src/main.rs
// =============================================================================
// This is the entry point of our CLI application.
//
// What happens here:
// 1. Set up logging (RUST_LOG, default "info")
// 2. Parse command-line arguments using clap
// 3. Dispatch to the appropriate subcommand handler
// 4. Exit with proper code (0 = success, 2 = error)
//
// Everything interesting lives in the library (src/lib.rs); this file only
// wires the SQLite frontier and the reqwest transport into a Dispatcher.
// =============================================================================

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;
use std::sync::Arc;

use cli::{Cli, Commands, CrawlArgs};
use frontier_crawler::frontier::FrontierStats;
use frontier_crawler::{seed, CrawlSummary, Dispatcher, PageRecord, ReqwestTransport, SqliteFrontier};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let exit_code = match run().await {
        Ok(()) => 0,
        Err(e) => {
            // {:#} prints the whole context chain on one line
            eprintln!("Error: {:#}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Crawl(args) => handle_crawl(args).await,
        Commands::Report { db, json, limit } => handle_report(&db, json, limit).await,
    }
}

// Handles the 'crawl' subcommand
async fn handle_crawl(args: CrawlArgs) -> Result<()> {
    let config = args.to_config();
    config.validate().context("invalid crawl settings")?;

    let mut seeds = args.seeds.clone();
    if let Some(path) = &args.seeds_file {
        seeds.extend(read_seeds_file(path)?);
    }

    let store = Arc::new(
        SqliteFrontier::open(&args.db)
            .with_context(|| format!("could not open frontier at {}", args.db.display()))?,
    );

    // A previous run that died mid-crawl may have left claims behind;
    // younger claims may belong to another crawler on the same file
    store.release_stale_claims(config.stale_claim_after).await?;
    seed(&*store, &seeds).await?;

    let transport = ReqwestTransport::new(&config.user_agent, config.request_timeout)
        .context("could not build HTTP client")?;

    let dispatcher = Dispatcher::new(Arc::clone(&store), transport, config);
    let summary = dispatcher.run().await.context("crawl aborted")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }
    Ok(())
}

// Handles the 'report' subcommand
async fn handle_report(db: &Path, json: bool, limit: usize) -> Result<()> {
    if !db.exists() {
        anyhow::bail!("no frontier database at {}", db.display());
    }
    let store = SqliteFrontier::open(db)
        .with_context(|| format!("could not open frontier at {}", db.display()))?;

    let stats = store.stats().await?;
    let pages = store.list_pages(limit).await?;

    if json {
        let report = serde_json::json!({ "stats": stats, "pages": pages });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_table(&pages);
        print_stats(&stats);
    }
    Ok(())
}

// One URL per line; blank lines and '#' comments are skipped
fn read_seeds_file(path: &Path) -> Result<Vec<String>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("could not read seeds file {}", path.display()))?;
    Ok(parse_seed_lines(&text))
}

fn parse_seed_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

fn print_summary(summary: &CrawlSummary) {
    println!();
    println!("📊 Crawl summary:");
    println!("   📥 Claimed: {}", summary.claimed);
    println!("   ✅ Fetched: {}", summary.fetched);
    println!("   ❌ Failed: {}", summary.failed);
    if summary.degraded > 0 {
        println!("   ⚠️  Degraded: {}", summary.degraded);
    }
    println!(
        "   🔗 Links: {} discovered, {} new",
        summary.links_discovered, summary.links_enqueued
    );
}

// Prints pages as a human-readable table in the terminal
fn print_table(pages: &[PageRecord]) {
    println!("{:<60} {:<10} {:<30}", "URL", "STATUS", "TITLE");
    println!("{}", "=".repeat(100));

    for page in pages {
        let status = match (&page.fingerprint, page.is_external) {
            (Some(_), _) => "fetched",
            (None, true) => "external",
            (None, false) => "unfetched",
        };
        println!(
            "{:<60} {:<10} {:<30}",
            truncate(&page.url, 57),
            status,
            truncate(page.title.as_deref().unwrap_or(""), 30)
        );
    }

    println!();
}

fn print_stats(stats: &FrontierStats) {
    println!("📊 Frontier:");
    println!("   📄 Pages known: {}", stats.pages);
    println!("   ✅ Fetched: {}", stats.fetched);
    println!("   🌐 External: {}", stats.external);
    println!("   📋 Pending: {} ({} claimed)", stats.pending, stats.claimed);
}

// Shortens long values for the table, counting characters rather than bytes
fn truncate(value: &str, max: usize) -> String {
    if value.chars().count() > max {
        let head: String = value.chars().take(max).collect();
        format!("{}...", head)
    } else {
        value.to_string()
    }
}
