// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
// Two subcommands:
// - crawl: seed the frontier and run the dispatcher until it drains
// - report: show what the frontier database knows
//
// The crawl core itself has no CLI; this is just the bootstrap around it.
// =============================================================================

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use frontier_crawler::config::DEFAULT_USER_AGENT;
use frontier_crawler::CrawlConfig;

#[derive(Parser, Debug)]
#[command(
    name = "frontier-crawler",
    version,
    about = "Crawl the web from a set of seed URLs into a durable SQLite frontier",
    long_about = "frontier-crawler keeps its queue and crawl history in SQLite, so a run \
                  that is interrupted picks up where it left off. Logging is controlled \
                  with RUST_LOG (default: info)."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Seed the frontier and crawl until nothing is pending
    ///
    /// Example: frontier-crawler crawl https://example.com --concurrency 8
    Crawl(CrawlArgs),

    /// Print crawled pages and frontier statistics
    ///
    /// Example: frontier-crawler report --json
    Report {
        /// SQLite database holding the frontier
        #[arg(long, default_value = "crawl.sqlite")]
        db: PathBuf,

        /// Output results in JSON format instead of a table
        #[arg(long)]
        json: bool,

        /// Maximum number of pages to list
        #[arg(long, default_value_t = 50)]
        limit: usize,
    },
}

#[derive(Args, Debug)]
pub struct CrawlArgs {
    /// Seed URLs (e.g., https://example.com)
    pub seeds: Vec<String>,

    /// File with one seed URL per line (blank lines and # comments ignored)
    #[arg(long)]
    pub seeds_file: Option<PathBuf>,

    /// SQLite database holding the frontier (created if missing)
    #[arg(long, default_value = "crawl.sqlite")]
    pub db: PathBuf,

    /// Number of pages fetched at the same time
    #[arg(long, default_value_t = 5)]
    pub concurrency: usize,

    /// Attempts per URL before giving up on transient errors
    #[arg(long, default_value_t = 3)]
    pub max_attempts: u32,

    /// First retry delay in milliseconds; doubles on every retry
    #[arg(long, default_value_t = 500)]
    pub base_delay_ms: u64,

    /// Timeout for a single request, in seconds
    #[arg(long, default_value_t = 10)]
    pub timeout_secs: u64,

    /// User-Agent header sent with every request
    #[arg(long, default_value = DEFAULT_USER_AGENT)]
    pub user_agent: String,

    /// Claims older than this many seconds are presumed abandoned by a
    /// crashed run and handed out again
    #[arg(long, default_value_t = 600)]
    pub stale_claim_secs: u64,

    /// Skip the "is this page already known" lookup before enqueueing links
    #[arg(long)]
    pub no_precheck: bool,

    /// Print the run summary as JSON
    #[arg(long)]
    pub json: bool,
}

impl CrawlArgs {
    pub fn to_config(&self) -> CrawlConfig {
        CrawlConfig::default()
            .with_concurrency(self.concurrency)
            .with_retries(self.max_attempts, Duration::from_millis(self.base_delay_ms))
            .with_timeout(Duration::from_secs(self.timeout_secs))
            .with_user_agent(self.user_agent.clone())
            .with_precheck(!self.no_precheck)
            .with_stale_claim_after(Duration::from_secs(self.stale_claim_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crawl_defaults() {
        let cli = Cli::parse_from(["frontier-crawler", "crawl", "https://example.com"]);
        let Commands::Crawl(args) = cli.command else {
            panic!("expected crawl subcommand");
        };
        assert_eq!(args.seeds, vec!["https://example.com"]);

        let config = args.to_config();
        assert_eq!(config.concurrency, 5);
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.user_agent, DEFAULT_USER_AGENT);
        assert!(config.precheck_existing);
        assert_eq!(config.stale_claim_after, Duration::from_secs(600));
    }

    #[test]
    fn test_crawl_flags() {
        let cli = Cli::parse_from([
            "frontier-crawler",
            "crawl",
            "--concurrency",
            "10",
            "--base-delay-ms",
            "100",
            "--no-precheck",
            "--stale-claim-secs",
            "120",
            "--seeds-file",
            "seeds.txt",
        ]);
        let Commands::Crawl(args) = cli.command else {
            panic!("expected crawl subcommand");
        };
        assert!(args.seeds.is_empty());
        assert_eq!(args.seeds_file, Some(PathBuf::from("seeds.txt")));

        let config = args.to_config();
        assert_eq!(config.concurrency, 10);
        assert_eq!(config.base_delay, Duration::from_millis(100));
        assert!(!config.precheck_existing);
        assert_eq!(config.stale_claim_after, Duration::from_secs(120));
    }

    #[test]
    fn test_report_flags() {
        let cli = Cli::parse_from(["frontier-crawler", "report", "--json", "--limit", "5"]);
        match cli.command {
            Commands::Report { json, limit, db } => {
                assert!(json);
                assert_eq!(limit, 5);
                assert_eq!(db, PathBuf::from("crawl.sqlite"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
