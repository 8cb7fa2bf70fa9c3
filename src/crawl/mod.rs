// src/crawl/mod.rs
// =============================================================================
// This module drives crawling.
//
// Features:
// - Bounded pool of concurrent workers over a shared, durable frontier
// - Every claimed URL is released exactly once, success or failure
// - Discovered links are deduplicated by normalized URL before queueing
//
// Rust concepts:
// - Async programming: workers are tokio tasks
// - Arc: the frontier store is shared by every worker
// =============================================================================

mod dispatcher;

pub use dispatcher::{CrawlState, CrawlSummary, Dispatcher};

use tracing::{info, warn};

use crate::error::StoreError;
use crate::frontier::{FrontierStore, PageUpdate};
use crate::normalize::normalize;

// Puts seed URLs into the frontier
//
// Every valid seed also gets a page record right away, so a seed whose fetch
// fails is still listed (without title or fingerprint). Invalid or
// non-http(s) seeds are logged and skipped. Seeds that the frontier has
// already seen are not queued again, so re-running with the same seed list
// resumes instead of restarting.
//
// Returns: how many seeds were newly queued
pub async fn seed<S, I>(store: &S, seeds: I) -> Result<usize, StoreError>
where
    S: FrontierStore + ?Sized,
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let mut queued = 0;
    for raw in seeds {
        let raw = raw.as_ref();
        match normalize(raw, None) {
            Some(url) => {
                if store.enqueue_if_unseen(&url).await? {
                    queued += 1;
                }
                store.upsert_page(PageUpdate::discovered(url, false)).await?;
            }
            None => warn!(seed = raw, "skipping invalid seed url"),
        }
    }
    info!(queued, "seeded frontier");
    Ok(queued)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontier::SqliteFrontier;

    #[tokio::test]
    async fn test_seed_skips_invalid_and_duplicates() {
        let store = SqliteFrontier::open_in_memory().unwrap();
        let queued = seed(
            &store,
            [
                "https://example.com",
                "HTTPS://EXAMPLE.COM/",
                "mailto:someone@example.com",
                "not a url",
                "https://www.python.org",
            ],
        )
        .await
        .unwrap();

        assert_eq!(queued, 2);
        let stats = store.stats().await.unwrap();
        assert_eq!(stats.pending, 2);
        assert_eq!(stats.pages, 2);

        let page = store
            .get_page(&normalize("https://example.com/", None).unwrap())
            .await
            .unwrap()
            .unwrap();
        assert!(!page.is_external);
        assert!(page.fingerprint.is_none());

        // Resuming with the same list queues nothing new
        let again = seed(&store, vec!["https://example.com".to_string()]).await.unwrap();
        assert_eq!(again, 0);
    }
}
