// src/crawl/dispatcher.rs
// =============================================================================
// The dispatcher drives a crawl run.
//
// How it works:
// 1. Claim up to `concurrency` pending records from the frontier
// 2. Spawn one unit of work per record:
//    fetch -> process -> store page -> enqueue + record every discovered link
// 3. Whatever happened, release the claim (complete_claim) when the unit ends
// 4. When the frontier has nothing to hand out, wait for the in-flight units
//    (they may have discovered new work), then look again
// 5. Stop once the frontier is empty and nothing is running
//
// State machine:
//   Running  --claim returned nothing-->  Draining
//   Draining --new work appeared-------->  Running
//   Draining --frontier still empty----->  Finished
//
// Failure handling:
// - a failed fetch just ends the unit (the page never gets a fingerprint)
// - a store error ends only the unit that hit it
// - a store error on a single discovered link skips that link only
// - a panicking unit is caught so its claim is still released
// - only a failing claim_next stops the whole run; nothing can progress then
// =============================================================================

use futures::FutureExt;
use serde::Serialize;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::config::CrawlConfig;
use crate::content;
use crate::error::StoreError;
use crate::fetch::{Fetcher, HttpTransport};
use crate::frontier::{FrontierStore, PageUpdate, PendingRecord};
use crate::normalize::normalize;

/// Where a crawl run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlState {
    Running,
    Draining,
    Finished,
}

/// Totals for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CrawlSummary {
    pub claimed: usize,
    pub fetched: usize,
    pub failed: usize,
    /// Fetched pages whose body needed lossy decoding
    pub degraded: usize,
    pub links_discovered: usize,
    pub links_enqueued: usize,
}

// How a single unit of work ended
#[derive(Debug)]
enum UnitOutcome {
    Fetched {
        discovered: usize,
        enqueued: usize,
        degraded: bool,
    },
    FetchFailed,
    StoreFailed,
    Panicked,
}

impl CrawlSummary {
    fn record(&mut self, outcome: UnitOutcome) {
        match outcome {
            UnitOutcome::Fetched {
                discovered,
                enqueued,
                degraded,
            } => {
                self.fetched += 1;
                self.links_discovered += discovered;
                self.links_enqueued += enqueued;
                if degraded {
                    self.degraded += 1;
                }
            }
            UnitOutcome::FetchFailed | UnitOutcome::StoreFailed | UnitOutcome::Panicked => {
                self.failed += 1;
            }
        }
    }
}

pub struct Dispatcher<S, T> {
    store: Arc<S>,
    fetcher: Arc<Fetcher<T>>,
    config: CrawlConfig,
}

impl<S, T> Dispatcher<S, T>
where
    S: FrontierStore + 'static,
    T: HttpTransport + 'static,
{
    pub fn new(store: Arc<S>, transport: T, config: CrawlConfig) -> Self {
        let fetcher = Arc::new(Fetcher::new(transport, config.retry_policy()));
        Self {
            store,
            fetcher,
            config,
        }
    }

    // Runs the crawl until the frontier is drained
    //
    // Returns: totals for the run, or the StoreError that made claiming
    // impossible. Units already running are always waited for first.
    pub async fn run(&self) -> Result<CrawlSummary, StoreError> {
        let limit = self.config.concurrency.max(1);
        let mut in_flight = JoinSet::new();
        let mut summary = CrawlSummary::default();
        let mut state = CrawlState::Running;

        info!(concurrency = limit, "crawl started");

        while state != CrawlState::Finished {
            state = match state {
                CrawlState::Running => {
                    let room = limit - in_flight.len();
                    if room == 0 {
                        // Pool is full: wait for a slot
                        if let Some(joined) = in_flight.join_next().await {
                            summary.record(unit_result(joined));
                        }
                        CrawlState::Running
                    } else {
                        let batch = self.claim(room, &mut in_flight, &mut summary).await?;
                        if batch.is_empty() {
                            CrawlState::Draining
                        } else {
                            self.spawn_batch(batch, &mut in_flight, &mut summary);
                            CrawlState::Running
                        }
                    }
                }
                CrawlState::Draining => {
                    drain(&mut in_flight, &mut summary).await;

                    let batch = self.claim(limit, &mut in_flight, &mut summary).await?;
                    if batch.is_empty() {
                        CrawlState::Finished
                    } else {
                        self.spawn_batch(batch, &mut in_flight, &mut summary);
                        CrawlState::Running
                    }
                }
                CrawlState::Finished => CrawlState::Finished,
            };
            debug!(?state, in_flight = in_flight.len(), "dispatcher tick");
        }

        info!(
            claimed = summary.claimed,
            fetched = summary.fetched,
            failed = summary.failed,
            enqueued = summary.links_enqueued,
            "crawl finished"
        );
        Ok(summary)
    }

    // claim_next, but never abandons running units when it fails
    async fn claim(
        &self,
        limit: usize,
        in_flight: &mut JoinSet<UnitOutcome>,
        summary: &mut CrawlSummary,
    ) -> Result<Vec<PendingRecord>, StoreError> {
        match self.store.claim_next(limit).await {
            Ok(batch) => Ok(batch),
            Err(e) => {
                error!(error = %e, "claiming from the frontier failed, stopping");
                drain(in_flight, summary).await;
                Err(e)
            }
        }
    }

    fn spawn_batch(
        &self,
        batch: Vec<PendingRecord>,
        in_flight: &mut JoinSet<UnitOutcome>,
        summary: &mut CrawlSummary,
    ) {
        summary.claimed += batch.len();

        for record in batch {
            let store = Arc::clone(&self.store);
            let fetcher = Arc::clone(&self.fetcher);
            let precheck = self.config.precheck_existing;

            in_flight.spawn(async move {
                let outcome = AssertUnwindSafe(crawl_one(&*store, &*fetcher, &record, precheck))
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|_| {
                        error!(url = %record.url, "unit of work panicked");
                        UnitOutcome::Panicked
                    });

                // Always release the claim, even after a failure, so a broken
                // URL can't sit in the frontier forever
                if let Err(e) = store.complete_claim(record.id).await {
                    error!(url = %record.url, id = record.id, error = %e, "could not complete claim");
                }

                outcome
            });
        }
    }
}

async fn drain(in_flight: &mut JoinSet<UnitOutcome>, summary: &mut CrawlSummary) {
    while let Some(joined) = in_flight.join_next().await {
        summary.record(unit_result(joined));
    }
}

fn unit_result(joined: Result<UnitOutcome, tokio::task::JoinError>) -> UnitOutcome {
    joined.unwrap_or_else(|e| {
        error!(error = %e, "unit of work did not finish");
        UnitOutcome::Panicked
    })
}

// One unit of work: fetch, process, persist
async fn crawl_one<S, T>(
    store: &S,
    fetcher: &Fetcher<T>,
    record: &PendingRecord,
    precheck: bool,
) -> UnitOutcome
where
    S: FrontierStore,
    T: HttpTransport,
{
    info!(url = %record.url, id = record.id, "crawling");

    let page = match fetcher.fetch(record.url.as_url()).await {
        Ok(page) => page,
        Err(e) => {
            warn!(url = %record.url, error = %e, "fetch failed");
            return UnitOutcome::FetchFailed;
        }
    };

    // Relative links resolve against where the redirects ended up
    let base = normalize(page.final_url.as_str(), None).unwrap_or_else(|| record.url.clone());
    let result = content::process(&base, &page.body, page.content_type.as_deref());
    if result.degraded {
        warn!(url = %record.url, "body needed lossy decoding");
    }

    let update = PageUpdate::fetched(
        record.url.clone(),
        result.title.clone(),
        result.fingerprint.clone(),
    );
    if let Err(e) = store.upsert_page(update).await {
        error!(url = %record.url, error = %e, "could not store page");
        return UnitOutcome::StoreFailed;
    }

    let mut enqueued = 0;
    for link in &result.links {
        let already_known = precheck && match store.page_exists(&link.url).await {
            Ok(exists) => exists,
            Err(e) => {
                debug!(url = %link.url, error = %e, "existence pre-check failed");
                false
            }
        };

        if !already_known {
            match store.enqueue_if_unseen(&link.url).await {
                Ok(true) => enqueued += 1,
                Ok(false) => {}
                Err(e) => {
                    warn!(url = %link.url, error = %e, "could not enqueue link, skipping");
                    continue;
                }
            }
        }

        if let Err(e) = store
            .upsert_page(PageUpdate::discovered(link.url.clone(), link.is_external))
            .await
        {
            warn!(url = %link.url, error = %e, "could not record link, skipping");
        }
    }

    debug!(
        url = %record.url,
        title = %result.title,
        links = result.links.len(),
        enqueued,
        "page stored"
    );

    UnitOutcome::Fetched {
        discovered: result.links.len(),
        enqueued,
        degraded: result.degraded,
    }
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. What is a JoinSet?
//    - A collection of spawned tokio tasks
//    - join_next() waits for whichever task finishes first
//    - len() tells us how many are still running, which is how we cap
//      concurrency
//
// 2. Why Arc<S> instead of &S?
//    - tokio::spawn needs 'static futures: the task may outlive the function
//      that spawned it
//    - Arc (atomic reference counting) lets every task own a handle to the
//      same store
//
// 3. What is catch_unwind?
//    - Turns a panic inside a future into an Err value instead of killing the
//      task
//    - We need it so complete_claim still runs after a panic
//    - AssertUnwindSafe tells the compiler we accept that the state touched by
//      the panicking code may be half-updated (the store is transactional)
// -----------------------------------------------------------------------------
