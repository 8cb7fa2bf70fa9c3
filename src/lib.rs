// src/lib.rs
// =============================================================================
// frontier-crawler: the crawl core.
//
// Modules, leaves first:
// - normalize: URL identity (the dedup key)
// - content: bytes -> title, fingerprint, links
// - fetch: HTTP GET with retry and backoff
// - frontier: durable queue + seen-set (SQLite)
// - crawl: the dispatcher that ties it all together
//
// The binary in main.rs is just one caller; anything that can build a
// FrontierStore and an HttpTransport can run a Dispatcher.
// =============================================================================

pub mod config;
pub mod content;
pub mod crawl;
pub mod error;
pub mod fetch;
pub mod frontier;
pub mod normalize;

pub use config::CrawlConfig;
pub use crawl::{seed, CrawlState, CrawlSummary, Dispatcher};
pub use error::{FetchError, StoreError};
pub use fetch::{Fetcher, HttpTransport, ReqwestTransport, RetryPolicy};
pub use frontier::{FrontierStore, PageRecord, PendingRecord, SqliteFrontier};
pub use normalize::{is_same_origin, normalize, NormalizedUrl};
