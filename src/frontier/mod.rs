// src/frontier/mod.rs
// =============================================================================
// The frontier: the durable record of what still needs crawling and of
// everything the crawler has ever seen.
//
// The FrontierStore trait is the contract the dispatcher relies on. Every
// method must be safe to call from many workers at once, and the two
// check-then-write operations (enqueue_if_unseen, claim_next) must be atomic:
// - a URL is queued by at most one caller
// - a pending record is handed to at most one caller
//
// Submodules:
// - sqlite: the SQLite implementation
// =============================================================================

mod sqlite;

pub use sqlite::{FrontierStats, SqliteFrontier};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::content::Fingerprint;
use crate::error::StoreError;
use crate::normalize::NormalizedUrl;

/// A URL waiting to be crawled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRecord {
    pub id: i64,
    pub url: NormalizedUrl,
}

/// What we know about a page. Title and fingerprint stay empty until the page
/// has actually been fetched.
#[derive(Debug, Clone, Serialize)]
pub struct PageRecord {
    pub url: String,
    pub title: Option<String>,
    pub fingerprint: Option<String>,
    pub is_external: bool,
    pub discovered_at: DateTime<Utc>,
    pub fetched_at: Option<DateTime<Utc>>,
}

/// Input to `upsert_page`. `None` fields leave the stored value alone.
#[derive(Debug, Clone)]
pub struct PageUpdate {
    pub url: NormalizedUrl,
    pub title: Option<String>,
    pub fingerprint: Option<Fingerprint>,
    pub is_external: Option<bool>,
}

impl PageUpdate {
    /// A link we just discovered but haven't fetched.
    pub fn discovered(url: NormalizedUrl, is_external: bool) -> Self {
        Self {
            url,
            title: None,
            fingerprint: None,
            is_external: Some(is_external),
        }
    }

    /// A page we fetched and processed.
    pub fn fetched(url: NormalizedUrl, title: String, fingerprint: Fingerprint) -> Self {
        Self {
            url,
            title: Some(title),
            fingerprint: Some(fingerprint),
            is_external: None,
        }
    }
}

#[async_trait]
pub trait FrontierStore: Send + Sync {
    /// Queues `url` unless it is already pending or has already been seen.
    /// Returns whether it was queued.
    async fn enqueue_if_unseen(&self, url: &NormalizedUrl) -> Result<bool, StoreError>;

    /// Hands out up to `limit` pending records. A record handed to one caller
    /// is never handed to another.
    async fn claim_next(&self, limit: usize) -> Result<Vec<PendingRecord>, StoreError>;

    /// Deletes a pending record. Unknown ids are ignored.
    async fn complete_claim(&self, id: i64) -> Result<(), StoreError>;

    async fn upsert_page(&self, page: PageUpdate) -> Result<(), StoreError>;

    /// Cheap pre-check before `enqueue_if_unseen`; not a correctness gate.
    async fn page_exists(&self, url: &NormalizedUrl) -> Result<bool, StoreError>;
}
