// src/frontier/sqlite.rs
// =============================================================================
// SQLite-backed frontier.
//
// Tables:
// - seen_urls: every URL ever queued. A URL lands here once and never leaves,
//   so it can never be queued (and therefore fetched) twice.
// - pending: the queue. claimed_at is set while a worker owns the row.
// - pages: crawl history, one row per URL.
//
// Concurrency:
// - one connection behind a mutex, used from tokio's blocking pool so the
//   async workers never block on SQLite
// - check-then-write operations run inside BEGIN IMMEDIATE transactions, so
//   they stay atomic even if another process opens the same file
// =============================================================================

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use serde::Serialize;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{FrontierStore, PageRecord, PageUpdate, PendingRecord};
use crate::error::StoreError;
use crate::normalize::{normalize, NormalizedUrl};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS seen_urls (
        url           TEXT PRIMARY KEY,
        first_seen_at TEXT NOT NULL
    );

    -- AUTOINCREMENT: ids are never reused, so a late complete_claim can't
    -- delete somebody else's record
    CREATE TABLE IF NOT EXISTS pending (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        url         TEXT NOT NULL UNIQUE,
        enqueued_at TEXT NOT NULL,
        claimed_at  TEXT
    );
    CREATE INDEX IF NOT EXISTS idx_pending_claimed ON pending(claimed_at, id);

    CREATE TABLE IF NOT EXISTS pages (
        url           TEXT PRIMARY KEY,
        title         TEXT,
        fingerprint   TEXT,
        is_external   BOOLEAN NOT NULL DEFAULT 0,
        discovered_at TEXT NOT NULL,
        fetched_at    TEXT
    );
";

/// Counts for the report command.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FrontierStats {
    pub pending: u64,
    pub claimed: u64,
    pub pages: u64,
    pub fetched: u64,
    pub external: u64,
}

#[derive(Clone)]
pub struct SqliteFrontier {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteFrontier {
    /// Opens (or creates) the frontier database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open(path.as_ref())?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.busy_timeout(Duration::from_secs(5))?;
        info!(path = %path.as_ref().display(), "opened frontier");
        Self::with_connection(conn)
    }

    /// A throwaway frontier, mostly for tests.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    // Runs `f` against the connection on the blocking pool
    async fn run<F, R>(&self, f: F) -> Result<R, StoreError>
    where
        F: FnOnce(&mut Connection) -> Result<R, StoreError> + Send + 'static,
        R: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            // A worker that panicked mid-query leaves the mutex poisoned; the
            // connection itself is still usable (transactions roll back on drop)
            let mut guard = conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            f(&mut *guard)
        })
        .await?
    }

    /// Makes claims older than `older_than` claimable again.
    ///
    /// A claim only outlives its unit of work when the process holding it
    /// died, so call this before starting a dispatcher on an existing
    /// database. Younger claims may belong to another live process sharing
    /// the file and are left alone; `older_than` must exceed the longest a
    /// unit can take.
    pub async fn release_stale_claims(&self, older_than: Duration) -> Result<usize, StoreError> {
        // An age too large to represent releases nothing
        let cutoff = chrono::Duration::from_std(older_than)
            .ok()
            .and_then(|age| Utc::now().checked_sub_signed(age))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);

        let released = self
            .run(move |conn| {
                Ok(conn.execute(
                    "UPDATE pending SET claimed_at = NULL
                     WHERE claimed_at IS NOT NULL AND claimed_at <= ?1",
                    params![cutoff],
                )?)
            })
            .await?;
        if released > 0 {
            info!(released, "released stale claims");
        }
        Ok(released)
    }

    pub async fn get_page(&self, url: &NormalizedUrl) -> Result<Option<PageRecord>, StoreError> {
        let url = url.as_str().to_string();
        self.run(move |conn| {
            Ok(conn
                .query_row(
                    "SELECT url, title, fingerprint, is_external, discovered_at, fetched_at
                     FROM pages WHERE url = ?1",
                    params![url],
                    row_to_page,
                )
                .optional()?)
        })
        .await
    }

    /// Most recently fetched pages first, then never-fetched ones.
    pub async fn list_pages(&self, limit: usize) -> Result<Vec<PageRecord>, StoreError> {
        self.run(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT url, title, fingerprint, is_external, discovered_at, fetched_at
                 FROM pages
                 ORDER BY fetched_at IS NULL, fetched_at DESC, discovered_at
                 LIMIT ?1",
            )?;
            let pages = stmt
                .query_map(params![limit as i64], row_to_page)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(pages)
        })
        .await
    }

    pub async fn stats(&self) -> Result<FrontierStats, StoreError> {
        self.run(|conn| {
            let count = |sql: &str| -> Result<u64, rusqlite::Error> {
                conn.query_row(sql, [], |row| row.get::<_, i64>(0))
                    .map(|n| n as u64)
            };
            Ok(FrontierStats {
                pending: count("SELECT COUNT(*) FROM pending")?,
                claimed: count("SELECT COUNT(*) FROM pending WHERE claimed_at IS NOT NULL")?,
                pages: count("SELECT COUNT(*) FROM pages")?,
                fetched: count("SELECT COUNT(*) FROM pages WHERE fingerprint IS NOT NULL")?,
                external: count("SELECT COUNT(*) FROM pages WHERE is_external")?,
            })
        })
        .await
    }
}

fn row_to_page(row: &rusqlite::Row) -> rusqlite::Result<PageRecord> {
    Ok(PageRecord {
        url: row.get(0)?,
        title: row.get(1)?,
        fingerprint: row.get(2)?,
        is_external: row.get(3)?,
        discovered_at: row.get(4)?,
        fetched_at: row.get(5)?,
    })
}

#[async_trait]
impl FrontierStore for SqliteFrontier {
    async fn enqueue_if_unseen(&self, url: &NormalizedUrl) -> Result<bool, StoreError> {
        let url = url.as_str().to_string();
        self.run(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let seen: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM seen_urls WHERE url = ?1)
                     OR EXISTS(SELECT 1 FROM pending WHERE url = ?1)
                     OR EXISTS(SELECT 1 FROM pages WHERE url = ?1 AND fingerprint IS NOT NULL)",
                params![url],
                |row| row.get(0),
            )?;
            if seen {
                return Ok(false);
            }

            let now = Utc::now();
            tx.execute(
                "INSERT INTO seen_urls (url, first_seen_at) VALUES (?1, ?2)",
                params![url, now],
            )?;
            tx.execute(
                "INSERT INTO pending (url, enqueued_at) VALUES (?1, ?2)",
                params![url, now],
            )?;
            tx.commit()?;

            debug!(url = %url, "enqueued");
            Ok(true)
        })
        .await
    }

    async fn claim_next(&self, limit: usize) -> Result<Vec<PendingRecord>, StoreError> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        self.run(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let now = Utc::now();
            let mut claimed = Vec::with_capacity(limit);

            // A row that no longer normalizes is dropped, not handed out;
            // keep selecting until the batch is full or the queue is empty
            while claimed.len() < limit {
                // Oldest first: nothing waits behind newer work
                let rows: Vec<(i64, String)> = {
                    let mut stmt = tx.prepare(
                        "SELECT id, url FROM pending
                         WHERE claimed_at IS NULL
                         ORDER BY id
                         LIMIT ?1",
                    )?;
                    let rows = stmt
                        .query_map(params![(limit - claimed.len()) as i64], |row| {
                            Ok((row.get(0)?, row.get(1)?))
                        })?
                        .collect::<Result<Vec<_>, _>>()?;
                    rows
                };
                if rows.is_empty() {
                    break;
                }

                for (id, raw) in rows {
                    match normalize(&raw, None) {
                        Some(url) => {
                            tx.execute(
                                "UPDATE pending SET claimed_at = ?1 WHERE id = ?2",
                                params![now, id],
                            )?;
                            claimed.push(PendingRecord { id, url });
                        }
                        None => {
                            warn!(id, url = %raw, "dropping pending record with invalid url");
                            tx.execute("DELETE FROM pending WHERE id = ?1", params![id])?;
                        }
                    }
                }
            }

            tx.commit()?;
            Ok(claimed)
        })
        .await
    }

    async fn complete_claim(&self, id: i64) -> Result<(), StoreError> {
        self.run(move |conn| {
            conn.execute("DELETE FROM pending WHERE id = ?1", params![id])?;
            Ok(())
        })
        .await
    }

    async fn upsert_page(&self, page: PageUpdate) -> Result<(), StoreError> {
        self.run(move |conn| {
            let now = Utc::now();
            let fetched_at = page.fingerprint.as_ref().map(|_| now);
            conn.execute(
                "INSERT INTO pages (url, title, fingerprint, is_external, discovered_at, fetched_at)
                 VALUES (?1, ?2, ?3, COALESCE(?4, 0), ?5, ?6)
                 ON CONFLICT(url) DO UPDATE SET
                     title       = COALESCE(excluded.title, pages.title),
                     fingerprint = COALESCE(excluded.fingerprint, pages.fingerprint),
                     is_external = COALESCE(?4, pages.is_external),
                     fetched_at  = COALESCE(excluded.fetched_at, pages.fetched_at)",
                params![
                    page.url.as_str(),
                    page.title,
                    page.fingerprint.map(|fp| fp.into_string()),
                    page.is_external,
                    now,
                    fetched_at,
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn page_exists(&self, url: &NormalizedUrl) -> Result<bool, StoreError> {
        let url = url.as_str().to_string();
        self.run(move |conn| {
            Ok(conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM pages WHERE url = ?1)",
                params![url],
                |row| row.get(0),
            )?)
        })
        .await
    }
}
