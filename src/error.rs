// src/error.rs
// =============================================================================
// Error types shared by the crawl components.
//
// - FetchError: everything that can go wrong getting bytes for a URL.
//   Some variants are transient (worth retrying), the rest are permanent.
// - StoreError: a persistence operation on the frontier failed.
//
// Content decoding problems are NOT an error: the content processor degrades
// to a best-effort result instead (see content::decode).
// =============================================================================

use thiserror::Error;

/// Errors returned by the fetcher.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The attempt did not finish within the per-attempt timeout
    #[error("request timed out")]
    Timeout,

    /// Connection refused, reset, DNS failure, ...
    #[error("connection failed: {0}")]
    Connection(String),

    /// 5xx response
    #[error("server error: HTTP {0}")]
    ServerStatus(u16),

    /// 4xx response
    #[error("client error: HTTP {0}")]
    ClientStatus(u16),

    /// Any other non-2xx status (e.g. a redirect we did not follow)
    #[error("unexpected status: HTTP {0}")]
    UnexpectedStatus(u16),

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    /// The response could not be read or was not valid HTTP
    #[error("malformed response: {0}")]
    Malformed(String),

    /// A transient failure kept happening until the retry budget ran out
    #[error("gave up after {attempts} attempt(s): {last}")]
    Exhausted { attempts: u32, last: Box<FetchError> },
}

impl FetchError {
    /// Whether another attempt could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            FetchError::Timeout | FetchError::Connection(_) | FetchError::ServerStatus(_)
        )
    }
}

/// Errors returned by the frontier store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// The blocking task running the query panicked or was cancelled
    #[error("store task failed: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(FetchError::Timeout.is_transient());
        assert!(FetchError::Connection("reset".into()).is_transient());
        assert!(FetchError::ServerStatus(503).is_transient());

        assert!(!FetchError::ClientStatus(404).is_transient());
        assert!(!FetchError::UnsupportedScheme("ftp".into()).is_transient());
        assert!(!FetchError::Malformed("bad body".into()).is_transient());
    }

    #[test]
    fn test_exhausted_is_terminal() {
        let err = FetchError::Exhausted {
            attempts: 3,
            last: Box::new(FetchError::Timeout),
        };
        assert!(!err.is_transient());
        assert_eq!(err.to_string(), "gave up after 3 attempt(s): request timed out");
    }
}
