// src/fetch/http.rs
// =============================================================================
// The fetcher: one URL in, bytes (or a FetchError) out.
//
// Retry policy:
// - transient failures (timeout, connection error incl. a body cut off
//   mid-read, 5xx) are retried
// - everything else (4xx, bad scheme, undecodable body) fails immediately
// - at most `max_attempts` attempts in total
// - before retry k (k = 1 for the second attempt) we sleep
//   base_delay * 2^(k-1), so the waits are base, 2*base, 4*base, ...
//
// The fetcher never panics into the caller and never touches shared state;
// the only side effect is the network call itself.
// =============================================================================

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use super::transport::{HttpTransport, RawResponse, TransportError};
use crate::error::FetchError;

/// How hard to try before giving up on a URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Sleep before retry number `retry` (1-based).
    pub fn delay_before_retry(&self, retry: u32) -> Duration {
        // 2^31 * base is already absurd; cap the shift so it can't overflow
        let factor = 1u32 << retry.saturating_sub(1).min(31);
        self.base_delay.saturating_mul(factor)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(500))
    }
}

/// A successful fetch.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// The URL we asked for
    pub url: Url,
    /// Where we ended up after redirects
    pub final_url: Url,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

pub struct Fetcher<T> {
    transport: T,
    policy: RetryPolicy,
}

impl<T: HttpTransport> Fetcher<T> {
    pub fn new(transport: T, policy: RetryPolicy) -> Self {
        Self { transport, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    // Fetches a URL, retrying transient failures per the policy
    //
    // Returns:
    //   Ok(page) on a 2xx response with a readable body
    //   Err(FetchError::Exhausted) after max_attempts transient failures
    //   Err(other) right away for permanent failures
    pub async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError> {
        if !matches!(url.scheme(), "http" | "https") {
            return Err(FetchError::UnsupportedScheme(url.scheme().to_string()));
        }

        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            debug!(url = %url, attempt, "fetching");

            let error = match self.attempt(url).await {
                Ok(page) => return Ok(page),
                Err(e) if !e.is_transient() => {
                    debug!(url = %url, error = %e, "permanent fetch failure");
                    return Err(e);
                }
                Err(e) => e,
            };

            if attempt >= max_attempts {
                warn!(url = %url, attempts = attempt, error = %error, "giving up");
                return Err(FetchError::Exhausted {
                    attempts: attempt,
                    last: Box::new(error),
                });
            }

            let backoff = self.policy.delay_before_retry(attempt);
            warn!(
                url = %url,
                attempt,
                max_attempts,
                error = %error,
                backoff_ms = backoff.as_millis() as u64,
                "transient failure, backing off"
            );
            tokio::time::sleep(backoff).await;
            attempt += 1;
        }
    }

    async fn attempt(&self, url: &Url) -> Result<FetchedPage, FetchError> {
        let response = self.transport.get(url).await.map_err(|e| match e {
            TransportError::Timeout => FetchError::Timeout,
            TransportError::Connect(msg) => FetchError::Connection(msg),
            TransportError::Body(msg) | TransportError::Other(msg) => FetchError::Malformed(msg),
        })?;

        classify_response(url, response)
    }
}

// Maps a response to success or the matching FetchError
//
// HTTP status codes:
// - 200-299: success
// - 400-499: client error, retrying won't help
// - 500-599: server error, might be temporary
// - anything else (e.g. 3xx that wasn't followed): unexpected
fn classify_response(url: &Url, response: RawResponse) -> Result<FetchedPage, FetchError> {
    match response.status {
        200..=299 => Ok(FetchedPage {
            url: url.clone(),
            final_url: response.final_url,
            content_type: response.content_type,
            body: response.body,
        }),
        400..=499 => Err(FetchError::ClientStatus(response.status)),
        500..=599 => Err(FetchError::ServerStatus(response.status)),
        other => Err(FetchError::UnexpectedStatus(other)),
    }
}
