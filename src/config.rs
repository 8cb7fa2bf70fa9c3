// src/config.rs
// =============================================================================
// Crawl settings.
//
// The core never reads files or env vars itself; callers build a CrawlConfig
// (the binary does it from CLI flags) and hand it to the dispatcher.
// =============================================================================

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::fetch::RetryPolicy;

/// Identifying User-Agent sent with every request
pub const DEFAULT_USER_AGENT: &str = "AstianBot/0.1";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlConfig {
    /// Units of work running at once
    pub concurrency: usize,
    /// Attempts per URL, including the first
    pub max_attempts: u32,
    /// First backoff delay; doubles on every retry
    pub base_delay: Duration,
    /// Timeout for a single HTTP attempt
    pub request_timeout: Duration,
    pub user_agent: String,
    /// Ask the store whether a page is known before trying to enqueue it
    pub precheck_existing: bool,
    /// Age after which a claim is presumed to belong to a dead process
    pub stale_claim_after: Duration,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("concurrency must be at least 1")]
    ZeroConcurrency,
    #[error("max_attempts must be at least 1")]
    ZeroAttempts,
    #[error("request timeout must be greater than zero")]
    ZeroTimeout,
    #[error("user agent must not be empty")]
    EmptyUserAgent,
    #[error("stale claim age must be longer than a whole fetch with retries")]
    StaleClaimTooShort,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            concurrency: 5,
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            request_timeout: Duration::from_secs(10),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            precheck_existing: true,
            stale_claim_after: Duration::from_secs(600),
        }
    }
}

impl CrawlConfig {
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_retries(mut self, max_attempts: u32, base_delay: Duration) -> Self {
        self.max_attempts = max_attempts;
        self.base_delay = base_delay;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_precheck(mut self, precheck_existing: bool) -> Self {
        self.precheck_existing = precheck_existing;
        self
    }

    pub fn with_stale_claim_after(mut self, age: Duration) -> Self {
        self.stale_claim_after = age;
        self
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, self.base_delay)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrency == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        if self.max_attempts == 0 {
            return Err(ConfigError::ZeroAttempts);
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        if self.user_agent.trim().is_empty() {
            return Err(ConfigError::EmptyUserAgent);
        }
        if self.stale_claim_after <= self.longest_fetch() {
            return Err(ConfigError::StaleClaimTooShort);
        }
        Ok(())
    }

    // Upper bound on one fetch: every attempt times out, plus all backoff sleeps
    fn longest_fetch(&self) -> Duration {
        let policy = self.retry_policy();
        let attempts = policy.max_attempts;
        let backoff: Duration = (1..attempts).map(|k| policy.delay_before_retry(k)).sum();
        self.request_timeout.saturating_mul(attempts).saturating_add(backoff)
    }
}
