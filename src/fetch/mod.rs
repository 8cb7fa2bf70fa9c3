// src/fetch/mod.rs
// =============================================================================
// Fetching pages over HTTP.
//
// Submodules:
// - transport: the HttpTransport trait + the reqwest-backed implementation
// - http: the Fetcher (status classification, retry with backoff)
// =============================================================================

mod http;
mod transport;

pub use http::{FetchedPage, Fetcher, RetryPolicy};
pub use transport::{HttpTransport, RawResponse, ReqwestTransport, TransportError};
