// src/fetch/transport.rs
// =============================================================================
// The network seam.
//
// The fetcher only needs "GET this URL, give me status + bytes". Keeping that
// behind a trait lets the retry logic and the dispatcher be tested with a
// scripted fake instead of a real network.
//
// ReqwestTransport is the real implementation:
// - one shared Client (connection pooling)
// - identifying User-Agent on every request
// - per-attempt timeout
// - redirects followed transparently (bounded)
// =============================================================================

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// What came back from one GET.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    /// URL after redirects
    pub final_url: Url,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

/// Why one GET produced no response at all.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("timed out")]
    Timeout,
    #[error("connect: {0}")]
    Connect(String),
    /// The response arrived but could not be decoded (bad compression,
    /// invalid framing). A connection dropped mid-body is `Connect` instead.
    #[error("body: {0}")]
    Body(String),
    #[error("{0}")]
    Other(String),
}

#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn get(&self, url: &Url) -> Result<RawResponse, TransportError>;
}

#[async_trait]
impl<T: HttpTransport + ?Sized> HttpTransport for Arc<T> {
    async fn get(&self, url: &Url) -> Result<RawResponse, TransportError> {
        (**self).get(url).await
    }
}

/// Maximum redirects followed before giving up on a URL
const MAX_REDIRECTS: usize = 10;

pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .build()?;
        Ok(Self::from_client(client))
    }

    /// Wraps an already configured client.
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: &Url) -> Result<RawResponse, TransportError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(categorize_error)?;

        let status = response.status().as_u16();
        let final_url = response.url().clone();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = response.bytes().await.map_err(categorize_error)?;

        Ok(RawResponse {
            status,
            final_url,
            content_type,
            body: body.to_vec(),
        })
    }
}

// Sorts reqwest errors into the few cases the fetcher cares about
//
// is_body() is an I/O failure while streaming the body (reset, early EOF),
// so it is a connection problem. is_request() also covers resets mid-request.
fn categorize_error(error: reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout
    } else if error.is_decode() {
        TransportError::Body(error.to_string())
    } else if error.is_connect() || error.is_body() || error.is_request() {
        TransportError::Connect(error.to_string())
    } else {
        TransportError::Other(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use crate::fetch::{Fetcher, RetryPolicy};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    // Local transport that ignores any HTTP(S)_PROXY set in the environment
    fn local_transport() -> ReqwestTransport {
        let client = Client::builder()
            .user_agent("AstianBot/0.1")
            .timeout(Duration::from_secs(5))
            .no_proxy()
            .build()
            .unwrap();
        ReqwestTransport::from_client(client)
    }

    // Serves `response` to every connection, then hangs up; returns the URL
    // and a counter of connections served
    async fn serve(response: &'static [u8]) -> (Url, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let served = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&served);
        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    break;
                };
                counter.fetch_add(1, Ordering::SeqCst);
                let mut request = [0u8; 2048];
                let _ = socket.read(&mut request).await;
                let _ = socket.write_all(response).await;
                let _ = socket.shutdown().await;
            }
        });

        let url = Url::parse(&format!("http://{addr}/page")).unwrap();
        (url, served)
    }

    #[test]
    fn test_client_builds() {
        let transport = ReqwestTransport::new("AstianBot/0.1", Duration::from_secs(10));
        assert!(transport.is_ok());
    }

    #[tokio::test]
    async fn test_reads_status_and_body() {
        let (url, _) = serve(
            b"HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: 5\r\nConnection: close\r\n\r\nhello",
        )
        .await;

        let response = local_transport().get(&url).await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.content_type.as_deref(), Some("text/html"));
        assert_eq!(response.body, b"hello");
        assert_eq!(response.final_url, url);
    }

    #[tokio::test]
    async fn test_truncated_body_is_retried_as_connection_error() {
        // Promises 1000 bytes, sends 6, hangs up
        let (url, served) = serve(
            b"HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: 1000\r\n\r\nhello!",
        )
        .await;

        let err = local_transport().get(&url).await.unwrap_err();
        assert!(matches!(err, TransportError::Connect(_)), "got {err:?}");

        let fetcher = Fetcher::new(local_transport(), RetryPolicy::new(3, Duration::from_millis(10)));
        match fetcher.fetch(&url).await.unwrap_err() {
            FetchError::Exhausted { attempts, last } => {
                assert_eq!(attempts, 3);
                assert!(matches!(*last, FetchError::Connection(_)));
            }
            other => panic!("expected Exhausted, got {other:?}"),
        }
        assert_eq!(served.load(Ordering::SeqCst), 4);
    }
}
