//! The HTTPS transport backend: POSTs envelope buffers to the upload URL
//! derived from the [`EndpointDescriptor`], parses `Retry-After` and the
//! `x-beacon-rate-limits` category-directive header back into a
//! [`RateLimiter`], and never retries inside this backend (the worker
//! never retries a 4xx and 5xx outcomes are dropped without retry per the
//! core's error-handling design; a pluggable backend may still choose to
//! retry internally, but this one does not).
//!
//! Built on `reqwest`'s blocking client rather than its async one: the
//! delivery worker this plugs into is a single dedicated `std::thread`
//! with no async runtime to hand a future to.

use beacon_sdk::transport::{SendOutcome, Transport};
use beacon_sdk::{EndpointDescriptor, RateLimiter, SDK_NAME, SDK_VERSION};
use http::header::{HeaderName, CONTENT_TYPE, RETRY_AFTER, USER_AGENT};
use http::{Request, StatusCode};
use reqwest::blocking::Client as ReqwestClient;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const RATE_LIMIT_HEADER: &str = "x-beacon-rate-limits";
const ENVELOPE_CONTENT_TYPE: &str = "application/x-sentry-envelope";

/// Errors constructing the underlying `reqwest` client.
#[derive(Debug, thiserror::Error)]
pub enum HttpTransportError {
    #[error("failed to build the HTTP client: {0}")]
    Build(#[from] reqwest::Error),
}

/// Sends envelope buffers to a single endpoint over HTTPS.
pub struct HttpTransport {
    url: String,
    client: ReqwestClient,
    user_agent: String,
}

impl HttpTransport {
    /// Build a transport that POSTs to the upload URL derived from
    /// `descriptor`, with the given per-request timeout.
    pub fn new(descriptor: &EndpointDescriptor, timeout: Duration) -> Result<Self, HttpTransportError> {
        let client = ReqwestClient::builder().timeout(timeout).build()?;
        Ok(HttpTransport {
            url: descriptor.upload_url(),
            client,
            user_agent: format!("{SDK_NAME}/{SDK_VERSION}"),
        })
    }
}

impl Transport for HttpTransport {
    fn send(&self, bytes: &[u8]) -> SendOutcome {
        let request = Request::builder()
            .method("POST")
            .uri(&self.url)
            .header(CONTENT_TYPE, ENVELOPE_CONTENT_TYPE)
            .header(USER_AGENT, &self.user_agent)
            .body(bytes.to_vec());

        let response = match request {
            Ok(request) => request.try_into().and_then(|req| self.client.execute(req)),
            Err(err) => {
                warn!(name: "transport.request_build_failed", error = %err);
                return SendOutcome::failed();
            }
        };

        let response = match response {
            Ok(r) => r,
            Err(err) => {
                warn!(name: "transport.send_failed", error = %err);
                return SendOutcome::failed();
            }
        };

        let status = response.status();
        let now = Instant::now();
        let mut limiter = RateLimiter::new();
        let mut has_limit = false;

        if status == StatusCode::TOO_MANY_REQUESTS {
            if let Some(seconds) = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse::<u64>().ok())
            {
                limiter.apply_retry_after(seconds, now);
                has_limit = true;
            }
        }

        if let Ok(name) = HeaderName::from_bytes(RATE_LIMIT_HEADER.as_bytes()) {
            if let Some(value) = response.headers().get(name).and_then(|v| v.to_str().ok()) {
                limiter.apply_rate_limit_header(value, now);
                has_limit = true;
            }
        }

        let delivered = status.is_success();
        if !delivered {
            debug!(name: "transport.non_success_status", status = status.as_u16());
        }

        let mut outcome = if delivered { SendOutcome::ok() } else { SendOutcome::failed() };
        if has_limit {
            outcome = outcome.with_rate_limit(limiter);
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beacon_sdk::Category;
    use std::io::{Read, Write};
    use std::net::TcpListener;

    /// Spawns a single-shot HTTP/1.1 server on a loopback port that reads
    /// one request and replies with `response_head`, then returns the
    /// listener's address. Enough to exercise header parsing without a
    /// network dependency beyond `std`.
    fn serve_once(response_head: &'static str) -> std::net::SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        std::thread::spawn(move || {
            if let Ok((mut stream, _)) = listener.accept() {
                let mut buf = [0u8; 4096];
                let _ = stream.read(&mut buf);
                let _ = stream.write_all(response_head.as_bytes());
            }
        });
        addr
    }

    fn descriptor_for(addr: std::net::SocketAddr) -> EndpointDescriptor {
        EndpointDescriptor::parse(&format!("http://key@{}/1", addr)).unwrap()
    }

    #[test]
    fn success_response_reports_delivered_with_no_rate_limit() {
        let addr = serve_once("HTTP/1.1 200 OK\r\ncontent-length: 0\r\n\r\n");
        let transport = HttpTransport::new(&descriptor_for(addr), Duration::from_secs(5)).unwrap();
        let outcome = transport.send(b"envelope-bytes");
        assert!(outcome.delivered);
        assert!(outcome.rate_limit.is_none());
    }

    #[test]
    fn rate_limited_response_blocks_the_named_category() {
        let addr = serve_once(
            "HTTP/1.1 429 Too Many Requests\r\nretry-after: 30\r\nx-beacon-rate-limits: 30:error\r\ncontent-length: 0\r\n\r\n",
        );
        let transport = HttpTransport::new(&descriptor_for(addr), Duration::from_secs(5)).unwrap();
        let outcome = transport.send(b"envelope-bytes");
        assert!(!outcome.delivered);
        let limiter = outcome.rate_limit.expect("429 carries a rate limit update");
        assert!(!limiter.may_send(Category::Error, Instant::now()));
    }

    #[test]
    fn unreachable_host_reports_not_delivered() {
        let descriptor = EndpointDescriptor::parse("http://key@127.0.0.1:1/1").unwrap();
        let transport = HttpTransport::new(&descriptor, Duration::from_millis(200)).unwrap();
        let outcome = transport.send(b"x");
        assert!(!outcome.delivered);
        assert!(outcome.rate_limit.is_none());
    }
}
