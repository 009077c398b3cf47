//! The pluggable transport seam: an opaque send function plus context.
//! Implementations: the HTTPS backend (`beacon-http`), an in-memory
//! recorder for tests, a file sink, and a fanout that broadcasts to N
//! backends.

mod fanout;
mod file;
mod memory;

pub use fanout::FanoutTransport;
pub use file::FileTransport;
pub use memory::InMemoryTransport;

use crate::ratelimit::RateLimiter;

/// The result of one delivery attempt. `rate_limit` is the set of new
/// category blocks this response introduced, already parsed into ledger
/// form so the worker only ever has to call [`RateLimiter::merge`].
pub struct SendOutcome {
    pub delivered: bool,
    pub rate_limit: Option<RateLimiter>,
}

impl SendOutcome {
    pub fn ok() -> Self {
        SendOutcome { delivered: true, rate_limit: None }
    }

    pub fn failed() -> Self {
        SendOutcome { delivered: false, rate_limit: None }
    }

    pub fn with_rate_limit(mut self, limiter: RateLimiter) -> Self {
        self.rate_limit = Some(limiter);
        self
    }
}

/// Implemented by every delivery backend. `send` may block arbitrarily on
/// I/O; the worker thread is the only caller.
pub trait Transport: Send + Sync {
    fn send(&self, bytes: &[u8]) -> SendOutcome;
}
