use super::{SendOutcome, Transport};
use crate::ratelimit::RateLimiter;
use std::sync::Arc;

/// Broadcasts every submitted buffer to every backend, merging rate-limit
/// updates with max-expiry and reporting delivered only if at least one
/// backend accepted the buffer.
pub struct FanoutTransport {
    backends: Vec<Arc<dyn Transport>>,
}

impl FanoutTransport {
    pub fn new(backends: Vec<Arc<dyn Transport>>) -> Self {
        FanoutTransport { backends }
    }
}

impl Transport for FanoutTransport {
    fn send(&self, bytes: &[u8]) -> SendOutcome {
        let mut delivered = false;
        let mut merged = RateLimiter::new();
        let mut any_rate_limit = false;

        for backend in &self.backends {
            let outcome = backend.send(bytes);
            delivered |= outcome.delivered;
            if let Some(limiter) = outcome.rate_limit {
                merged.merge(&limiter);
                any_rate_limit = true;
            }
        }

        SendOutcome { delivered, rate_limit: any_rate_limit.then_some(merged) }
    }
}
