//! Per-category rate-limit ledger. Consumes `Retry-After` and a
//! colon-separated category-directive header from transport responses and
//! answers "may I send this item type now?"

use std::collections::HashMap;
use std::time::{Duration, Instant};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Category {
    Any,
    Error,
    Transaction,
    Session,
    Attachment,
    CheckIn,
}

impl Category {
    fn from_str(s: &str) -> Option<Self> {
        match s.trim() {
            "" | "any" => Some(Category::Any),
            "error" => Some(Category::Error),
            "transaction" => Some(Category::Transaction),
            "session" => Some(Category::Session),
            "attachment" => Some(Category::Attachment),
            "check_in" => Some(Category::CheckIn),
            _ => None,
        }
    }
}

#[derive(Default)]
pub struct RateLimiter {
    expirations: HashMap<Category, Instant>,
}

impl RateLimiter {
    pub fn new() -> Self {
        RateLimiter::default()
    }

    /// True iff no bucket covering `category` (or `Any`) is still active at `now`.
    pub fn may_send(&self, category: Category, now: Instant) -> bool {
        let blocked_by = |c: &Category| self.expirations.get(c).is_some_and(|exp| *exp > now);
        !blocked_by(&Category::Any) && !blocked_by(&category)
    }

    fn block(&mut self, category: Category, until: Instant) {
        let entry = self.expirations.entry(category).or_insert(until);
        if until > *entry {
            *entry = until;
        }
    }

    /// Apply a plain `Retry-After` (seconds) value. Used for bare 429s that
    /// carry no category directive: blocks every category.
    pub fn apply_retry_after(&mut self, seconds: u64, now: Instant) {
        self.block(Category::Any, now + Duration::from_secs(seconds));
    }

    /// Apply an `X-Sentry-Rate-Limits`-style header: comma-separated
    /// directives of the form `seconds:categories[:scope]`, where
    /// `categories` is a `;`-separated list (empty means "any").
    pub fn apply_rate_limit_header(&mut self, header: &str, now: Instant) {
        for directive in header.split(',') {
            let directive = directive.trim();
            if directive.is_empty() {
                continue;
            }
            let mut fields = directive.split(':');
            let Some(seconds_s) = fields.next() else { continue };
            let Ok(seconds) = seconds_s.trim().parse::<u64>() else { continue };
            let categories_s = fields.next().unwrap_or("");
            let until = now + Duration::from_secs(seconds);

            if categories_s.trim().is_empty() {
                self.block(Category::Any, until);
                continue;
            }
            for cat in categories_s.split(';') {
                if let Some(category) = Category::from_str(cat) {
                    self.block(category, until);
                }
            }
        }
    }

    /// Merge another ledger's buckets in, keeping the later expiry for each
    /// category. Used by the fanout transport to combine per-backend outcomes.
    pub fn merge(&mut self, other: &RateLimiter) {
        for (category, expiry) in &other.expirations {
            self.block(*category, *expiry);
        }
    }
}
