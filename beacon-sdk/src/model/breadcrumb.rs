use super::Dynamic;
use crate::time::Timestamp;
use beacon_api::Level;
use serde::Serialize;
use std::collections::VecDeque;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Breadcrumb {
    #[serde(with = "crate::time::serde_timestamp")]
    pub timestamp: Timestamp,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<Level>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Dynamic>,
}

impl Breadcrumb {
    pub fn new(message: impl Into<String>) -> Self {
        Breadcrumb {
            timestamp: Timestamp::now(),
            kind: "default".to_string(),
            category: None,
            message: Some(message.into()),
            level: None,
            data: None,
        }
    }
}

const HARD_CAP: usize = 200;

/// Fixed-capacity FIFO buffer of breadcrumbs. `VecDeque` already is a ring
/// buffer internally, so `push` is O(1) amortized and the oldest element is
/// evicted first when the buffer is full.
#[derive(Clone, Debug)]
pub struct BreadcrumbRing {
    capacity: usize,
    items: VecDeque<Breadcrumb>,
}

impl BreadcrumbRing {
    pub fn new(capacity: usize) -> Self {
        // Capacity zero would make every push immediately evict; treat it
        // as one to avoid a degenerate buffer that can never hold anything.
        let capacity = capacity.max(1).min(HARD_CAP);
        BreadcrumbRing { capacity, items: VecDeque::with_capacity(capacity) }
    }

    pub fn push(&mut self, mut breadcrumb: Breadcrumb) {
        if breadcrumb.kind.is_empty() {
            breadcrumb.kind = "default".to_string();
        }
        if self.items.len() >= self.capacity {
            self.items.pop_front();
        }
        self.items.push_back(breadcrumb);
    }

    /// A copy of the live elements, oldest first.
    pub fn snapshot(&self) -> Vec<Breadcrumb> {
        self.items.iter().cloned().collect()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retains_last_n_elements_in_order() {
        let mut ring = BreadcrumbRing::new(3);
        for i in 0..5 {
            ring.push(Breadcrumb::new(format!("msg-{i}")));
        }
        let snap = ring.snapshot();
        let messages: Vec<_> = snap.iter().map(|b| b.message.clone().unwrap()).collect();
        assert_eq!(messages, vec!["msg-2", "msg-3", "msg-4"]);
    }

    #[test]
    fn capacity_one_keeps_only_the_most_recent() {
        let mut ring = BreadcrumbRing::new(1);
        ring.push(Breadcrumb::new("first"));
        ring.push(Breadcrumb::new("second"));
        let snap = ring.snapshot();
        assert_eq!(snap.len(), 1);
        assert_eq!(snap[0].message.as_deref(), Some("second"));
    }

    #[test]
    fn capacity_zero_is_clamped_to_one() {
        let ring = BreadcrumbRing::new(0);
        assert_eq!(ring.capacity(), 1);
    }

    #[test]
    fn capacity_is_clamped_to_the_hard_cap() {
        let ring = BreadcrumbRing::new(10_000);
        assert_eq!(ring.capacity(), HARD_CAP);
    }

    #[test]
    fn clear_empties_the_buffer() {
        let mut ring = BreadcrumbRing::new(5);
        ring.push(Breadcrumb::new("one"));
        ring.clear();
        assert!(ring.is_empty());
    }
}
