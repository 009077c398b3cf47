//! The asynchronous delivery worker: a bounded FIFO queue drained by
//! exactly one dedicated thread. Grounded on the modern plain-`std::thread`
//! log processor rather than the legacy futures/executor-parameterized
//! span processor, since this worker has no async runtime to plug in.

use crate::ratelimit::{Category, RateLimiter};
use crate::transport::Transport;
use beacon_api::beacon_warn;
use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const QUEUE_CAP: usize = 100;

struct QueuedItem {
    category: Category,
    bytes: Vec<u8>,
}

struct State {
    queue: VecDeque<QueuedItem>,
    shutdown: bool,
    in_flight: usize,
    rate_limiter: RateLimiter,
    dropped: u64,
}

/// Bounded FIFO queue of opaque envelope buffers, one delivery thread,
/// drop-oldest-on-overflow, flush-to-deadline, cooperative shutdown.
pub struct Worker {
    state: Arc<Mutex<State>>,
    work_available: Arc<Condvar>,
    drained: Arc<Condvar>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Worker {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        let state = Arc::new(Mutex::new(State {
            queue: VecDeque::with_capacity(QUEUE_CAP),
            shutdown: false,
            in_flight: 0,
            rate_limiter: RateLimiter::new(),
            dropped: 0,
        }));
        let work_available = Arc::new(Condvar::new());
        let drained = Arc::new(Condvar::new());

        let handle = {
            let state = state.clone();
            let work_available = work_available.clone();
            let drained = drained.clone();
            thread::spawn(move || run(state, work_available, drained, transport))
        };

        Worker { state, work_available, drained, handle: Mutex::new(Some(handle)) }
    }

    /// Enqueue a buffer. Drops the oldest queued item if the queue is at
    /// capacity. Returns `false` (and leaves the buffer for the caller to
    /// drop) if the worker has already shut down.
    pub fn submit(&self, category: Category, bytes: Vec<u8>) -> bool {
        let mut state = self.state.lock().unwrap();
        if state.shutdown {
            return false;
        }
        if state.queue.len() >= QUEUE_CAP {
            state.queue.pop_front();
            state.dropped += 1;
            if state.dropped == 1 {
                beacon_warn!(name: "worker.queue_full", dropped = 1u64);
            }
        }
        state.queue.push_back(QueuedItem { category, bytes });
        drop(state);
        self.work_available.notify_one();
        true
    }

    /// Blocks until `queue_length == 0 && in_flight == 0` or the deadline
    /// passes. Returns whether the queue drained in time.
    pub fn flush(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock().unwrap();
        loop {
            if state.queue.is_empty() && state.in_flight == 0 {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            self.work_available.notify_one();
            let (guard, result) = self.drained.wait_timeout(state, deadline - now).unwrap();
            state = guard;
            if result.timed_out() && !(state.queue.is_empty() && state.in_flight == 0) {
                return false;
            }
        }
    }

    /// Signals the worker to stop after draining, then joins the thread.
    /// Idempotent: calling it twice is a no-op the second time.
    pub fn shutdown(&self) {
        {
            let mut state = self.state.lock().unwrap();
            state.shutdown = true;
        }
        self.work_available.notify_one();
        if let Some(handle) = self.handle.lock().unwrap().take() {
            let _ = handle.join();
        }
    }

    pub fn queue_len(&self) -> usize {
        self.state.lock().unwrap().queue.len()
    }
}

fn run(state: Arc<Mutex<State>>, work_available: Arc<Condvar>, drained: Arc<Condvar>, transport: Arc<dyn Transport>) {
    loop {
        let item = {
            let mut guard = state.lock().unwrap();
            loop {
                if let Some(item) = guard.queue.pop_front() {
                    guard.in_flight += 1;
                    break Some(item);
                }
                if guard.shutdown {
                    break None;
                }
                guard = work_available.wait(guard).unwrap();
            }
        };

        let Some(item) = item else { break };

        let may_send = {
            let guard = state.lock().unwrap();
            guard.rate_limiter.may_send(item.category, Instant::now())
        };

        if may_send {
            let outcome = transport.send(&item.bytes);
            let mut guard = state.lock().unwrap();
            if let Some(update) = outcome.rate_limit {
                guard.rate_limiter.merge(&update);
            }
        }

        let mut guard = state.lock().unwrap();
        guard.in_flight -= 1;
        if guard.queue.is_empty() && guard.in_flight == 0 {
            drop(guard);
            drained.notify_all();
        }
    }
    drained.notify_all();
}
