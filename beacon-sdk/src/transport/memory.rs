use super::{SendOutcome, Transport};
use std::sync::Mutex;

/// Collects every submitted buffer in memory. Used by hub/worker tests so
/// they never need a network dependency.
#[derive(Default)]
pub struct InMemoryTransport {
    sent: Mutex<Vec<Vec<u8>>>,
}

impl InMemoryTransport {
    pub fn new() -> Self {
        InMemoryTransport::default()
    }

    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.sent.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Transport for InMemoryTransport {
    fn send(&self, bytes: &[u8]) -> SendOutcome {
        self.sent.lock().unwrap().push(bytes.to_vec());
        SendOutcome::ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_every_send_in_order() {
        let transport = InMemoryTransport::new();
        transport.send(b"one");
        transport.send(b"two");
        assert_eq!(transport.sent(), vec![b"one".to_vec(), b"two".to_vec()]);
    }
}
