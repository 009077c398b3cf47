use super::{SendOutcome, Transport};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

/// Writes each submitted buffer to a uniquely-named file in a directory.
/// The offline store-and-forward story this SDK supports: no replay, no
/// retry, just a durable copy on disk.
pub struct FileTransport {
    dir: PathBuf,
    counter: AtomicU64,
}

impl FileTransport {
    pub fn new(dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(FileTransport { dir, counter: AtomicU64::new(0) })
    }
}

impl Transport for FileTransport {
    fn send(&self, bytes: &[u8]) -> SendOutcome {
        let seq = self.counter.fetch_add(1, Ordering::Relaxed);
        let pid = std::process::id();
        let path = self.dir.join(format!("envelope-{pid}-{seq}.bin"));
        match std::fs::write(&path, bytes) {
            Ok(()) => SendOutcome::ok(),
            Err(_) => SendOutcome::failed(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_each_envelope_to_a_distinct_file() {
        let dir = std::env::temp_dir().join(format!("beacon-file-sink-test-{}", std::process::id()));
        let transport = FileTransport::new(&dir).unwrap();
        transport.send(b"one");
        transport.send(b"two");
        let entries: Vec<_> = std::fs::read_dir(&dir).unwrap().collect();
        assert_eq!(entries.len(), 2);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
