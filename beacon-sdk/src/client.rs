//! The client facade: the single owner that wires together the parsed
//! descriptor, the worker, the transport and the hub's scope stack.
//! Startup validates configuration and may install the crash handler and
//! replay a marker left by a previous crash; shutdown drains the worker to
//! a deadline and tears everything down idempotently.

use crate::config::ClientOptions;
use crate::crash;
use crate::descriptor::EndpointDescriptor;
use crate::error::{ClientError, SdkError, SdkResult};
use crate::hub::Hub;
use crate::model::SessionStatus;
use crate::transport::Transport;
use crate::worker::Worker;
use beacon_api::beacon_debug;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Everything the hub needs a stable address for. Heap-allocated once by
/// [`Client::init`] and shared via `Arc`; the worker's transport context and
/// every [`Hub`] built from it key off this single owner rather than
/// embedding the client by value anywhere it could move.
pub struct ClientInner {
    pub descriptor: EndpointDescriptor,
    pub options: ClientOptions,
    pub worker: Worker,
}

/// Owns the allocator-rooted [`ClientInner`], the root hub, and the
/// crash-handler installation for this client. `Client::init` is the one
/// fallible entry point; everything after that is best-effort telemetry.
pub struct Client {
    inner: Arc<ClientInner>,
    hub: Arc<Hub>,
    signal_handlers_installed: bool,
    closed: AtomicBool,
}

impl Client {
    /// Build every component and wire hub, worker and transport together.
    /// Validates the descriptor and sample rates, ensures `cache_dir`
    /// exists, installs the crash handler (if enabled) and replays any
    /// marker left by a previous crash, and optionally auto-starts a
    /// session. The caller supplies the transport backend; this crate has
    /// no opinion on whether it is HTTP, file-based, in-memory, or a
    /// fanout of several.
    pub fn init(options: ClientOptions, transport: Arc<dyn Transport>) -> Result<Arc<Client>, ClientError> {
        if !options.sample_rate.is_finite() || !(0.0..=1.0).contains(&options.sample_rate) {
            return Err(ClientError::InvalidSampleRate(options.sample_rate));
        }
        if !options.traces_sample_rate.is_finite() || !(0.0..=1.0).contains(&options.traces_sample_rate) {
            return Err(ClientError::InvalidTracesSampleRate(options.traces_sample_rate));
        }

        let descriptor = EndpointDescriptor::parse(&options.dsn)?;

        std::fs::create_dir_all(&options.cache_dir).map_err(|source| ClientError::CacheDir {
            path: options.cache_dir.display().to_string(),
            source,
        })?;

        let install_signal_handlers = options.install_signal_handlers;
        let cache_dir = options.cache_dir.clone();
        let auto_session_tracking = options.auto_session_tracking;

        let worker = Worker::new(transport);
        let inner = Arc::new(ClientInner { descriptor, options, worker });
        let hub = Hub::new(inner.clone());

        if install_signal_handlers {
            crash::install(&cache_dir);
        }
        if let Some(event) = crash::replay(&cache_dir) {
            beacon_debug!(name: "client.crash_replayed");
            hub.capture_event(event);
        }
        if auto_session_tracking {
            hub.start_session();
        }

        Ok(Arc::new(Client {
            inner,
            hub,
            signal_handlers_installed: install_signal_handlers,
            closed: AtomicBool::new(false),
        }))
    }

    /// The root hub for this client. Call [`Hub::set_current`] with this to
    /// make it the thread's current hub.
    pub fn hub(&self) -> Arc<Hub> {
        self.hub.clone()
    }

    pub fn options(&self) -> &ClientOptions {
        &self.inner.options
    }

    /// Block the caller until the worker's queue drains or `timeout_ms`
    /// elapses. Returns whether it drained in time.
    pub fn flush(&self, timeout_ms: u64) -> bool {
        self.hub.flush(std::time::Duration::from_millis(timeout_ms))
    }

    /// End any active session as `exited`, flush to the configured
    /// deadline, signal the worker to shut down and join it, and uninstall
    /// the crash handler. Idempotent: a second call returns
    /// [`SdkError::AlreadyShutdown`] without touching anything.
    pub fn close(&self) -> SdkResult {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Err(SdkError::AlreadyShutdown);
        }
        self.hub.end_session(SessionStatus::Exited);
        let timeout = self.inner.options.shutdown_timeout;
        let drained = self.hub.flush(timeout);
        self.inner.worker.shutdown();
        if self.signal_handlers_installed {
            crash::uninstall();
        }
        if drained {
            Ok(())
        } else {
            Err(SdkError::Timeout(timeout))
        }
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::InMemoryTransport;

    fn temp_cache_dir(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("beacon-client-test-{name}-{}", std::process::id()))
    }

    #[test]
    fn init_rejects_an_out_of_range_sample_rate() {
        let options = ClientOptions::new("https://key@host/1")
            .with_sample_rate(1.5)
            .with_cache_dir(temp_cache_dir("sample-rate"))
            .with_install_signal_handlers(false);
        let transport = Arc::new(InMemoryTransport::new());
        let err = Client::init(options, transport).unwrap_err();
        assert!(matches!(err, ClientError::InvalidSampleRate(_)));
    }

    #[test]
    fn init_rejects_a_malformed_dsn() {
        let options = ClientOptions::new("not a dsn")
            .with_cache_dir(temp_cache_dir("bad-dsn"))
            .with_install_signal_handlers(false);
        let transport = Arc::new(InMemoryTransport::new());
        assert!(Client::init(options, transport).is_err());
    }

    #[test]
    fn close_is_idempotent_and_flushes_queued_items() {
        let dir = temp_cache_dir("close");
        let options = ClientOptions::new("https://key@host/1")
            .with_cache_dir(&dir)
            .with_install_signal_handlers(false);
        let transport = Arc::new(InMemoryTransport::new());
        let client = Client::init(options, transport.clone()).unwrap();

        client.hub().capture_message("hello", beacon_api::Level::Info);
        assert!(client.close().is_ok());
        assert!(matches!(client.close(), Err(SdkError::AlreadyShutdown)));
        assert_eq!(transport.len(), 1);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn auto_session_tracking_starts_a_session_at_init() {
        let dir = temp_cache_dir("auto-session");
        let options = ClientOptions::new("https://key@host/1")
            .with_cache_dir(&dir)
            .with_install_signal_handlers(false)
            .with_auto_session_tracking(true);
        let transport = Arc::new(InMemoryTransport::new());
        let client = Client::init(options, transport.clone()).unwrap();
        let _ = client.close();

        let sent = transport.sent();
        assert!(sent.iter().any(|b| String::from_utf8_lossy(b).contains("\"sid\"")));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn close_reports_timeout_when_the_deadline_is_too_short_to_drain() {
        struct Blocking;
        impl crate::transport::Transport for Blocking {
            fn send(&self, _bytes: &[u8]) -> crate::transport::SendOutcome {
                std::thread::sleep(std::time::Duration::from_secs(5));
                crate::transport::SendOutcome::ok()
            }
        }

        let dir = temp_cache_dir("close-timeout");
        let options = ClientOptions::new("https://key@host/1")
            .with_cache_dir(&dir)
            .with_install_signal_handlers(false)
            .with_shutdown_timeout(std::time::Duration::from_millis(10));
        let client = Client::init(options, Arc::new(Blocking)).unwrap();
        client.hub().capture_message("slow", beacon_api::Level::Info);

        assert!(matches!(client.close(), Err(SdkError::Timeout(_))));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
