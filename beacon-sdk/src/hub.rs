//! The hub: the capture-pipeline root. Owns the scope stack, the current
//! trace continuation, and the active session; a process-wide thread-local
//! slot names the "current" hub per thread.

use crate::client::ClientInner;
use crate::envelope::{Envelope, Item};
use crate::model::{Attachment, Breadcrumb, CheckIn, Event, Session, SessionStatus, Transaction};
use crate::ratelimit::Category;
use crate::scope::Scope;
use beacon_api::{beacon_debug, EventId, Level, TraceParent};
use rand::Rng;
use std::cell::RefCell;
use std::sync::{Arc, Mutex};
use std::time::Duration;

thread_local! {
    static CURRENT_HUB: RefCell<Option<Arc<Hub>>> = const { RefCell::new(None) };
}

pub struct Hub {
    client: Arc<ClientInner>,
    scopes: Mutex<Vec<Arc<Scope>>>,
    session: Mutex<Option<Session>>,
    trace: Mutex<Option<TraceParent>>,
}

impl Hub {
    pub(crate) fn new(client: Arc<ClientInner>) -> Arc<Hub> {
        let root = Scope::new(client.options.max_breadcrumbs);
        Arc::new(Hub {
            client,
            scopes: Mutex::new(vec![Arc::new(root)]),
            session: Mutex::new(None),
            trace: Mutex::new(None),
        })
    }

    pub fn set_current(hub: Arc<Hub>) {
        CURRENT_HUB.with(|c| *c.borrow_mut() = Some(hub));
    }

    pub fn clear_current() {
        CURRENT_HUB.with(|c| *c.borrow_mut() = None);
    }

    pub fn current() -> Option<Arc<Hub>> {
        CURRENT_HUB.with(|c| c.borrow().clone())
    }

    /// Fork the top scope and push the copy. The lowest (root) scope can
    /// never be popped.
    pub fn push_scope(&self) {
        let mut scopes = self.scopes.lock().unwrap();
        let forked = scopes.last().expect("scope stack is never empty").clone_scope();
        scopes.push(Arc::new(forked));
    }

    pub fn pop_scope(&self) {
        let mut scopes = self.scopes.lock().unwrap();
        if scopes.len() > 1 {
            scopes.pop();
        }
    }

    pub fn current_scope(&self) -> Arc<Scope> {
        self.scopes.lock().unwrap().last().expect("scope stack is never empty").clone()
    }

    pub fn with_scope<R>(&self, f: impl FnOnce(&Scope) -> R) -> R {
        self.push_scope();
        let result = f(&self.current_scope());
        self.pop_scope();
        result
    }

    pub fn add_breadcrumb(&self, breadcrumb: Breadcrumb) {
        let breadcrumb = match &self.client.options.before_breadcrumb {
            Some(hook) => match hook(breadcrumb) {
                Some(b) => b,
                None => return,
            },
            None => breadcrumb,
        };
        self.current_scope().add_breadcrumb(breadcrumb);
    }

    /// Attach a byte payload to the current scope. It rides along with the
    /// next event this hub captures, then is cleared.
    pub fn add_attachment(&self, attachment: Attachment) {
        self.current_scope().add_attachment(attachment);
    }

    pub fn capture_message(&self, text: impl Into<String>, level: Level) -> Option<EventId> {
        self.capture_event(Event::message(text, level))
    }

    pub fn capture_exception(&self, kind: impl Into<String>, value: impl Into<String>) -> Option<EventId> {
        self.capture_event(Event::exception(kind, value))
    }

    /// The ordered capture pipeline from defaults through sampling to
    /// envelope submission. Any step may drop the event; telemetry is
    /// best-effort and never surfaces an error to the caller.
    pub fn capture_event(&self, mut event: Event) -> Option<EventId> {
        let options = &self.client.options;

        // 1. Fill defaults.
        if event.release.is_none() {
            event.release = options.release.clone();
        }
        if event.environment.is_none() {
            event.environment = options.environment.clone();
        }
        if event.server_name.is_none() {
            event.server_name = options.server_name.clone();
        }

        // 2 & 3. Scope enrichment, then event processors in order.
        let scope = self.current_scope();
        let processors = scope.apply(&mut event);
        for processor in processors {
            if !processor(&mut event) {
                debug_outcome(options.debug, "dropped-by-processor");
                return None;
            }
        }

        // 4. Update the active session.
        {
            let mut session_slot = self.session.lock().unwrap();
            if let Some(session) = session_slot.as_mut() {
                if event.is_error_or_worse() {
                    session.record_event(event.level);
                    self.emit_session_update(session);
                    session.init = false;
                }
            }
        }

        // 5. Sampling (after processors, so their accounting already ran).
        let sample: f64 = rand::rng().random_range(0.0..1.0);
        if sample >= options.sample_rate {
            debug_outcome(options.debug, "sampled-out");
            return None;
        }

        // 6. before_send.
        let event = match &options.before_send {
            Some(hook) => match hook(event) {
                Some(e) => e,
                None => {
                    debug_outcome(options.debug, "dropped-by-before-send");
                    return None;
                }
            },
            None => event,
        };

        // 7. Encode and submit, draining any attachments accumulated on the
        // scope since the last flush into the same envelope.
        let event_id = event.event_id;
        let Ok(payload) = event.to_json() else {
            debug_outcome(options.debug, "encoding-failed");
            return None;
        };
        let mut envelope = Envelope::new(self.client.descriptor.to_string())
            .with_event_id(event_id)
            .push(Item::Event(payload));
        for attachment in scope.take_attachments() {
            envelope = envelope.push(Item::Attachment {
                filename: attachment.filename,
                content_type: attachment.content_type,
                attachment_type: attachment.attachment_type,
                bytes: attachment.bytes,
            });
        }
        let accepted = self.client.worker.submit(Category::Error, envelope.serialize());
        debug_outcome(options.debug, if accepted { "enqueued" } else { "delivery-failed" });
        Some(event_id)
    }

    pub fn capture_check_in(&self, check_in: &CheckIn) {
        let payload = check_in.to_json();
        let Ok(bytes) = serde_json::to_vec(&payload) else { return };
        let envelope = Envelope::new(self.client.descriptor.to_string()).push(Item::CheckIn(bytes));
        self.client.worker.submit(Category::CheckIn, envelope.serialize());
    }

    /// Record an inbound trace continuation so the next [`Self::start_transaction`]
    /// joins it instead of starting a fresh trace.
    pub fn continue_trace(&self, parent: TraceParent) {
        *self.trace.lock().unwrap() = Some(parent);
    }

    pub fn start_transaction(&self, op: impl Into<String>, name: impl Into<String>) -> Transaction {
        let mut txn = Transaction::start(op, name);
        let continuation = self.trace.lock().unwrap().take();

        if let Some(parent) = continuation {
            txn.trace_id = parent.trace_id;
            txn.parent_span_id = Some(parent.parent_span_id);
            txn.parent_sampled = parent.sampled;
            txn.sampled = parent.sampled.unwrap_or(txn.sampled);
        } else {
            txn.sampled = self.decide_transaction_sampling(&txn);
        }
        txn.release = self.client.options.release.clone();
        txn.environment = self.client.options.environment.clone();
        txn
    }

    fn decide_transaction_sampling(&self, txn: &Transaction) -> bool {
        let options = &self.client.options;
        let rate = if let Some(sampler) = &options.traces_sampler {
            let ctx = crate::config::SamplingContext {
                transaction_name: txn.name.clone(),
                op: txn.op.clone(),
                parent_sampled: txn.parent_sampled,
            };
            sampler(&ctx)
        } else {
            options.traces_sample_rate
        };
        let sample: f64 = rand::rng().random_range(0.0..1.0);
        sample < rate
    }

    pub fn finish_transaction(&self, mut txn: Transaction) {
        if txn.timestamp.is_none() {
            txn.finish();
        }
        if !txn.sampled {
            return;
        }
        let payload = serde_json::to_vec(&txn.to_json()).unwrap_or_default();
        let envelope = Envelope::new(self.client.descriptor.to_string())
            .with_event_id(EventId::new())
            .push(Item::Transaction(payload));
        self.client.worker.submit(Category::Transaction, envelope.serialize());
    }

    pub fn start_session(&self) {
        let mut session = Session::start(
            self.client.options.release.clone(),
            self.client.options.environment.clone(),
            self.client.options.session_mode,
        );
        self.emit_session_update(&session);
        session.init = false;
        *self.session.lock().unwrap() = Some(session);
    }

    pub fn end_session(&self, status: SessionStatus) {
        let mut slot = self.session.lock().unwrap();
        if let Some(session) = slot.as_mut() {
            match status {
                SessionStatus::Exited => session.exit(),
                SessionStatus::Crashed => session.crash(),
                SessionStatus::Abnormal => session.abort(),
                _ => {}
            }
            self.emit_session_update(session);
        }
        *slot = None;
    }

    /// Emit a session envelope item and flip `init` off after the first
    /// flush of this session identifier.
    fn emit_session_update(&self, session: &Session) {
        let payload = serde_json::to_vec(&session.to_json()).unwrap_or_default();
        let envelope = Envelope::new(self.client.descriptor.to_string()).push(Item::Session(payload));
        self.client.worker.submit(Category::Session, envelope.serialize());
    }

    pub fn flush(&self, timeout: Duration) -> bool {
        self.client.worker.flush(timeout)
    }

    /// Deep-clone the scope stack and current trace continuation into a
    /// freestanding hub that shares this hub's client. The new hub starts
    /// with no active session: sessions are a per-execution-context
    /// concept and a detached hub is, by construction, a different one.
    fn snapshot(&self) -> Arc<Hub> {
        let scopes = self.scopes.lock().unwrap();
        let cloned = scopes.iter().map(|s| Arc::new(s.clone_scope())).collect();
        let trace = self.trace.lock().unwrap().clone();
        Arc::new(Hub {
            client: self.client.clone(),
            scopes: Mutex::new(cloned),
            session: Mutex::new(None),
            trace: Mutex::new(trace),
        })
    }
}

/// A snapshot of a hub's scope stack, deep-cloned so it can travel to
/// another task or thread without racing the hub it was taken from.
/// Carries the same client `Arc`, so events captured through it still
/// flow to the same worker and transport.
///
/// Mirrors the teacher's `Context::current()` / `attach` idiom
/// (`opentelemetry/src/context.rs`): capture now, enter later, and the
/// guard returned by [`DetachedHub::enter`] restores whatever hub was
/// current on this thread before it is dropped.
pub struct DetachedHub {
    hub: Arc<Hub>,
}

impl DetachedHub {
    /// Snapshot the calling thread's current hub. Returns `None` if no
    /// hub is current (the client was never made current on this thread).
    pub fn capture() -> Option<DetachedHub> {
        Some(DetachedHub { hub: Hub::current()?.snapshot() })
    }

    /// Make the snapshot current on the calling thread. The previous hub,
    /// if any, is restored when the returned guard is dropped.
    pub fn enter(self) -> DetachedHubGuard {
        let previous = Hub::current();
        Hub::set_current(self.hub);
        DetachedHubGuard { previous }
    }
}

/// Restores the previously-current hub on drop. Returned by
/// [`DetachedHub::enter`].
pub struct DetachedHubGuard {
    previous: Option<Arc<Hub>>,
}

impl Drop for DetachedHubGuard {
    fn drop(&mut self) {
        match self.previous.take() {
            Some(hub) => Hub::set_current(hub),
            None => Hub::clear_current(),
        }
    }
}

/// Logs the capture pipeline's per-event outcome. Compiles unconditionally
/// either way; the `debug` client option only decides whether the line is
/// promoted from `debug` to `info` so operators can opt in at runtime
/// without recompiling — `tracing`'s own subscriber-side filtering decides
/// what is actually printed.
fn debug_outcome(debug: bool, outcome: &'static str) {
    if debug {
        tracing::info!(name: "capture.outcome", target: "beacon_sdk", outcome, "");
    } else {
        beacon_debug!(name: "capture.outcome", outcome = outcome);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ClientInner;
    use crate::config::ClientOptions;
    use crate::descriptor::EndpointDescriptor;
    use crate::transport::InMemoryTransport;
    use crate::worker::Worker;
    use std::sync::Arc;

    fn test_hub(options: ClientOptions) -> (Arc<Hub>, Arc<InMemoryTransport>) {
        let transport = Arc::new(InMemoryTransport::new());
        let descriptor = EndpointDescriptor::parse(&options.dsn).unwrap();
        let worker = Worker::new(transport.clone());
        let client = Arc::new(ClientInner { descriptor, options, worker });
        (Hub::new(client), transport)
    }

    #[test]
    fn current_scope_is_the_last_pushed_and_not_yet_popped() {
        let (hub, _transport) = test_hub(ClientOptions::new("https://key@host/1"));
        let root = hub.current_scope();
        hub.push_scope();
        let pushed = hub.current_scope();
        assert!(!Arc::ptr_eq(&root, &pushed));
        hub.pop_scope();
        let popped_back = hub.current_scope();
        assert!(Arc::ptr_eq(&root, &popped_back));
    }

    #[test]
    fn root_scope_cannot_be_popped() {
        let (hub, _transport) = test_hub(ClientOptions::new("https://key@host/1"));
        let root = hub.current_scope();
        hub.pop_scope();
        assert!(Arc::ptr_eq(&root, &hub.current_scope()));
    }

    #[test]
    fn sample_rate_zero_drops_everything() {
        let options = ClientOptions::new("https://key@host/1").with_sample_rate(0.0);
        let (hub, transport) = test_hub(options);
        let id = hub.capture_message("hello", Level::Info);
        hub.flush(Duration::from_secs(1));
        assert!(id.is_none());
        assert!(transport.is_empty());
    }

    #[test]
    fn sample_rate_one_drops_nothing() {
        let options = ClientOptions::new("https://key@host/1").with_sample_rate(1.0);
        let (hub, transport) = test_hub(options);
        let id = hub.capture_message("hello", Level::Info);
        hub.flush(Duration::from_secs(1));
        assert!(id.is_some());
        assert_eq!(transport.len(), 1);
    }

    #[test]
    fn scenario_two_message_capture_produces_a_well_formed_envelope() {
        let options = ClientOptions::new("https://abc123@o0.ingest.sentry.io/5678");
        let (hub, transport) = test_hub(options);
        hub.capture_message("integration test message", Level::Warning);
        hub.flush(Duration::from_secs(1));

        let sent = transport.sent();
        assert_eq!(sent.len(), 1);
        let text = String::from_utf8(sent[0].clone()).unwrap();
        let lines: Vec<&str> = text.splitn(3, '\n').collect();
        assert!(lines[0].contains("event_id"));
        assert!(lines[0].contains("dsn"));
        assert!(lines[0].contains("sent_at"));
        assert!(lines[1].starts_with("{\"type\":\"event\",\"length\":"));
        assert!(lines[2].contains("warning"));
        assert!(lines[2].contains("integration test message"));
    }

    #[test]
    fn an_attachment_added_through_the_public_api_rides_the_next_envelope() {
        let options = ClientOptions::new("https://key@host/1");
        let (hub, transport) = test_hub(options);
        hub.add_attachment(Attachment::new("trace.log", b"line one\nline two".to_vec()));
        hub.capture_message("with attachment", Level::Info);
        hub.flush(Duration::from_secs(1));

        let sent = transport.sent();
        assert_eq!(sent.len(), 1);
        let text = String::from_utf8(sent[0].clone()).unwrap();
        assert!(text.contains("\"type\":\"attachment\""));
        assert!(text.contains("\"filename\":\"trace.log\""));
        assert!(text.contains("line one\nline two"));

        // The attachment is drained, not replayed on the next capture.
        hub.capture_message("no attachment this time", Level::Info);
        hub.flush(Duration::from_secs(1));
        let second = String::from_utf8(transport.sent()[1].clone()).unwrap();
        assert!(!second.contains("\"type\":\"attachment\""));
    }

    #[test]
    fn scenario_five_trace_continuation_is_honored() {
        let options = ClientOptions::new("https://key@host/1");
        let (hub, _transport) = test_hub(options);
        let header = "00-0123456789abcdef0123456789abcdef-89abcdef01234567-01";
        let parent = TraceParent::parse_w3c(header).unwrap();
        hub.continue_trace(parent);
        let txn = hub.start_transaction("http.server", "GET /");
        assert_eq!(txn.trace_id, parent.trace_id);
        assert_eq!(txn.parent_span_id, Some(parent.parent_span_id));
        assert!(txn.sampled);
    }

    #[test]
    fn debug_flag_promotes_the_outcome_log_without_disrupting_capture() {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
        let options = ClientOptions::new("https://key@host/1").with_debug(true);
        let (hub, transport) = test_hub(options);
        let id = hub.capture_message("hello", Level::Info);
        hub.flush(Duration::from_secs(1));
        assert!(id.is_some());
        assert_eq!(transport.len(), 1);
    }

    #[test]
    fn session_lifecycle_reports_init_then_exited() {
        let options = ClientOptions::new("https://key@host/1").with_release("my-app@1.0.0");
        let (hub, transport) = test_hub(options);
        hub.start_session();
        hub.capture_event(Event::exception("Boom", "it broke"));
        hub.end_session(SessionStatus::Exited);
        hub.flush(Duration::from_secs(1));

        let sent = transport.sent();
        let first_session = sent.iter().map(|b| String::from_utf8_lossy(b).into_owned()).find(|s| s.contains("\"sid\"")).unwrap();
        assert!(first_session.contains("\"init\":true"));
    }

    #[test]
    fn detached_hub_carries_a_deep_copy_of_the_scope_stack_and_restores_on_drop() {
        let (hub, transport) = test_hub(ClientOptions::new("https://key@host/1"));
        hub.current_scope().set_tag("origin", "main-task");
        Hub::set_current(hub.clone());

        let detached = DetachedHub::capture().expect("a hub is current on this thread");

        // Mutating the live hub's scope after the snapshot must not reach
        // the detached copy: the clone is deep, not a shared reference.
        hub.current_scope().set_tag("origin", "mutated-after-snapshot");

        let other_hub_thread = Arc::new(Hub::new(Arc::new(ClientInner {
            descriptor: EndpointDescriptor::parse("https://key@host/2").unwrap(),
            options: ClientOptions::new("https://key@host/2"),
            worker: Worker::new(transport.clone()),
        })));
        Hub::set_current(other_hub_thread.clone());

        {
            let _guard = detached.enter();
            let current = Hub::current().unwrap();
            assert!(!Arc::ptr_eq(&current, &other_hub_thread));
            current.capture_message("from detached hub", Level::Info);
            current.flush(Duration::from_secs(1));
        }

        // Leaving the guard's scope restores whatever was current before.
        assert!(Arc::ptr_eq(&Hub::current().unwrap(), &other_hub_thread));
        Hub::clear_current();

        let sent = transport.sent();
        let captured = sent
            .iter()
            .map(|b| String::from_utf8_lossy(b).into_owned())
            .find(|s| s.contains("\"message\""))
            .expect("the message event was delivered through the shared client");
        assert!(captured.contains("main-task"));
        assert!(!captured.contains("mutated-after-snapshot"));
    }
}
