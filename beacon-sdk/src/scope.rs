//! Mutable, thread-safe contextual state applied to every outgoing event.
//! All owned data lives behind one mutex, held for the duration of each
//! mutator and of [`Scope::apply`]; the enriched event is then built and
//! handed back so the caller can keep working with it lock-free.

use crate::model::{Attachment, BreadcrumbRing, Breadcrumb, Dynamic, Event, User};
use beacon_api::Level;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

/// An event processor inspects (and may mutate) an event after scope
/// enrichment. Returning `false` drops the event; processors run in
/// insertion order and the first `false` short-circuits the rest.
pub type EventProcessor = Arc<dyn Fn(&mut Event) -> bool + Send + Sync>;

#[derive(Clone)]
struct Inner {
    user: Option<User>,
    tags: BTreeMap<String, String>,
    extras: BTreeMap<String, Dynamic>,
    contexts: BTreeMap<String, Dynamic>,
    breadcrumbs: BreadcrumbRing,
    fingerprint: Option<Vec<String>>,
    level: Option<Level>,
    transaction: Option<String>,
    processors: Vec<EventProcessor>,
    attachments: Vec<Attachment>,
}

impl Inner {
    fn new(max_breadcrumbs: usize) -> Self {
        Inner {
            user: None,
            tags: BTreeMap::new(),
            extras: BTreeMap::new(),
            contexts: BTreeMap::new(),
            breadcrumbs: BreadcrumbRing::new(max_breadcrumbs),
            fingerprint: None,
            level: None,
            transaction: None,
            processors: Vec::new(),
            attachments: Vec::new(),
        }
    }
}

pub struct Scope {
    inner: Mutex<Inner>,
}

impl Scope {
    pub fn new(max_breadcrumbs: usize) -> Self {
        Scope { inner: Mutex::new(Inner::new(max_breadcrumbs)) }
    }

    pub fn set_user(&self, user: Option<User>) {
        self.inner.lock().unwrap().user = user;
    }

    pub fn set_tag(&self, key: impl Into<String>, value: impl Into<String>) {
        self.inner.lock().unwrap().tags.insert(key.into(), value.into());
    }

    pub fn remove_tag(&self, key: &str) {
        self.inner.lock().unwrap().tags.remove(key);
    }

    pub fn set_extra(&self, key: impl Into<String>, value: Dynamic) {
        self.inner.lock().unwrap().extras.insert(key.into(), value);
    }

    pub fn set_context(&self, key: impl Into<String>, value: Dynamic) {
        self.inner.lock().unwrap().contexts.insert(key.into(), value);
    }

    pub fn set_level(&self, level: Option<Level>) {
        self.inner.lock().unwrap().level = level;
    }

    pub fn set_transaction(&self, name: Option<String>) {
        self.inner.lock().unwrap().transaction = name;
    }

    pub fn set_fingerprint(&self, fingerprint: Option<Vec<String>>) {
        self.inner.lock().unwrap().fingerprint = fingerprint;
    }

    pub fn add_event_processor(&self, processor: EventProcessor) {
        self.inner.lock().unwrap().processors.push(processor);
    }

    /// Store a breadcrumb that has already passed `before_breadcrumb`.
    pub fn add_breadcrumb(&self, breadcrumb: Breadcrumb) {
        self.inner.lock().unwrap().breadcrumbs.push(breadcrumb);
    }

    /// Attach a byte payload, owned by the scope until the next flush
    /// drains it into an envelope alongside the event it rides with.
    pub fn add_attachment(&self, attachment: Attachment) {
        self.inner.lock().unwrap().attachments.push(attachment);
    }

    /// Drain and return every attachment accumulated since the last drain.
    pub fn take_attachments(&self) -> Vec<Attachment> {
        std::mem::take(&mut self.inner.lock().unwrap().attachments)
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock().unwrap();
        let max_breadcrumbs = inner.breadcrumbs.capacity();
        *inner = Inner::new(max_breadcrumbs);
    }

    /// Deep copy of all owned state into a brand new scope.
    pub fn clone_scope(&self) -> Scope {
        let inner = self.inner.lock().unwrap().clone();
        Scope { inner: Mutex::new(inner) }
    }

    /// Copy the scope's owned state onto `event`. Does not mutate the scope;
    /// the event and scope continue to own disjoint memory afterward.
    /// Returns the list of event processors to run next, still under the
    /// scope's authority but cheap to clone (`Arc`) so the lock can be
    /// released before they run.
    pub fn apply(&self, event: &mut Event) -> Vec<EventProcessor> {
        let inner = self.inner.lock().unwrap();

        if event.user.is_none() {
            event.user = inner.user.clone();
        }
        for (k, v) in &inner.tags {
            event.tags.entry(k.clone()).or_insert_with(|| v.clone());
        }
        for (k, v) in &inner.extras {
            event.extra.entry(k.clone()).or_insert_with(|| v.clone());
        }
        for (k, v) in &inner.contexts {
            event.contexts.entry(k.clone()).or_insert_with(|| v.clone());
        }
        if let Some(level) = inner.level {
            event.level = level;
        }
        if event.transaction.is_none() {
            event.transaction = inner.transaction.clone();
        }
        if event.fingerprint.is_none() {
            event.fingerprint = inner.fingerprint.clone();
        }
        if event.breadcrumbs.is_empty() {
            event.breadcrumbs = inner.breadcrumbs.snapshot();
        }

        inner.processors.clone()
    }

    pub fn breadcrumb_snapshot(&self) -> Vec<Breadcrumb> {
        self.inner.lock().unwrap().breadcrumbs.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beacon_api::Level;

    #[test]
    fn apply_enriches_without_mutating_the_scope() {
        let scope = Scope::new(100);
        scope.set_tag("env", "prod");
        scope.set_user(Some(User { id: Some("42".to_string()), ..Default::default() }));

        let mut event = Event::new(Level::Info);
        scope.apply(&mut event);

        assert_eq!(event.tags.get("env"), Some(&"prod".to_string()));
        assert_eq!(event.user.as_ref().unwrap().id.as_deref(), Some("42"));

        // Scope state is unchanged: applying again to a fresh event gives
        // the same result.
        let mut second = Event::new(Level::Info);
        scope.apply(&mut second);
        assert_eq!(second.tags.get("env"), Some(&"prod".to_string()));
    }

    #[test]
    fn clone_scope_is_a_deep_copy() {
        let scope = Scope::new(100);
        scope.set_tag("k", "v");
        let clone = scope.clone_scope();
        clone.set_tag("k", "changed");

        let mut original_event = Event::new(Level::Info);
        scope.apply(&mut original_event);
        assert_eq!(original_event.tags.get("k"), Some(&"v".to_string()));
    }

    #[test]
    fn remove_tag_removes_it() {
        let scope = Scope::new(100);
        scope.set_tag("k", "v");
        scope.remove_tag("k");
        let mut event = Event::new(Level::Info);
        scope.apply(&mut event);
        assert!(event.tags.get("k").is_none());
    }

    #[test]
    fn take_attachments_drains_and_is_idempotent() {
        let scope = Scope::new(100);
        scope.add_attachment(Attachment::new("log.txt", b"hello".to_vec()));
        scope.add_attachment(Attachment::new("dump.bin", vec![1, 2, 3]));

        let drained = scope.take_attachments();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].filename, "log.txt");

        assert!(scope.take_attachments().is_empty());
    }

    #[test]
    fn clear_drops_all_owned_state() {
        let scope = Scope::new(50);
        scope.set_tag("k", "v");
        scope.add_breadcrumb(Breadcrumb::new("hi"));
        scope.clear();
        assert!(scope.breadcrumb_snapshot().is_empty());
        let mut event = Event::new(Level::Info);
        scope.apply(&mut event);
        assert!(event.tags.is_empty());
    }
}
