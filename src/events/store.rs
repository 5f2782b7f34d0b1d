use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use serde_json::Value as JsonValue;
use tracing::trace;

use super::event::TargetId;
use super::listener::{remove_from_store, Listener, Registration};

type Handlers = HashMap<String, Vec<Registration>>;

/// Per-target listener bookkeeping for plain objects.
///
/// The store is a cheap handle: clones refer to the same handlers mapping and
/// share one [`TargetId`]. The mapping itself is only allocated on the first
/// registration. No borrow is ever held while a listener runs, so listeners
/// may freely register or unregister on the store that is dispatching them.
#[derive(Clone, Default)]
pub struct ListenerStore {
    inner: Rc<StoreInner>,
}

#[derive(Default)]
struct StoreInner {
    id: TargetId,
    handlers: RefCell<Option<Handlers>>,
}

impl ListenerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(&self) -> TargetId {
        self.inner.id
    }

    /// Adds `listener` for `event_type` unless that exact listener is already present.
    ///
    /// Returns whether a new registration was stored.
    pub fn register(&self, event_type: &str, listener: Listener, data: Option<JsonValue>) -> bool {
        self.insert(event_type, Registration::new(listener, data))
    }

    /// Stores `registration` unless an entry for the same callback exists,
    /// counting a wrapper and the callback it wraps as the same.
    pub(crate) fn insert(&self, event_type: &str, registration: Registration) -> bool {
        let mut handlers = self.inner.handlers.borrow_mut();
        let list = handlers
            .get_or_insert_with(HashMap::new)
            .entry(event_type.to_string())
            .or_default();
        if list.iter().any(|existing| existing.overlaps(&registration)) {
            trace!(target = "events", target_id = %self.id(), event_type, "listener already registered");
            return false;
        }
        list.push(registration);
        true
    }

    /// Removes `listener` from `event_type`. Returns whether anything was removed.
    pub fn unregister(&self, event_type: &str, listener: &Listener) -> bool {
        let mut handlers = self.inner.handlers.borrow_mut();
        let Some(list) = handlers.as_mut().and_then(|h| h.get_mut(event_type)) else {
            return false;
        };
        remove_from_store(list, listener).is_some()
    }

    /// Drops the whole handlers mapping.
    pub fn clear(&self) {
        self.inner.handlers.borrow_mut().take();
    }

    /// Copy of the listener list for `event_type`, detached from later mutation.
    ///
    /// `None` when the type was never registered; an emptied list is still `Some`.
    pub fn snapshot(&self, event_type: &str) -> Option<Vec<Registration>> {
        self.inner
            .handlers
            .borrow()
            .as_ref()
            .and_then(|h| h.get(event_type))
            .cloned()
    }

    pub fn has_handlers(&self) -> bool {
        self.inner.handlers.borrow().is_some()
    }

    pub fn has_listeners(&self, event_type: &str) -> bool {
        self.listener_count(event_type) > 0
    }

    pub fn listener_count(&self, event_type: &str) -> usize {
        self.inner
            .handlers
            .borrow()
            .as_ref()
            .and_then(|h| h.get(event_type))
            .map_or(0, Vec::len)
    }

    pub fn total_listener_count(&self) -> usize {
        self.inner
            .handlers
            .borrow()
            .as_ref()
            .map_or(0, |h| h.values().map(Vec::len).sum())
    }

    /// Event types that currently have a list, sorted.
    pub fn event_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self
            .inner
            .handlers
            .borrow()
            .as_ref()
            .map(|h| h.keys().cloned().collect())
            .unwrap_or_default();
        types.sort();
        types
    }

    pub(crate) fn downgrade(&self) -> WeakListenerStore {
        WeakListenerStore {
            inner: Rc::downgrade(&self.inner),
        }
    }
}

#[derive(Clone)]
pub(crate) struct WeakListenerStore {
    inner: Weak<StoreInner>,
}

impl WeakListenerStore {
    pub(crate) fn upgrade(&self) -> Option<ListenerStore> {
        self.inner.upgrade().map(|inner| ListenerStore { inner })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handlers_are_created_lazily() {
        let store = ListenerStore::new();
        assert!(!store.has_handlers());
        store.register("hey", Listener::new(|_| {}), None);
        assert!(store.has_handlers());
        assert_eq!(store.event_types(), vec!["hey".to_string()]);
    }

    #[test]
    fn stores_multiple_callbacks_by_type() {
        let store = ListenerStore::new();
        store.register("hey", Listener::new(|_| {}), None);
        store.register("hey", Listener::new(|_| {}), None);
        assert_eq!(store.listener_count("hey"), 2);
    }

    #[test]
    fn rejects_repeat_registrations() {
        let store = ListenerStore::new();
        let listener = Listener::new(|_| {});
        assert!(store.register("hey", listener.clone(), None));
        assert!(!store.register("hey", listener, None));
        assert_eq!(store.listener_count("hey"), 1);
    }

    #[test]
    fn unregister_leaves_an_empty_list() {
        let store = ListenerStore::new();
        let listener = Listener::new(|_| {});
        store.register("hey", listener.clone(), None);
        assert!(store.unregister("hey", &listener));
        assert_eq!(store.listener_count("hey"), 0);
        assert_eq!(store.snapshot("hey").map(|list| list.len()), Some(0));
    }

    #[test]
    fn unregister_on_empty_store_is_noop() {
        let store = ListenerStore::new();
        assert!(!store.unregister("hey", &Listener::new(|_| {})));
        assert!(!store.has_handlers());
    }

    #[test]
    fn clones_share_state_and_identity() {
        let store = ListenerStore::new();
        let clone = store.clone();
        clone.register("hey", Listener::new(|_| {}), None);
        assert_eq!(store.id(), clone.id());
        assert_eq!(store.total_listener_count(), 1);
        store.clear();
        assert_eq!(clone.total_listener_count(), 0);
        assert!(clone.snapshot("hey").is_none());
    }

    #[test]
    fn registration_data_is_kept() {
        let store = ListenerStore::new();
        store.register("hey", Listener::new(|_| {}), Some(serde_json::json!({ "n": 1 })));
        let snapshot = store.snapshot("hey").unwrap();
        assert_eq!(snapshot[0].data, Some(serde_json::json!({ "n": 1 })));
    }

    #[test]
    fn wrapper_and_its_original_count_as_one_registration() {
        let store = ListenerStore::new();
        let original = Listener::new(|_| {});
        let wrapper = Listener::new(|_| {});
        assert!(store.insert("hey", Registration::wrapping(wrapper.clone(), original.clone(), None)));
        assert!(!store.register("hey", original.clone(), None));
        assert!(!store.insert("hey", Registration::wrapping(Listener::new(|_| {}), original.clone(), None)));
        assert!(store.has_listeners("hey"));

        assert!(store.unregister("hey", &original));
        assert!(!store.has_listeners("hey"));
        assert!(!store.has_listeners("ho"));
    }
}
