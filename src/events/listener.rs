use std::fmt;
use std::rc::{Rc, Weak};

use serde_json::Value as JsonValue;

use super::event::Event;

type Callback = dyn Fn(&Event);

/// A callback handle whose identity, not its behaviour, decides equality.
///
/// Clones share identity, so a caller keeps a clone around to `off` it later.
/// Two listeners built from identical closures are still different listeners.
#[derive(Clone)]
pub struct Listener {
    callback: Rc<Callback>,
}

impl Listener {
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&Event) + 'static,
    {
        Self {
            callback: Rc::new(callback),
        }
    }

    /// Builds a listener that can see its own identity, used by self-removing wrappers.
    pub(crate) fn new_self_aware<F>(build: F) -> Self
    where
        F: FnOnce(WeakListener) -> Box<Callback>,
    {
        let callback: Rc<Callback> = Rc::new_cyclic(|weak: &Weak<Box<Callback>>| {
            build(WeakListener {
                callback: weak.clone(),
            })
        });
        Self { callback }
    }

    pub fn call(&self, event: &Event) {
        (self.callback)(event);
    }

    pub fn same_as(&self, other: &Listener) -> bool {
        std::ptr::addr_eq(Rc::as_ptr(&self.callback), Rc::as_ptr(&other.callback))
    }
}

impl PartialEq for Listener {
    fn eq(&self, other: &Self) -> bool {
        self.same_as(other)
    }
}

impl Eq for Listener {}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener")
            .field("ptr", &Rc::as_ptr(&self.callback).cast::<()>())
            .finish()
    }
}

/// Non-owning reference a listener holds to itself.
#[derive(Clone)]
pub(crate) struct WeakListener {
    callback: Weak<Box<Callback>>,
}

impl WeakListener {
    pub(crate) fn upgrade(&self) -> Option<Listener> {
        let callback: Rc<Callback> = self.callback.upgrade()?;
        Some(Listener { callback })
    }
}

/// One `(callback, data)` entry in a per-type listener list.
///
/// Self-removing wrappers remember the callback they were built from in
/// `original`, so the caller's handle still finds the entry.
#[derive(Debug, Clone)]
pub struct Registration {
    pub listener: Listener,
    pub data: Option<JsonValue>,
    original: Option<Listener>,
}

impl Registration {
    pub fn new(listener: Listener, data: Option<JsonValue>) -> Self {
        Self {
            listener,
            data,
            original: None,
        }
    }

    pub(crate) fn wrapping(wrapper: Listener, original: Listener, data: Option<JsonValue>) -> Self {
        Self {
            listener: wrapper,
            data,
            original: Some(original),
        }
    }

    /// The callback a wrapper was built from, if this entry is a wrapper.
    pub fn original(&self) -> Option<&Listener> {
        self.original.as_ref()
    }

    /// True when `listener` is either the stored callback or the one it wraps.
    pub fn matches(&self, listener: &Listener) -> bool {
        self.listener.same_as(listener)
            || self
                .original
                .as_ref()
                .is_some_and(|original| original.same_as(listener))
    }

    /// True when both entries would be called for the same callback.
    pub(crate) fn overlaps(&self, other: &Registration) -> bool {
        self.matches(&other.listener) || other.original.as_ref().is_some_and(|o| self.matches(o))
    }
}

/// Removes the entry matching `listener` from `store`.
pub(crate) fn remove_from_store(
    store: &mut Vec<Registration>,
    listener: &Listener,
) -> Option<Registration> {
    let index = store
        .iter()
        .position(|registration| registration.matches(listener))?;
    Some(store.remove(index))
}
