//! Registration and dispatch for plain targets.
//!
//! Every operation returns the target it was given so calls can be chained,
//! and none of them fail: an empty event type or an unknown listener simply
//! does nothing. [`trigger`] reports `false` when no list exists for the type.

use serde_json::Value as JsonValue;
use tracing::{debug, trace};

use super::event::Event;
use super::listener::{Listener, Registration};
use super::store::ListenerStore;

/// Capability of being an event source.
///
/// A type opts in by exposing the [`ListenerStore`] it embeds; the remaining
/// methods forward to the free functions of this module with the target fixed
/// to `self`.
pub trait Dispatch {
    fn listeners(&self) -> &ListenerStore;

    fn on(&self, event_type: &str, listener: &Listener) -> &Self {
        on(self, event_type, listener)
    }

    fn on_with(&self, event_type: &str, listener: &Listener, data: JsonValue) -> &Self {
        on_with(self, event_type, listener, data)
    }

    fn once(&self, event_type: &str, listener: &Listener) -> &Self {
        once(self, event_type, listener)
    }

    fn once_with(&self, event_type: &str, listener: &Listener, data: JsonValue) -> &Self {
        once_with(self, event_type, listener, data)
    }

    fn one(&self, event_type: &str, listener: &Listener) -> &Self {
        once(self, event_type, listener)
    }

    fn off(&self, event_type: &str, listener: &Listener) -> &Self {
        off(self, event_type, listener)
    }

    fn off_all(&self) -> &Self {
        off_all(self)
    }

    fn trigger(&self, event_type: &str, data: Option<JsonValue>) -> bool {
        trigger(self, event_type, data)
    }

    fn trigger_event(&self, event: &Event) -> bool {
        trigger_event(self, event)
    }
}

impl Dispatch for ListenerStore {
    fn listeners(&self) -> &ListenerStore {
        self
    }
}

/// Application-owned shared event source.
///
/// Stands in wherever a process-wide "central" dispatcher would otherwise be
/// used; hand clones of it to whoever needs to publish or subscribe.
#[derive(Clone, Default)]
pub struct EventBus {
    listeners: ListenerStore,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Dispatch for EventBus {
    fn listeners(&self) -> &ListenerStore {
        &self.listeners
    }
}

pub fn on<'a, T>(target: &'a T, event_type: &str, listener: &Listener) -> &'a T
where
    T: Dispatch + ?Sized,
{
    register(target, event_type, listener.clone(), None)
}

/// Like [`on`], attaching `data` to the registration. Listeners read it back
/// through [`Event::listener_data`].
pub fn on_with<'a, T>(target: &'a T, event_type: &str, listener: &Listener, data: JsonValue) -> &'a T
where
    T: Dispatch + ?Sized,
{
    register(target, event_type, listener.clone(), Some(data))
}

/// Registers a listener that removes itself before its first invocation.
pub fn once<'a, T>(target: &'a T, event_type: &str, listener: &Listener) -> &'a T
where
    T: Dispatch + ?Sized,
{
    once_with_data(target, event_type, listener, None)
}

/// Like [`once`], attaching `data` to the registration.
pub fn once_with<'a, T>(
    target: &'a T,
    event_type: &str,
    listener: &Listener,
    data: JsonValue,
) -> &'a T
where
    T: Dispatch + ?Sized,
{
    once_with_data(target, event_type, listener, Some(data))
}

fn once_with_data<'a, T>(
    target: &'a T,
    event_type: &str,
    listener: &Listener,
    data: Option<JsonValue>,
) -> &'a T
where
    T: Dispatch + ?Sized,
{
    if event_type.is_empty() {
        return target;
    }

    let store = target.listeners().downgrade();
    let delegate = listener.clone();
    let owned_type = event_type.to_string();
    let wrapper = Listener::new_self_aware(move |me| {
        Box::new(move |event: &Event| {
            // Unregister first so a panicking delegate still runs only once.
            if let (Some(store), Some(me)) = (store.upgrade(), me.upgrade()) {
                store.unregister(&owned_type, &me);
            }
            delegate.call(event);
        })
    });

    insert(
        target,
        event_type,
        Registration::wrapping(wrapper, listener.clone(), data),
    )
}

fn register<'a, T>(
    target: &'a T,
    event_type: &str,
    listener: Listener,
    data: Option<JsonValue>,
) -> &'a T
where
    T: Dispatch + ?Sized,
{
    insert(target, event_type, Registration::new(listener, data))
}

fn insert<'a, T>(target: &'a T, event_type: &str, registration: Registration) -> &'a T
where
    T: Dispatch + ?Sized,
{
    if event_type.is_empty() {
        return target;
    }
    let store = target.listeners();
    if store.insert(event_type, registration) {
        trace!(target = "events", target_id = %store.id(), event_type, "listener registered");
    }
    target
}

pub fn off<'a, T>(target: &'a T, event_type: &str, listener: &Listener) -> &'a T
where
    T: Dispatch + ?Sized,
{
    let store = target.listeners();
    if store.unregister(event_type, listener) {
        trace!(target = "events", target_id = %store.id(), event_type, "listener removed");
    }
    target
}

pub fn off_all<T>(target: &T) -> &T
where
    T: Dispatch + ?Sized,
{
    let store = target.listeners();
    if store.has_handlers() {
        debug!(
            target = "events",
            target_id = %store.id(),
            removed = store.total_listener_count(),
            "clearing all listeners"
        );
    }
    store.clear();
    target
}

/// Dispatches `event_type` with optional `data` to the target's listeners.
///
/// Returns `false` when no listener list exists for the type.
pub fn trigger<T>(target: &T, event_type: &str, data: Option<JsonValue>) -> bool
where
    T: Dispatch + ?Sized,
{
    let store = target.listeners();
    let event = Event::new(store.id(), event_type, data);
    dispatch(store, &event)
}

/// Re-dispatches an existing event on `target`.
///
/// Listeners receive a copy whose target is this target and whose related
/// target is the one the event carried before.
pub fn trigger_event<T>(target: &T, event: &Event) -> bool
where
    T: Dispatch + ?Sized,
{
    let store = target.listeners();
    let forwarded = event.retarget(store.id());
    dispatch(store, &forwarded)
}

fn dispatch(store: &ListenerStore, event: &Event) -> bool {
    let event_type = event.event_type();
    let Some(snapshot) = store.snapshot(event_type) else {
        trace!(target = "events", target_id = %store.id(), event_type, "no listeners for event");
        return false;
    };

    for registration in &snapshot {
        event.set_listener_data(registration.data.clone());
        registration.listener.call(event);
        if event.is_stopped() {
            debug!(target = "events", target_id = %store.id(), event_type, "event stopped");
            break;
        }
    }
    event.set_listener_data(None);
    true
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    use serde_json::json;

    use super::*;

    #[test]
    fn empty_event_type_is_ignored() {
        let bus = EventBus::new();
        bus.on("", &Listener::new(|_| {}));
        assert!(!bus.listeners().has_handlers());
    }

    #[test]
    fn trigger_without_listeners_returns_false() {
        let bus = EventBus::new();
        assert!(!bus.trigger("hey", None));
    }

    #[test]
    fn trigger_passes_type_and_data() {
        let bus = EventBus::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = Rc::clone(&seen);
        bus.on(
            "hey",
            &Listener::new(move |event| {
                seen_clone
                    .borrow_mut()
                    .push((event.event_type().to_string(), event.data().cloned()));
            }),
        );

        assert!(bus.trigger("hey", Some(json!("ho"))));
        assert_eq!(
            *seen.borrow(),
            vec![("hey".to_string(), Some(json!("ho")))]
        );
    }

    #[test]
    fn listener_data_follows_each_registration() {
        let bus = EventBus::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        for tag in ["first", "second"] {
            let seen = Rc::clone(&seen);
            bus.on_with(
                "hey",
                &Listener::new(move |event| seen.borrow_mut().push(event.listener_data())),
                json!(tag),
            );
        }

        bus.trigger("hey", None);
        assert_eq!(
            *seen.borrow(),
            vec![Some(json!("first")), Some(json!("second"))]
        );
    }

    #[test]
    fn once_is_one_shot() {
        let bus = EventBus::new();
        let count = Rc::new(Cell::new(0));
        let count_clone = Rc::clone(&count);
        bus.one("hey", &Listener::new(move |_| count_clone.set(count_clone.get() + 1)));

        assert!(bus.trigger("hey", None));
        assert!(bus.trigger("hey", None));
        assert_eq!(count.get(), 1);
        assert_eq!(bus.listeners().listener_count("hey"), 0);
    }

    #[test]
    fn stop_skips_remaining_listeners() {
        let bus = EventBus::new();
        let second_ran = Rc::new(Cell::new(false));
        let flag = Rc::clone(&second_ran);
        bus.on("hey", &Listener::new(|event| event.stop()))
            .on("hey", &Listener::new(move |_| flag.set(true)));

        assert!(bus.trigger("hey", None));
        assert!(!second_ran.get());
    }

    #[test]
    fn off_all_empties_every_type() {
        let bus = EventBus::new();
        bus.on("hey", &Listener::new(|_| {}))
            .on("ho", &Listener::new(|_| {}))
            .off_all();
        assert!(!bus.trigger("hey", None));
        assert!(!bus.trigger("ho", None));
        assert_eq!(bus.listeners().total_listener_count(), 0);
    }

    #[test]
    fn once_with_hands_data_to_its_single_run() {
        let bus = EventBus::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = Rc::clone(&seen);
        bus.once_with(
            "hey",
            &Listener::new(move |event| seen_clone.borrow_mut().push(event.listener_data())),
            json!({ "slot": 2 }),
        );

        bus.trigger("hey", None);
        bus.trigger("hey", None);
        assert_eq!(*seen.borrow(), vec![Some(json!({ "slot": 2 }))]);
        assert!(!bus.listeners().has_listeners("hey"));
    }

    #[test]
    fn repeated_once_keeps_one_pending_entry() {
        let bus = EventBus::new();
        let count = Rc::new(Cell::new(0));
        let count_clone = Rc::clone(&count);
        let listener = Listener::new(move |_| count_clone.set(count_clone.get() + 1));
        bus.once("hey", &listener).once("hey", &listener).on("hey", &listener);

        assert_eq!(bus.listeners().listener_count("hey"), 1);
        bus.trigger("hey", None);
        bus.trigger("hey", None);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn off_with_the_original_cancels_a_pending_once() {
        let bus = EventBus::new();
        let count = Rc::new(Cell::new(0));
        let count_clone = Rc::clone(&count);
        let listener = Listener::new(move |_| count_clone.set(count_clone.get() + 1));
        bus.once("hey", &listener).off("hey", &listener);

        assert_eq!(bus.listeners().listener_count("hey"), 0);
        bus.trigger("hey", None);
        assert_eq!(count.get(), 0);
    }
}
