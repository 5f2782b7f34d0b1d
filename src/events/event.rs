//! The uniform event value handed to every listener.
//!
//! An [`Event`] is built fresh for each dispatch pass and dropped once the
//! pass is over. Re-dispatching an event to another target goes through
//! [`Event::retarget`], which builds a new value instead of mutating the one
//! the caller holds.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::dom::native::ElementRef;
use crate::dom::normalize::DomDetail;

/// Stable identity of a plain (non-DOM) event target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TargetId(Uuid);

impl TargetId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TargetId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Whatever an event was dispatched on.
#[derive(Clone)]
pub enum EventTarget {
    Object(TargetId),
    Element(ElementRef),
}

impl EventTarget {
    pub fn object_id(&self) -> Option<TargetId> {
        match self {
            EventTarget::Object(id) => Some(*id),
            EventTarget::Element(_) => None,
        }
    }

    pub fn element(&self) -> Option<&ElementRef> {
        match self {
            EventTarget::Object(_) => None,
            EventTarget::Element(element) => Some(element),
        }
    }
}

impl PartialEq for EventTarget {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (EventTarget::Object(a), EventTarget::Object(b)) => a == b,
            (EventTarget::Element(a), EventTarget::Element(b)) => {
                std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b))
            }
            _ => false,
        }
    }
}

impl From<TargetId> for EventTarget {
    fn from(id: TargetId) -> Self {
        EventTarget::Object(id)
    }
}

impl fmt::Debug for EventTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventTarget::Object(id) => f.debug_tuple("Object").field(id).finish(),
            EventTarget::Element(element) => f
                .debug_tuple("Element")
                .field(&element.node_kind())
                .finish(),
        }
    }
}

pub struct Event {
    event_type: String,
    target: Option<EventTarget>,
    related_target: Option<EventTarget>,
    data: Option<JsonValue>,
    listener_data: RefCell<Option<JsonValue>>,
    stopped: Cell<bool>,
    default_prevented: Cell<bool>,
    dom: Option<DomDetail>,
}

impl Event {
    /// A custom event dispatched on a plain target.
    pub fn new(target: impl Into<EventTarget>, event_type: &str, data: Option<JsonValue>) -> Self {
        Self::build(event_type, Some(target.into()), None, data, None)
    }

    /// An event that has not been dispatched anywhere yet.
    pub fn detached(event_type: &str, data: Option<JsonValue>) -> Self {
        Self::build(event_type, None, None, data, None)
    }

    pub(crate) fn from_dom(detail: DomDetail, listener_data: Option<JsonValue>) -> Self {
        let data = detail.property("data").filter(|v| !v.is_null()).cloned();
        let target = detail.target().cloned().map(EventTarget::Element);
        let event_type = detail.event_type().to_string();
        let event = Self::build(&event_type, target, None, data, Some(detail));
        event.set_listener_data(listener_data);
        event
    }

    fn build(
        event_type: &str,
        target: Option<EventTarget>,
        related_target: Option<EventTarget>,
        data: Option<JsonValue>,
        dom: Option<DomDetail>,
    ) -> Self {
        Self {
            event_type: event_type.to_string(),
            target,
            related_target,
            data,
            listener_data: RefCell::new(None),
            stopped: Cell::new(false),
            default_prevented: Cell::new(false),
            dom,
        }
    }

    /// Copy of this event addressed to `target`, remembering the previous
    /// target as the related one.
    pub fn retarget(&self, target: impl Into<EventTarget>) -> Self {
        Self::build(
            &self.event_type,
            Some(target.into()),
            self.target.clone(),
            self.data.clone(),
            None,
        )
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn target(&self) -> Option<&EventTarget> {
        self.target.as_ref()
    }

    pub fn target_id(&self) -> Option<TargetId> {
        self.target.as_ref().and_then(EventTarget::object_id)
    }

    pub fn related_target(&self) -> Option<&EventTarget> {
        self.related_target.as_ref()
    }

    pub fn data(&self) -> Option<&JsonValue> {
        self.data.as_ref()
    }

    /// Data supplied when the currently running listener was registered.
    pub fn listener_data(&self) -> Option<JsonValue> {
        self.listener_data.borrow().clone()
    }

    pub(crate) fn set_listener_data(&self, data: Option<JsonValue>) {
        *self.listener_data.borrow_mut() = data;
    }

    /// Normalized native details, present for events coming from a DOM element.
    pub fn dom(&self) -> Option<&DomDetail> {
        self.dom.as_ref()
    }

    /// The DOM target after the registry's element wrapper has been applied.
    pub fn dom_target(&self) -> Option<ElementRef> {
        self.dom.as_ref().and_then(DomDetail::wrapped_target)
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.get()
    }

    pub fn is_default_prevented(&self) -> bool {
        self.default_prevented.get()
    }

    pub fn prevent_default(&self) {
        self.default_prevented.set(true);
        if let Some(dom) = &self.dom {
            dom.prevent_default();
        }
    }

    pub fn stop_propagation(&self) {
        if let Some(dom) = &self.dom {
            dom.stop_propagation();
        }
    }

    /// Stops native propagation and keeps the remaining listeners of this pass from running.
    pub fn stop_immediate_propagation(&self) {
        if let Some(dom) = &self.dom {
            dom.stop_immediate_propagation();
        }
        self.stopped.set(true);
    }

    pub fn stop(&self) {
        self.prevent_default();
        self.stop_immediate_propagation();
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("type", &self.event_type)
            .field("target", &self.target)
            .field("related_target", &self.related_target)
            .field("data", &self.data)
            .field("stopped", &self.stopped.get())
            .field("dom", &self.dom.is_some())
            .finish()
    }
}
