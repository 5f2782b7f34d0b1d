//! Abstractions over the host's native event system.
//!
//! The registry never talks to a concrete DOM. Hosts describe their elements
//! through [`NativeElement`] and their environment through [`NativeHost`];
//! native events travel as [`NativeEvent`] values whose properties are a JSON
//! map, the same shape a script engine bridge hands over.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use serde_json::{Map as JsonMap, Value as JsonValue};

pub type ElementRef = Rc<dyn NativeElement>;

/// Native-side callback installed on an element.
pub type NativeHandler = Rc<dyn Fn(&NativeEvent)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Window,
    Document,
    Element,
    Text,
    Other,
}

impl NodeKind {
    /// Only windows, documents and elements carry native listeners.
    pub fn accepts_listeners(self) -> bool {
        matches!(self, NodeKind::Window | NodeKind::Document | NodeKind::Element)
    }
}

/// Family of native listener primitives an element exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerApi {
    /// `addEventListener` / `removeEventListener`.
    Standard,
    /// `attachEvent` / `detachEvent`, which take `on`-prefixed type names.
    Legacy,
}

impl ListenerApi {
    pub fn native_type(self, event_type: &str) -> String {
        match self {
            ListenerApi::Standard => event_type.to_string(),
            ListenerApi::Legacy => format!("on{event_type}"),
        }
    }
}

/// Native event interface used when constructing an event for dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventCategory {
    Html,
    Ui,
}

pub trait NativeElement {
    fn node_kind(&self) -> NodeKind;

    fn attribute(&self, name: &str) -> Option<String>;

    fn set_attribute(&self, name: &str, value: &str);

    fn supports_listener_api(&self, api: ListenerApi) -> bool;

    /// `native_type` is already adjusted for `api`.
    fn add_listener(&self, api: ListenerApi, native_type: &str, handler: &NativeHandler);

    fn remove_listener(&self, api: ListenerApi, native_type: &str, handler: &NativeHandler);

    /// Runs the native dispatch and returns its result: `false` once a
    /// handler cancelled the event.
    fn dispatch_event(&self, event: &NativeEvent) -> bool;

    fn parent(&self) -> Option<ElementRef> {
        None
    }

    /// The element an SVG `use` instance stands for.
    fn corresponding_element(&self) -> Option<ElementRef> {
        None
    }

    /// Top-left corner of the element in page coordinates.
    fn page_position(&self) -> Option<(f64, f64)> {
        None
    }
}

pub trait NativeHost {
    /// Whether the environment only delivers touch input.
    fn supports_touch(&self) -> bool;

    /// Document scroll offset, added to client coordinates.
    fn scroll_offset(&self) -> (f64, f64) {
        (0.0, 0.0)
    }

    fn create_event(&self, category: EventCategory, event_type: &str) -> NativeEvent {
        NativeEvent::new(event_type)
            .with_category(category)
            .with_bubbles(true)
            .with_cancelable(true)
    }
}

/// Which cancellation primitives a native event object actually provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeSupport {
    pub prevent_default: bool,
    pub stop_propagation: bool,
    pub stop_immediate_propagation: bool,
}

impl NativeSupport {
    pub const STANDARD: Self = Self {
        prevent_default: true,
        stop_propagation: true,
        stop_immediate_propagation: true,
    };

    /// Old engines: only `returnValue` and `cancelBubble`.
    pub const LEGACY: Self = Self {
        prevent_default: false,
        stop_propagation: false,
        stop_immediate_propagation: false,
    };
}

impl Default for NativeSupport {
    fn default() -> Self {
        Self::STANDARD
    }
}

#[derive(Debug)]
struct NativeFlags {
    default_prevented: Cell<bool>,
    propagation_stopped: Cell<bool>,
    immediate_propagation_stopped: Cell<bool>,
    return_value: Cell<bool>,
    cancel_bubble: Cell<bool>,
}

impl Default for NativeFlags {
    fn default() -> Self {
        Self {
            default_prevented: Cell::new(false),
            propagation_stopped: Cell::new(false),
            immediate_propagation_stopped: Cell::new(false),
            return_value: Cell::new(true),
            cancel_bubble: Cell::new(false),
        }
    }
}

/// A native event as the host delivers it.
///
/// Clones share their cancellation flags, so a handler that prevents the
/// default on its copy is visible to the host that dispatched the original.
#[derive(Clone)]
pub struct NativeEvent {
    event_type: String,
    category: EventCategory,
    bubbles: bool,
    cancelable: bool,
    target: Option<ElementRef>,
    src_element: Option<ElementRef>,
    properties: JsonMap<String, JsonValue>,
    support: NativeSupport,
    flags: Rc<NativeFlags>,
}

impl NativeEvent {
    pub fn new(event_type: &str) -> Self {
        Self {
            event_type: event_type.to_string(),
            category: EventCategory::Ui,
            bubbles: false,
            cancelable: false,
            target: None,
            src_element: None,
            properties: JsonMap::new(),
            support: NativeSupport::STANDARD,
            flags: Rc::default(),
        }
    }

    pub fn with_category(mut self, category: EventCategory) -> Self {
        self.category = category;
        self
    }

    pub fn with_bubbles(mut self, bubbles: bool) -> Self {
        self.bubbles = bubbles;
        self
    }

    pub fn with_cancelable(mut self, cancelable: bool) -> Self {
        self.cancelable = cancelable;
        self
    }

    pub fn with_target(mut self, target: ElementRef) -> Self {
        self.target = Some(target);
        self
    }

    pub fn with_src_element(mut self, element: ElementRef) -> Self {
        self.src_element = Some(element);
        self
    }

    pub fn with_property(mut self, name: &str, value: JsonValue) -> Self {
        self.properties.insert(name.to_string(), value);
        self
    }

    pub fn with_support(mut self, support: NativeSupport) -> Self {
        self.support = support;
        self
    }

    pub fn set_property(&mut self, name: &str, value: JsonValue) {
        self.properties.insert(name.to_string(), value);
    }

    pub fn set_target(&mut self, target: ElementRef) {
        self.target = Some(target);
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn category(&self) -> EventCategory {
        self.category
    }

    pub fn bubbles(&self) -> bool {
        self.bubbles
    }

    pub fn cancelable(&self) -> bool {
        self.cancelable
    }

    pub fn target(&self) -> Option<&ElementRef> {
        self.target.as_ref()
    }

    pub fn src_element(&self) -> Option<&ElementRef> {
        self.src_element.as_ref()
    }

    pub fn property(&self, name: &str) -> Option<&JsonValue> {
        self.properties.get(name)
    }

    pub fn properties(&self) -> &JsonMap<String, JsonValue> {
        &self.properties
    }

    pub fn support(&self) -> NativeSupport {
        self.support
    }

    pub fn prevent_default(&self) {
        self.flags.default_prevented.set(true);
    }

    pub fn stop_propagation(&self) {
        self.flags.propagation_stopped.set(true);
    }

    pub fn stop_immediate_propagation(&self) {
        self.flags.propagation_stopped.set(true);
        self.flags.immediate_propagation_stopped.set(true);
    }

    pub fn set_return_value(&self, value: bool) {
        self.flags.return_value.set(value);
    }

    pub fn set_cancel_bubble(&self, value: bool) {
        self.flags.cancel_bubble.set(value);
    }

    pub fn return_value(&self) -> bool {
        self.flags.return_value.get()
    }

    pub fn cancel_bubble(&self) -> bool {
        self.flags.cancel_bubble.get()
    }

    pub fn default_prevented(&self) -> bool {
        self.flags.default_prevented.get()
    }

    pub fn propagation_stopped(&self) -> bool {
        self.flags.propagation_stopped.get()
    }

    pub fn immediate_propagation_stopped(&self) -> bool {
        self.flags.immediate_propagation_stopped.get()
    }

    /// Cancelled through either the standard or the legacy primitive.
    pub fn is_canceled(&self) -> bool {
        self.cancelable && (self.default_prevented() || !self.return_value())
    }
}

impl fmt::Debug for NativeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeEvent")
            .field("type", &self.event_type)
            .field("category", &self.category)
            .field("properties", &self.properties)
            .field("support", &self.support)
            .field("flags", &self.flags)
            .finish()
    }
}
