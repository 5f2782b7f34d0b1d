//! Native DOM event normalization.
//!
//! Engines disagree on where coordinates live, how buttons are numbered and
//! whether `preventDefault` exists at all. [`DomDetail`] copies a fixed
//! allow-list of native properties and derives a consistent view on top:
//!
//! * `key_code` falls back to `which` when `keyCode` is missing or zero.
//! * `right_click` is `which == 3` or `button == 2`.
//! * `left_click` is `which == 1` when the event carries a non-zero `which`;
//!   otherwise `button` is read in the numbering of the listener API that
//!   delivered the event (`0` for standard listeners, bit `1` for legacy ones).
//! * for pointer position events, the page position is taken from the first
//!   source that has a value: `pageX/Y`, `clientX/Y` plus the scroll offset,
//!   `offsetX/Y`, then the first touch point relative to the target.

use std::cell::OnceCell;
use std::fmt;
use std::rc::Rc;

use keyboard_types::Modifiers;
use serde_json::{Map as JsonMap, Value as JsonValue};

use super::native::{ElementRef, EventCategory, ListenerApi, NativeEvent, NodeKind};

/// Re-wraps a raw element before it is surfaced on an event.
pub type ElementWrapper = Rc<dyn Fn(ElementRef) -> ElementRef>;

/// Standard HTML event names; anything else is dispatched as a UI event.
pub const HTML_EVENTS: &[&str] = &[
    "click", "dblclick", "mouseup", "mousedown", "contextmenu", "mousewheel",
    "mousemultiwheel", "DOMMouseScroll", "mouseover", "mouseout", "mousemove",
    "selectstart", "selectend", "keydown", "keypress", "keyup", "orientationchange",
    "focus", "blur", "change", "reset", "select", "submit", "load", "unload",
    "beforeunload", "resize", "move", "DOMContentLoaded", "readystatechange",
    "message", "error", "abort", "scroll", "show", "input", "invalid", "touchstart",
    "touchmove", "touchend", "touchcancel", "gesturestart", "gesturechange",
    "gestureend", "textinput", "pageshow", "pagehide", "popstate", "hashchange",
    "offline", "online", "afterprint", "beforeprint", "dragstart", "dragenter",
    "dragover", "dragleave", "drag", "drop", "dragend", "loadstart", "progress",
    "suspend", "emptied", "stalled", "loadmetadata", "loadeddata", "canplay",
    "canplaythrough", "playing", "waiting", "seeking", "seeked", "ended",
    "durationchange", "timeupdate", "play", "pause", "ratechange", "volumechange",
    "cuechange", "checking", "noupdate", "downloading", "cached", "updateready",
    "obsolete",
];

/// Native properties copied onto every normalized event.
pub const EVENT_PROPS: &[&str] = &[
    "altKey", "attrChange", "attrName", "bubbles", "cancelable", "ctrlKey",
    "currentTarget", "detail", "eventPhase", "getModifierState", "isTrusted",
    "metaKey", "relatedNode", "relatedTarget", "shiftKey", "srcElement",
    "timeStamp", "view", "which", "propertyName", "button", "buttons", "clientX",
    "clientY", "dataTransfer", "clipboardData", "fromElement", "offsetX", "offsetY",
    "pageX", "pageY", "screenX", "screenY", "toElement", "wheelDelta", "wheelDeltaX",
    "wheelDeltaY", "wheelDeltaZ", "char", "charCode", "key", "keyCode",
    "keyIdentifier", "keyLocation", "location", "touches", "targetTouches",
    "changedTouches", "scale", "rotation", "data", "origin", "source", "state",
];

/// Events whose pointer position gets normalized.
pub const POSITION_EVENTS: &[&str] = &[
    "mousedown", "mouseup", "mousemove", "mouseover", "mouseout", "click",
    "dblclick", "contextmenu", "touchstart", "touchmove", "touchend",
];

const TOUCH_ALIASES: &[(&str, &str)] = &[
    ("mousedown", "touchstart"),
    ("mousemove", "touchmove"),
    ("mouseup", "touchend"),
];

pub fn event_category(event_type: &str, extra_html_events: &[String]) -> EventCategory {
    if HTML_EVENTS.contains(&event_type) || extra_html_events.iter().any(|e| e == event_type) {
        EventCategory::Html
    } else {
        EventCategory::Ui
    }
}

/// Maps mouse event names onto their touch equivalents on touch-only hosts.
pub fn resolve_event_type(event_type: &str, touch_only: bool) -> &str {
    if !touch_only {
        return event_type;
    }
    TOUCH_ALIASES
        .iter()
        .find(|(mouse, _)| *mouse == event_type)
        .map_or(event_type, |(_, touch)| *touch)
}

pub fn is_position_event(event_type: &str) -> bool {
    POSITION_EVENTS.contains(&event_type)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinateSource {
    Page,
    Client,
    Offset,
    Touch,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PagePosition {
    pub x: f64,
    pub y: f64,
    pub source: CoordinateSource,
}

/// What the registry knows about the listener that received a native event.
#[derive(Clone)]
pub struct NormalizeContext {
    pub api: ListenerApi,
    pub scroll_offset: (f64, f64),
    pub wrapper: Option<ElementWrapper>,
}

impl NormalizeContext {
    pub fn new(api: ListenerApi) -> Self {
        Self {
            api,
            scroll_offset: (0.0, 0.0),
            wrapper: None,
        }
    }
}

pub struct DomDetail {
    original: NativeEvent,
    event_type: String,
    target: Option<ElementRef>,
    wrapper: Option<ElementWrapper>,
    wrapped_target: OnceCell<Option<ElementRef>>,
    properties: JsonMap<String, JsonValue>,
    key_code: Option<i64>,
    left_click: bool,
    right_click: bool,
    position: Option<PagePosition>,
}

impl DomDetail {
    pub fn from_native(native: &NativeEvent, context: &NormalizeContext) -> Self {
        let target = resolve_target(native);

        let properties: JsonMap<String, JsonValue> = EVENT_PROPS
            .iter()
            .filter_map(|name| {
                native
                    .property(name)
                    .map(|value| (name.to_string(), value.clone()))
            })
            .collect();

        let which = integer(&properties, "which");
        let button = integer(&properties, "button");
        let key_code = integer(&properties, "keyCode")
            .filter(|code| *code != 0)
            .or(which);

        let position = if is_position_event(native.event_type()) {
            page_position(&properties, context.scroll_offset, target.as_ref())
        } else {
            None
        };

        Self {
            original: native.clone(),
            event_type: native.event_type().to_string(),
            target,
            wrapper: context.wrapper.clone(),
            wrapped_target: OnceCell::new(),
            key_code,
            left_click: left_click(which, button, context.api),
            right_click: which == Some(3) || button == Some(2),
            position,
            properties,
        }
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    /// The raw target after text-node and SVG instance fix-ups.
    pub fn target(&self) -> Option<&ElementRef> {
        self.target.as_ref()
    }

    pub(crate) fn wrapped_target(&self) -> Option<ElementRef> {
        self.wrapped_target
            .get_or_init(|| {
                let target = self.target.clone()?;
                Some(match &self.wrapper {
                    Some(wrap) => wrap(target),
                    None => target,
                })
            })
            .clone()
    }

    pub fn original(&self) -> &NativeEvent {
        &self.original
    }

    pub fn property(&self, name: &str) -> Option<&JsonValue> {
        self.properties.get(name)
    }

    pub fn properties(&self) -> &JsonMap<String, JsonValue> {
        &self.properties
    }

    pub fn key_code(&self) -> Option<i64> {
        self.key_code
    }

    pub fn which(&self) -> Option<i64> {
        integer(&self.properties, "which")
    }

    pub fn button(&self) -> Option<i64> {
        integer(&self.properties, "button")
    }

    pub fn key(&self) -> Option<&str> {
        self.properties.get("key").and_then(JsonValue::as_str)
    }

    pub fn left_click(&self) -> bool {
        self.left_click
    }

    pub fn right_click(&self) -> bool {
        self.right_click
    }

    pub fn position(&self) -> Option<PagePosition> {
        self.position
    }

    pub fn page_x(&self) -> Option<f64> {
        self.position.map(|p| p.x)
    }

    pub fn page_y(&self) -> Option<f64> {
        self.position.map(|p| p.y)
    }

    pub fn modifiers(&self) -> Modifiers {
        let mut mods = Modifiers::empty();
        mods.set(Modifiers::ALT, self.flag("altKey"));
        mods.set(Modifiers::CONTROL, self.flag("ctrlKey"));
        mods.set(Modifiers::META, self.flag("metaKey"));
        mods.set(Modifiers::SHIFT, self.flag("shiftKey"));
        mods
    }

    pub fn touches(&self) -> &[JsonValue] {
        self.list("touches")
    }

    pub fn changed_touches(&self) -> &[JsonValue] {
        self.list("changedTouches")
    }

    fn flag(&self, name: &str) -> bool {
        self.properties
            .get(name)
            .and_then(JsonValue::as_bool)
            .unwrap_or(false)
    }

    fn list(&self, name: &str) -> &[JsonValue] {
        self.properties
            .get(name)
            .and_then(JsonValue::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub(crate) fn prevent_default(&self) {
        if self.original.support().prevent_default {
            self.original.prevent_default();
        } else {
            self.original.set_return_value(false);
        }
    }

    pub(crate) fn stop_propagation(&self) {
        if self.original.support().stop_propagation {
            self.original.stop_propagation();
        } else {
            self.original.set_cancel_bubble(true);
        }
    }

    pub(crate) fn stop_immediate_propagation(&self) {
        if self.original.support().stop_immediate_propagation {
            self.original.stop_immediate_propagation();
        } else {
            self.stop_propagation();
        }
    }
}

impl fmt::Debug for DomDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DomDetail")
            .field("type", &self.event_type)
            .field("key_code", &self.key_code)
            .field("left_click", &self.left_click)
            .field("right_click", &self.right_click)
            .field("position", &self.position)
            .finish()
    }
}

fn resolve_target(native: &NativeEvent) -> Option<ElementRef> {
    let mut target = native
        .target()
        .or_else(|| native.src_element())
        .cloned()?;
    if target.node_kind() == NodeKind::Text {
        if let Some(parent) = target.parent() {
            target = parent;
        }
    }
    if let Some(corresponding) = target.corresponding_element() {
        target = corresponding;
    }
    Some(target)
}

fn left_click(which: Option<i64>, button: Option<i64>, api: ListenerApi) -> bool {
    match (which, button) {
        (Some(which), _) if which != 0 => which == 1,
        (_, Some(button)) => match api {
            ListenerApi::Standard => button == 0,
            ListenerApi::Legacy => button & 1 == 1,
        },
        _ => false,
    }
}

fn page_position(
    properties: &JsonMap<String, JsonValue>,
    scroll_offset: (f64, f64),
    target: Option<&ElementRef>,
) -> Option<PagePosition> {
    if let Some((x, y)) = pair(properties, "pageX", "pageY") {
        return Some(PagePosition {
            x,
            y,
            source: CoordinateSource::Page,
        });
    }
    if let Some((x, y)) = pair(properties, "clientX", "clientY") {
        return Some(PagePosition {
            x: x + scroll_offset.0,
            y: y + scroll_offset.1,
            source: CoordinateSource::Client,
        });
    }
    if let Some((x, y)) = pair(properties, "offsetX", "offsetY") {
        return Some(PagePosition {
            x,
            y,
            source: CoordinateSource::Offset,
        });
    }

    let touch = ["touches", "changedTouches"].iter().find_map(|list| {
        properties
            .get(*list)
            .and_then(JsonValue::as_array)
            .and_then(|touches| touches.first())
            .and_then(JsonValue::as_object)
    })?;
    let (x, y) = pair(touch, "pageX", "pageY")?;
    let (left, top) = target
        .and_then(|element| element.page_position())
        .unwrap_or((0.0, 0.0));
    Some(PagePosition {
        x: x - left,
        y: y - top,
        source: CoordinateSource::Touch,
    })
}

/// Both halves of a coordinate pair; a missing half reads as zero.
fn pair(map: &JsonMap<String, JsonValue>, x: &str, y: &str) -> Option<(f64, f64)> {
    let x = number(map, x);
    let y = number(map, y);
    if x.is_none() && y.is_none() {
        return None;
    }
    Some((x.unwrap_or(0.0), y.unwrap_or(0.0)))
}

fn number(map: &JsonMap<String, JsonValue>, name: &str) -> Option<f64> {
    map.get(name).and_then(JsonValue::as_f64)
}

fn integer(map: &JsonMap<String, JsonValue>, name: &str) -> Option<i64> {
    let value = map.get(name)?;
    value.as_i64().or_else(|| value.as_f64().map(|f| f as i64))
}
