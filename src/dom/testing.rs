//! In-memory host used by unit tests.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use super::native::{
    ElementRef, ListenerApi, NativeElement, NativeEvent, NativeHandler, NativeHost, NodeKind,
};

pub(crate) struct FakeElement {
    kind: NodeKind,
    legacy_only: bool,
    attributes: RefCell<HashMap<String, String>>,
    listeners: RefCell<Vec<(ListenerApi, String, NativeHandler)>>,
    parent: Option<ElementRef>,
    page_position: Cell<Option<(f64, f64)>>,
    self_ref: RefCell<Option<std::rc::Weak<FakeElement>>>,
}

impl FakeElement {
    fn build(kind: NodeKind, legacy_only: bool, parent: Option<ElementRef>) -> Rc<Self> {
        let element = Rc::new(Self {
            kind,
            legacy_only,
            attributes: RefCell::default(),
            listeners: RefCell::default(),
            parent,
            page_position: Cell::new(None),
            self_ref: RefCell::new(None),
        });
        *element.self_ref.borrow_mut() = Some(Rc::downgrade(&element));
        element
    }

    pub(crate) fn element() -> Rc<Self> {
        Self::build(NodeKind::Element, false, None)
    }

    pub(crate) fn legacy_element() -> Rc<Self> {
        Self::build(NodeKind::Element, true, None)
    }

    pub(crate) fn text(parent: ElementRef) -> Rc<Self> {
        Self::build(NodeKind::Text, false, Some(parent))
    }

    pub(crate) fn set_page_position(&self, left: f64, top: f64) {
        self.page_position.set(Some((left, top)));
    }

    pub(crate) fn native_listeners(&self) -> Vec<(ListenerApi, String)> {
        self.listeners
            .borrow()
            .iter()
            .map(|(api, name, _)| (*api, name.clone()))
            .collect()
    }
}

impl NativeElement for FakeElement {
    fn node_kind(&self) -> NodeKind {
        self.kind
    }

    fn attribute(&self, name: &str) -> Option<String> {
        self.attributes.borrow().get(name).cloned()
    }

    fn set_attribute(&self, name: &str, value: &str) {
        self.attributes
            .borrow_mut()
            .insert(name.to_string(), value.to_string());
    }

    fn supports_listener_api(&self, api: ListenerApi) -> bool {
        match api {
            ListenerApi::Standard => !self.legacy_only,
            ListenerApi::Legacy => true,
        }
    }

    fn add_listener(&self, api: ListenerApi, native_type: &str, handler: &NativeHandler) {
        self.listeners
            .borrow_mut()
            .push((api, native_type.to_string(), Rc::clone(handler)));
    }

    fn remove_listener(&self, api: ListenerApi, native_type: &str, handler: &NativeHandler) {
        self.listeners.borrow_mut().retain(|(a, name, h)| {
            !(*a == api && name == native_type && Rc::ptr_eq(h, handler))
        });
    }

    fn dispatch_event(&self, event: &NativeEvent) -> bool {
        let mut event = event.clone();
        if event.target().is_none() {
            if let Some(me) = self.self_ref.borrow().as_ref().and_then(|w| w.upgrade()) {
                event.set_target(me);
            }
        }
        let standard = event.event_type().to_string();
        let legacy = ListenerApi::Legacy.native_type(&standard);
        let handlers: Vec<NativeHandler> = self
            .listeners
            .borrow()
            .iter()
            .filter(|(api, name, _)| match api {
                ListenerApi::Standard => *name == standard,
                ListenerApi::Legacy => *name == legacy,
            })
            .map(|(_, _, handler)| Rc::clone(handler))
            .collect();
        for handler in handlers {
            handler(&event);
            if event.immediate_propagation_stopped() {
                break;
            }
        }
        !event.is_canceled()
    }

    fn parent(&self) -> Option<ElementRef> {
        self.parent.clone()
    }

    fn page_position(&self) -> Option<(f64, f64)> {
        self.page_position.get()
    }
}

pub(crate) struct FakeHost {
    pub(crate) touch: bool,
    pub(crate) scroll: (f64, f64),
}

impl FakeHost {
    pub(crate) fn desktop() -> Rc<Self> {
        Rc::new(Self {
            touch: false,
            scroll: (0.0, 0.0),
        })
    }
}

impl NativeHost for FakeHost {
    fn supports_touch(&self) -> bool {
        self.touch
    }

    fn scroll_offset(&self) -> (f64, f64) {
        self.scroll
    }
}
