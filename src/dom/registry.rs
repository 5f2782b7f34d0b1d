use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::Value as JsonValue;
use tracing::{debug, trace};

use super::native::{
    ElementRef, ListenerApi, NativeElement, NativeEvent, NativeHandler, NativeHost,
};
use super::normalize::{
    event_category, resolve_event_type, DomDetail, ElementWrapper, NormalizeContext,
};
use crate::config::EventsConfig;
use crate::events::{Event, Listener};

struct DomRegistration {
    listener: Listener,
    original: Option<Listener>,
    handler: NativeHandler,
    api: ListenerApi,
}

impl DomRegistration {
    fn matches(&self, listener: &Listener) -> bool {
        self.listener.same_as(listener)
            || self
                .original
                .as_ref()
                .is_some_and(|original| original.same_as(listener))
    }
}

type TypeStore = HashMap<String, Vec<DomRegistration>>;

/// Ids are unique across registries so one element carries one tag value.
static NEXT_ELEMENT_ID: AtomicU64 = AtomicU64::new(1);

struct ElementRecord {
    element: Weak<dyn NativeElement>,
    types: TypeStore,
}

impl ElementRecord {
    fn is(&self, element: &ElementRef) -> bool {
        self.element
            .upgrade()
            .is_some_and(|own| std::ptr::addr_eq(Rc::as_ptr(&own), Rc::as_ptr(element)))
    }
}

/// Listener bookkeeping for DOM elements.
///
/// Native elements cannot carry arbitrary data, so each element that gets a
/// listener is tagged with a numeric id attribute and its registrations live
/// in a side-table owned by this registry. Lookups go by element identity;
/// the attribute is only trusted once the record it names is known to belong
/// to the same element, so several registries can share elements. The
/// registry is a cheap handle; clones share the same side-table and host.
#[derive(Clone)]
pub struct DomRegistry {
    inner: Rc<RegistryInner>,
}

struct RegistryInner {
    host: Rc<dyn NativeHost>,
    config: EventsConfig,
    wrapper: RefCell<Option<ElementWrapper>>,
    records: RefCell<HashMap<u64, ElementRecord>>,
}

impl DomRegistry {
    pub fn new(host: Rc<dyn NativeHost>) -> Self {
        Self::with_config(host, EventsConfig::default())
    }

    pub fn with_config(host: Rc<dyn NativeHost>, config: EventsConfig) -> Self {
        Self {
            inner: Rc::new(RegistryInner {
                host,
                config,
                wrapper: RefCell::new(None),
                records: RefCell::new(HashMap::new()),
            }),
        }
    }

    /// Installs the factory used to re-wrap raw elements surfaced on events.
    pub fn set_element_wrapper(&self, wrapper: ElementWrapper) {
        *self.inner.wrapper.borrow_mut() = Some(wrapper);
    }

    pub fn config(&self) -> &EventsConfig {
        &self.inner.config
    }

    pub fn touch_only(&self) -> bool {
        self.inner
            .config
            .touch_aliasing
            .resolve(self.inner.host.supports_touch())
    }

    fn resolve_type<'a>(&self, event_type: &'a str) -> &'a str {
        resolve_event_type(event_type, self.touch_only())
    }

    /// Registry id carried by `element`, if it has registrations here.
    pub fn element_id(&self, element: &ElementRef) -> Option<u64> {
        let records = self.inner.records.borrow();
        let tagged = element
            .attribute(&self.inner.config.id_attribute)
            .and_then(|value| value.parse::<u64>().ok());
        if let Some(id) = tagged {
            if records.get(&id).is_some_and(|record| record.is(element)) {
                return Some(id);
            }
        }
        // The tag may have been rewritten by another registry.
        records
            .iter()
            .find(|(_, record)| record.is(element))
            .map(|(id, _)| *id)
    }

    fn ensure_id(&self, element: &ElementRef) -> u64 {
        if let Some(id) = self.element_id(element) {
            return id;
        }

        let mut records = self.inner.records.borrow_mut();
        records.retain(|_, record| record.element.strong_count() > 0);

        let reusable = element
            .attribute(&self.inner.config.id_attribute)
            .and_then(|value| value.parse::<u64>().ok())
            .filter(|id| !records.contains_key(id));
        let id = match reusable {
            Some(id) => id,
            None => {
                let id = NEXT_ELEMENT_ID.fetch_add(1, Ordering::Relaxed);
                element.set_attribute(&self.inner.config.id_attribute, &id.to_string());
                id
            }
        };
        records.insert(
            id,
            ElementRecord {
                element: Rc::downgrade(element),
                types: HashMap::new(),
            },
        );
        trace!(target = "dom", id, "tagged element");
        id
    }

    pub fn on(&self, element: &ElementRef, event_type: &str, listener: &Listener) -> &Self {
        self.register(element, event_type, listener.clone(), None, None)
    }

    pub fn on_with(
        &self,
        element: &ElementRef,
        event_type: &str,
        listener: &Listener,
        data: JsonValue,
    ) -> &Self {
        self.register(element, event_type, listener.clone(), None, Some(data))
    }

    /// Registers a listener that removes itself, native handler included,
    /// before its first invocation.
    pub fn once(&self, element: &ElementRef, event_type: &str, listener: &Listener) -> &Self {
        if event_type.is_empty() {
            return self;
        }

        let registry = Rc::downgrade(&self.inner);
        let weak_element: Weak<dyn NativeElement> = Rc::downgrade(element);
        let delegate = listener.clone();
        let owned_type = event_type.to_string();
        let wrapper = Listener::new_self_aware(move |me| {
            Box::new(move |event: &Event| {
                if let (Some(inner), Some(element), Some(me)) =
                    (registry.upgrade(), weak_element.upgrade(), me.upgrade())
                {
                    DomRegistry { inner }.off(&element, &owned_type, &me);
                }
                delegate.call(event);
            })
        });

        self.register(element, event_type, wrapper, Some(listener.clone()), None)
    }

    fn register(
        &self,
        element: &ElementRef,
        event_type: &str,
        listener: Listener,
        original: Option<Listener>,
        data: Option<JsonValue>,
    ) -> &Self {
        if event_type.is_empty() {
            return self;
        }
        let kind = element.node_kind();
        if !kind.accepts_listeners() {
            debug!(target = "dom", ?kind, event_type, "node does not accept listeners");
            return self;
        }

        let event_type = self.resolve_type(event_type);
        let id = self.ensure_id(element);
        let api = if element.supports_listener_api(ListenerApi::Standard) {
            ListenerApi::Standard
        } else {
            ListenerApi::Legacy
        };

        let handler = {
            let mut records = self.inner.records.borrow_mut();
            let Some(record) = records.get_mut(&id) else {
                return self;
            };
            let store = record.types.entry(event_type.to_string()).or_default();
            let duplicate = store.iter().any(|r| {
                r.matches(&listener) || original.as_ref().is_some_and(|o| r.matches(o))
            });
            if duplicate {
                trace!(target = "dom", id, event_type, "listener already registered");
                return self;
            }
            let handler = self.native_handler(listener.clone(), data, api);
            store.push(DomRegistration {
                listener,
                original,
                handler: Rc::clone(&handler),
                api,
            });
            handler
        };

        element.add_listener(api, &api.native_type(event_type), &handler);
        trace!(target = "dom", id, event_type, ?api, "native listener installed");
        self
    }

    fn native_handler(
        &self,
        listener: Listener,
        data: Option<JsonValue>,
        api: ListenerApi,
    ) -> NativeHandler {
        let registry = Rc::downgrade(&self.inner);
        Rc::new(move |native: &NativeEvent| {
            let mut context = NormalizeContext::new(api);
            if let Some(inner) = registry.upgrade() {
                context.scroll_offset = inner.host.scroll_offset();
                context.wrapper = inner.wrapper.borrow().clone();
            }
            let event = Event::from_dom(DomDetail::from_native(native, &context), data.clone());
            listener.call(&event);
        })
    }

    pub fn off(&self, element: &ElementRef, event_type: &str, listener: &Listener) -> &Self {
        let Some(id) = self.element_id(element) else {
            return self;
        };
        let event_type = self.resolve_type(event_type);

        let removed = {
            let mut records = self.inner.records.borrow_mut();
            records
                .get_mut(&id)
                .and_then(|record| record.types.get_mut(event_type))
                .and_then(|store| {
                    let index = store.iter().position(|r| r.matches(listener))?;
                    Some(store.remove(index))
                })
        };

        if let Some(registration) = removed {
            element.remove_listener(
                registration.api,
                &registration.api.native_type(event_type),
                &registration.handler,
            );
            trace!(target = "dom", id, event_type, "native listener removed");
        }
        self
    }

    /// Removes every native listener this registry installed on `element`.
    pub fn off_all(&self, element: &ElementRef) -> &Self {
        let Some(id) = self.element_id(element) else {
            return self;
        };

        let types = self
            .inner
            .records
            .borrow_mut()
            .get_mut(&id)
            .map(|record| std::mem::take(&mut record.types))
            .unwrap_or_default();

        let mut removed = 0;
        for (event_type, registrations) in types {
            for registration in registrations {
                element.remove_listener(
                    registration.api,
                    &registration.api.native_type(&event_type),
                    &registration.handler,
                );
                removed += 1;
            }
        }
        debug!(target = "dom", id, removed, "cleared element listeners");
        self
    }

    /// Builds a bubbling, cancelable native event and dispatches it on `element`.
    ///
    /// Returns the native dispatch result, `false` when a handler cancelled it.
    pub fn trigger(&self, element: &ElementRef, event_type: &str, data: Option<JsonValue>) -> bool {
        if event_type.is_empty() || !element.node_kind().accepts_listeners() {
            return false;
        }
        let event_type = self.resolve_type(event_type);
        let category = event_category(event_type, &self.inner.config.extra_html_events);
        let mut native = self.inner.host.create_event(category, event_type);
        if let Some(data) = data {
            native.set_property("data", data);
        }
        trace!(target = "dom", event_type, ?category, "dispatching native event");
        element.dispatch_event(&native)
    }

    pub fn listener_count(&self, element: &ElementRef, event_type: &str) -> usize {
        let Some(id) = self.element_id(element) else {
            return 0;
        };
        let event_type = self.resolve_type(event_type);
        self.inner
            .records
            .borrow()
            .get(&id)
            .and_then(|record| record.types.get(event_type))
            .map_or(0, Vec::len)
    }
}
