//! DOM side of the event system: host abstractions, native event
//! normalization and the id-tagged element registry.

pub mod native;
pub mod normalize;
pub mod registry;

#[cfg(test)]
pub(crate) mod testing;

pub use native::{
    ElementRef, EventCategory, ListenerApi, NativeElement, NativeEvent, NativeHandler, NativeHost,
    NativeSupport, NodeKind,
};
pub use normalize::{CoordinateSource, DomDetail, ElementWrapper, PagePosition};
pub use registry::DomRegistry;
