//! Listener registry and dispatcher for plain (non-DOM) targets.

pub mod dispatch;
pub mod event;
pub mod listener;
pub mod store;

pub use dispatch::{
    off, off_all, on, on_with, once, once_with, trigger, trigger_event, Dispatch, EventBus,
};
pub use event::{Event, EventTarget, TargetId};
pub use listener::{Listener, Registration};
pub use store::ListenerStore;
