//! Event registration and dispatch for plain objects and DOM elements.
//!
//! Plain targets embed a [`ListenerStore`] and implement [`Dispatch`]; DOM
//! elements go through a [`DomRegistry`] built around the host's native
//! event system.

pub mod config;
pub mod dom;
pub mod events;

pub use config::{ConfigError, EventsConfig, TouchAliasing};
pub use dom::DomRegistry;
pub use events::{Dispatch, Event, EventBus, EventTarget, Listener, ListenerStore, TargetId};
