//! Event abstraction + observer registry (mechanics only).
//!
//! Domain event types live in their owning domain crates; this crate provides
//! the domain-agnostic [`Event`] contract and the [`ObserverRegistry`] used to
//! fan events out to subscribed callbacks.

pub mod event;
pub mod registry;

pub use event::Event;
pub use registry::{
    DispatchOutcome, DispatchSnapshot, Handler, ObserverRegistry, SubscriptionToken,
};
