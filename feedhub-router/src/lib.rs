//! # feedhub Router
//!
//! Holds live subscriptions and fans inbound events out to listeners.
//!
//! This crate provides:
//! - [`Subscription`], the registry-owned handle carrying lifecycle state
//! - [`SubscriptionRegistry`], live and retired subscription indexes
//! - [`ListenerList`], a copy-on-write listener set safe to mutate mid-dispatch
//! - [`EventRouter`], per-subscription ordered, fault-isolated dispatch
//! - [`ErrorSink`], where listener faults and protocol errors end up

pub mod error;
pub mod listener;
pub mod registry;
pub mod router;
pub mod sink;
pub mod subscription;

pub use error::{DispatchError, RegistrationError};
pub use listener::{ListenerId, ListenerList};
pub use registry::SubscriptionRegistry;
pub use router::{EventRouter, RouterConfig};
pub use sink::{ErrorSink, TracingSink};
pub use subscription::Subscription;
