//! # feedhub
//!
//! Subscription registry and typed event dispatch for trading systems.
//!
//! Many consumers (strategies, analytics, UIs) request market-data and
//! account feeds from one or more venue connectors. feedhub tracks every
//! request through its lifecycle and fans each inbound event out to exactly
//! the listeners registered for its kind.
//!
//! ## Features
//!
//! - **Typed dispatch** - one listener list per event kind, payload checked
//!   once at the dispatch boundary
//! - **Ordered per subscription** - events of one feed reach listeners in
//!   arrival order; unrelated feeds never wait on each other
//! - **Fault isolation** - a panicking listener is reported, the others still run
//! - **Venue time** - a clock and interval timer driven by market-time events
//!
//! ## Quick Start
//!
//! ```
//! use feedhub::prelude::*;
//! use std::sync::Arc;
//!
//! let venue = Arc::new(LoopbackConnector::new("sim").auto_start());
//! let provider = SubscriptionProvider::builder()
//!     .shared_connector(venue.clone())
//!     .build()?;
//!
//! provider.on_quote(|sub, quote| {
//!     println!("{} bid={:?}", sub.id(), quote.get(Level1Field::BestBid));
//! });
//!
//! let sub = provider.subscribe(SubscriptionSpec::level1(SecurityId::new("AAPL", "NASDAQ")))?;
//! assert_eq!(sub.state(), SubscriptionState::Active);
//! # Ok::<(), ProviderError>(())
//! ```
//!
//! ## Crate Organization
//!
//! - [`core`] - ids, request specs, lifecycle states, payloads, events
//! - [`channel`] - bounded MPSC queue for connector requests
//! - [`router`] - subscriptions, listener lists, dispatch
//! - [`provider`] - the consumer facade and the connector seam
//! - [`clock`] - venue-time clock and interval timer

pub mod prelude;

/// Ids, request specs, lifecycle states, payloads and events.
pub mod core {
    pub use feedhub_core::*;
}

/// Bounded MPSC queue.
pub mod channel {
    pub use feedhub_channel::*;
}

/// Subscription registry and event dispatch.
pub mod router {
    pub use feedhub_router::*;
}

/// Consumer facade and connectors.
pub mod provider {
    pub use feedhub_provider::*;
}

/// Venue-time scheduling.
pub mod clock {
    pub use feedhub_clock::*;
}
