//! # feedhub Provider
//!
//! The consumer-facing side of feedhub.
//!
//! This crate provides:
//! - [`SubscriptionProvider`], the subscribe/unsubscribe facade with one
//!   notification per event kind
//! - [`Connector`], the seam to venue adapters, plus [`EventSink`] for the
//!   inbound direction
//! - [`ChannelConnector`] and [`LoopbackConnector`], two in-process connectors
//! - [`ProviderBuilder`] and [`ProviderConfig`] for configuration
//!
//! # Example
//!
//! ```
//! use feedhub_core::{Event, SecurityId, SubscriptionSpec, SubscriptionState};
//! use feedhub_provider::{LoopbackConnector, SubscriptionProvider};
//! use std::sync::Arc;
//!
//! let venue = Arc::new(LoopbackConnector::new("sim"));
//! let provider = SubscriptionProvider::builder()
//!     .shared_connector(venue.clone())
//!     .build()
//!     .unwrap();
//!
//! let sub = provider
//!     .subscribe(SubscriptionSpec::level1(SecurityId::new("AAPL", "NASDAQ")))
//!     .unwrap();
//! venue.deliver(sub.id(), Event::Started).unwrap();
//! assert_eq!(sub.state(), SubscriptionState::Active);
//!
//! provider.unsubscribe(&sub);
//! assert_eq!(sub.state(), SubscriptionState::Stopped);
//! ```

pub mod builder;
pub mod connector;
pub mod error;
pub mod provider;

pub use builder::{ProviderBuilder, ProviderConfig};
pub use connector::{
    Ack, ChannelConnector, Connector, ConnectorHandle, ConnectorRequest, EventSink,
    LoopbackConnector,
};
pub use error::{ConnectorError, ProviderError};
pub use provider::SubscriptionProvider;
