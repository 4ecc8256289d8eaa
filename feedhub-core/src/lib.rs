//! # feedhub Core
//!
//! Core types shared by every feedhub crate.
//!
//! This crate provides:
//! - Process-unique subscription identifiers and request specs
//! - The subscription lifecycle state machine
//! - Market-data and account payload types
//! - The [`Event`] envelope body and its [`EventKind`] tags
//! - Error types for requests and failed subscriptions

pub mod error;
pub mod event;
pub mod messages;
pub mod state;
pub mod types;

pub use error::{RequestError, SubscriptionError};
pub use event::{Envelope, Event, EventKind, EventTag, FailureInfo, StopInfo, tag};
pub use messages::{
    Board, BookLevel, BookState, Candle, CandleState, Level1Change, Level1Field, News, Order,
    OrderBook, OrderFail, OrderLogAction, OrderLogEntry, OrderState, OwnTrade, Portfolio,
    Position, QuoteChange, SecurityInfo, SecurityType, Side, TickTrade, TimeAdvance,
};
pub use state::{LifecycleSignal, SubscriptionState};
pub use types::{DataKind, SecurityId, SubscriptionId, SubscriptionSpec};
