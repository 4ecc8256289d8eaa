//! Inbound events and their kind tags.
//!
//! An [`Envelope`] pairs a subscription id with exactly one [`Event`]. Every
//! event has an [`EventKind`], and every kind has exactly one payload type.
//! Several kinds may share a payload type (the three order-fail kinds all
//! carry [`OrderFail`]), which is why listeners are keyed by kind and not by
//! payload type.

use crate::error::SubscriptionError;
use crate::messages::{
    Board, Candle, News, Order, OrderBook, OrderFail, OrderLogEntry, OwnTrade, Portfolio,
    Position, QuoteChange, SecurityInfo, TickTrade, TimeAdvance,
};
use crate::state::LifecycleSignal;
use crate::types::SubscriptionId;
use serde::{Deserialize, Serialize};
use std::any::{Any, TypeId};
use std::fmt;

/// Payload of a `Stopped` signal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopInfo {
    /// Why the feed ended, if a reason was given.
    pub reason: Option<String>,
}

impl StopInfo {
    /// Stop with a reason.
    pub fn with_reason(reason: impl Into<String>) -> Self {
        Self {
            reason: Some(reason.into()),
        }
    }
}

/// Payload of a `Failed` signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureInfo {
    /// What went wrong.
    pub error: SubscriptionError,
    /// True when the whole connector is affected, not only this feed.
    pub is_provider_fault: bool,
}

impl FailureInfo {
    /// Failure confined to one subscription.
    #[must_use]
    pub fn subscription(error: SubscriptionError) -> Self {
        Self {
            error,
            is_provider_fault: false,
        }
    }

    /// Failure of the connector serving the subscription.
    #[must_use]
    pub fn provider(error: SubscriptionError) -> Self {
        Self {
            error,
            is_provider_fault: true,
        }
    }
}

/// Tag identifying the kind of an [`Event`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventKind {
    /// Level 1 change.
    Quote,
    /// Order book.
    OrderBook,
    /// Tick trade.
    TickTrade,
    /// Order log entry.
    OrderLog,
    /// Security descriptor.
    Security,
    /// Board descriptor.
    Board,
    /// News item.
    News,
    /// Candle.
    Candle,
    /// Own trade.
    OwnTrade,
    /// Own order.
    Order,
    /// Order registration failed.
    OrderRegisterFail,
    /// Order cancellation failed.
    OrderCancelFail,
    /// Order edit failed.
    OrderEditFail,
    /// Portfolio.
    Portfolio,
    /// Position.
    Position,
    /// Venue time advance.
    MarketTime,
    /// Lifecycle: acknowledged.
    Started,
    /// Lifecycle: caught up.
    Online,
    /// Lifecycle: ended normally.
    Stopped,
    /// Lifecycle: ended with an error.
    Failed,
}

impl EventKind {
    /// Every kind, in declaration order.
    pub const ALL: [EventKind; 20] = [
        Self::Quote,
        Self::OrderBook,
        Self::TickTrade,
        Self::OrderLog,
        Self::Security,
        Self::Board,
        Self::News,
        Self::Candle,
        Self::OwnTrade,
        Self::Order,
        Self::OrderRegisterFail,
        Self::OrderCancelFail,
        Self::OrderEditFail,
        Self::Portfolio,
        Self::Position,
        Self::MarketTime,
        Self::Started,
        Self::Online,
        Self::Stopped,
        Self::Failed,
    ];

    /// Returns the lifecycle signal this kind carries, if any.
    #[must_use]
    pub const fn lifecycle(self) -> Option<LifecycleSignal> {
        match self {
            Self::Started => Some(LifecycleSignal::Started),
            Self::Online => Some(LifecycleSignal::Online),
            Self::Stopped => Some(LifecycleSignal::Stopped),
            Self::Failed => Some(LifecycleSignal::Failed),
            _ => None,
        }
    }

    /// Returns true for the four lifecycle kinds.
    #[must_use]
    pub const fn is_lifecycle(self) -> bool {
        self.lifecycle().is_some()
    }

    /// `TypeId` of the payload carried by this kind.
    #[must_use]
    pub fn payload_type(self) -> TypeId {
        match self {
            Self::Quote => TypeId::of::<QuoteChange>(),
            Self::OrderBook => TypeId::of::<OrderBook>(),
            Self::TickTrade => TypeId::of::<TickTrade>(),
            Self::OrderLog => TypeId::of::<OrderLogEntry>(),
            Self::Security => TypeId::of::<SecurityInfo>(),
            Self::Board => TypeId::of::<Board>(),
            Self::News => TypeId::of::<News>(),
            Self::Candle => TypeId::of::<Candle>(),
            Self::OwnTrade => TypeId::of::<OwnTrade>(),
            Self::Order => TypeId::of::<Order>(),
            Self::OrderRegisterFail | Self::OrderCancelFail | Self::OrderEditFail => {
                TypeId::of::<OrderFail>()
            }
            Self::Portfolio => TypeId::of::<Portfolio>(),
            Self::Position => TypeId::of::<Position>(),
            Self::MarketTime => TypeId::of::<TimeAdvance>(),
            Self::Started | Self::Online => TypeId::of::<()>(),
            Self::Stopped => TypeId::of::<StopInfo>(),
            Self::Failed => TypeId::of::<FailureInfo>(),
        }
    }

    /// Human-readable payload type name, for diagnostics.
    #[must_use]
    pub const fn payload_type_name(self) -> &'static str {
        match self {
            Self::Quote => "QuoteChange",
            Self::OrderBook => "OrderBook",
            Self::TickTrade => "TickTrade",
            Self::OrderLog => "OrderLogEntry",
            Self::Security => "SecurityInfo",
            Self::Board => "Board",
            Self::News => "News",
            Self::Candle => "Candle",
            Self::OwnTrade => "OwnTrade",
            Self::Order => "Order",
            Self::OrderRegisterFail | Self::OrderCancelFail | Self::OrderEditFail => "OrderFail",
            Self::Portfolio => "Portfolio",
            Self::Position => "Position",
            Self::MarketTime => "TimeAdvance",
            Self::Started | Self::Online => "()",
            Self::Stopped => "StopInfo",
            Self::Failed => "FailureInfo",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// One inbound event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    /// Level 1 change.
    Quote(QuoteChange),
    /// Order book.
    OrderBook(OrderBook),
    /// Tick trade.
    TickTrade(TickTrade),
    /// Order log entry.
    OrderLog(OrderLogEntry),
    /// Security descriptor.
    Security(SecurityInfo),
    /// Board descriptor.
    Board(Board),
    /// News item.
    News(News),
    /// Candle.
    Candle(Candle),
    /// Own trade.
    OwnTrade(OwnTrade),
    /// Own order.
    Order(Order),
    /// Order registration failed.
    OrderRegisterFail(OrderFail),
    /// Order cancellation failed.
    OrderCancelFail(OrderFail),
    /// Order edit failed.
    OrderEditFail(OrderFail),
    /// Portfolio.
    Portfolio(Portfolio),
    /// Position.
    Position(Position),
    /// Venue time advance.
    MarketTime(TimeAdvance),
    /// Connector acknowledged the request.
    Started,
    /// Feed caught up with real time.
    Online,
    /// Feed ended normally.
    Stopped(StopInfo),
    /// Feed ended with an error.
    Failed(FailureInfo),
}

impl Event {
    /// Returns this event's kind.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::Quote(_) => EventKind::Quote,
            Self::OrderBook(_) => EventKind::OrderBook,
            Self::TickTrade(_) => EventKind::TickTrade,
            Self::OrderLog(_) => EventKind::OrderLog,
            Self::Security(_) => EventKind::Security,
            Self::Board(_) => EventKind::Board,
            Self::News(_) => EventKind::News,
            Self::Candle(_) => EventKind::Candle,
            Self::OwnTrade(_) => EventKind::OwnTrade,
            Self::Order(_) => EventKind::Order,
            Self::OrderRegisterFail(_) => EventKind::OrderRegisterFail,
            Self::OrderCancelFail(_) => EventKind::OrderCancelFail,
            Self::OrderEditFail(_) => EventKind::OrderEditFail,
            Self::Portfolio(_) => EventKind::Portfolio,
            Self::Position(_) => EventKind::Position,
            Self::MarketTime(_) => EventKind::MarketTime,
            Self::Started => EventKind::Started,
            Self::Online => EventKind::Online,
            Self::Stopped(_) => EventKind::Stopped,
            Self::Failed(_) => EventKind::Failed,
        }
    }

    /// Returns the payload as `&dyn Any` for the dispatch boundary.
    #[must_use]
    pub fn payload(&self) -> &(dyn Any + Send + Sync) {
        match self {
            Self::Quote(p) => p,
            Self::OrderBook(p) => p,
            Self::TickTrade(p) => p,
            Self::OrderLog(p) => p,
            Self::Security(p) => p,
            Self::Board(p) => p,
            Self::News(p) => p,
            Self::Candle(p) => p,
            Self::OwnTrade(p) => p,
            Self::Order(p) => p,
            Self::OrderRegisterFail(p) | Self::OrderCancelFail(p) | Self::OrderEditFail(p) => p,
            Self::Portfolio(p) => p,
            Self::Position(p) => p,
            Self::MarketTime(p) => p,
            Self::Started | Self::Online => &(),
            Self::Stopped(p) => p,
            Self::Failed(p) => p,
        }
    }

    /// Returns true for lifecycle signals.
    #[must_use]
    pub const fn is_lifecycle(&self) -> bool {
        self.kind().is_lifecycle()
    }
}

/// Unit of dispatch: one event for one subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Originating subscription.
    pub subscription: SubscriptionId,
    /// Event body.
    pub event: Event,
}

impl Envelope {
    /// Creates an envelope.
    #[must_use]
    pub const fn new(subscription: SubscriptionId, event: Event) -> Self {
        Self {
            subscription,
            event,
        }
    }
}

/// Compile-time link between an event kind and its payload type.
///
/// Implemented by the unit structs in [`tag`]; lets listener registration
/// check the payload type statically.
pub trait EventTag: 'static {
    /// Payload delivered for this kind.
    type Payload: Any + Send + Sync;
    /// The kind.
    const KIND: EventKind;
}

/// Marker types implementing [`EventTag`], one per [`EventKind`].
pub mod tag {
    use super::{EventKind, EventTag, FailureInfo, StopInfo};
    use crate::messages::{
        Board as BoardMsg, Candle as CandleMsg, News as NewsMsg, Order as OrderMsg,
        OrderBook as OrderBookMsg, OrderFail, OrderLogEntry, OwnTrade as OwnTradeMsg,
        Portfolio as PortfolioMsg, Position as PositionMsg, QuoteChange, SecurityInfo,
        TickTrade as TickTradeMsg, TimeAdvance,
    };

    macro_rules! event_tags {
        ($($(#[$meta:meta])* $name:ident => $payload:ty;)*) => {
            $(
                $(#[$meta])*
                #[derive(Debug, Clone, Copy, PartialEq, Eq)]
                pub struct $name;

                impl EventTag for $name {
                    type Payload = $payload;
                    const KIND: EventKind = EventKind::$name;
                }
            )*
        };
    }

    event_tags! {
        /// Level 1 changes.
        Quote => QuoteChange;
        /// Order books.
        OrderBook => OrderBookMsg;
        /// Tick trades.
        TickTrade => TickTradeMsg;
        /// Order log entries.
        OrderLog => OrderLogEntry;
        /// Security descriptors.
        Security => SecurityInfo;
        /// Board descriptors.
        Board => BoardMsg;
        /// News.
        News => NewsMsg;
        /// Candles.
        Candle => CandleMsg;
        /// Own trades.
        OwnTrade => OwnTradeMsg;
        /// Own orders.
        Order => OrderMsg;
        /// Order registration failures.
        OrderRegisterFail => OrderFail;
        /// Order cancellation failures.
        OrderCancelFail => OrderFail;
        /// Order edit failures.
        OrderEditFail => OrderFail;
        /// Portfolios.
        Portfolio => PortfolioMsg;
        /// Positions.
        Position => PositionMsg;
        /// Venue time advances.
        MarketTime => TimeAdvance;
        /// Started signals.
        Started => ();
        /// Online signals.
        Online => ();
        /// Stopped signals.
        Stopped => StopInfo;
        /// Failed signals.
        Failed => FailureInfo;
    }
}
