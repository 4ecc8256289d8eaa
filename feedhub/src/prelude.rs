//! Prelude module for convenient imports.
//!
//! ```
//! use feedhub::prelude::*;
//! ```

// Core types
pub use feedhub_core::{
    Board, BookLevel, BookState, Candle, CandleState, DataKind, Envelope, Event, EventKind,
    EventTag, FailureInfo, Level1Change, Level1Field, LifecycleSignal, News, Order, OrderBook,
    OrderFail, OrderLogAction, OrderLogEntry, OrderState, OwnTrade, Portfolio, Position,
    QuoteChange, RequestError, SecurityId, SecurityInfo, SecurityType, Side, StopInfo,
    SubscriptionError, SubscriptionId, SubscriptionSpec, SubscriptionState, TickTrade,
    TimeAdvance, tag,
};

// Router types
pub use feedhub_router::{
    DispatchError, ErrorSink, EventRouter, ListenerId, RegistrationError, Subscription,
    TracingSink,
};

// Provider types
pub use feedhub_provider::{
    Ack, ChannelConnector, Connector, ConnectorError, ConnectorHandle, ConnectorRequest,
    EventSink, LoopbackConnector, ProviderBuilder, ProviderConfig, ProviderError,
    SubscriptionProvider,
};

// Clock types
pub use feedhub_clock::{ClockError, IntervalTimer, MarketClock, Tick, TimerError};
