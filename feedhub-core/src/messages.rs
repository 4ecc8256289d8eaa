//! Market-data and account payloads delivered to listeners.
//!
//! Prices are fixed-point `i64` mantissas in the instrument's price scale;
//! volumes are signed so that position values can go short.

use crate::types::{SecurityId, nanos};
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// Trade or order direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    /// Buy.
    Buy,
    /// Sell.
    Sell,
}

impl Side {
    /// Returns the opposite side.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
        }
    }
}

/// Level 1 field identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Level1Field {
    /// Best bid price.
    BestBid,
    /// Volume at the best bid.
    BestBidVolume,
    /// Best ask price.
    BestAsk,
    /// Volume at the best ask.
    BestAskVolume,
    /// Last trade price.
    LastPrice,
    /// Last trade volume.
    LastVolume,
    /// Open interest.
    OpenInterest,
    /// Session volume.
    Volume,
}

/// One changed level 1 field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Level1Change {
    /// Field.
    pub field: Level1Field,
    /// New value.
    pub value: i64,
}

/// Level 1 quote change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteChange {
    /// Instrument.
    pub security_id: SecurityId,
    /// Venue timestamp.
    pub server_time: DateTime<Utc>,
    /// Changed fields.
    pub changes: Vec<Level1Change>,
}

impl QuoteChange {
    /// Returns the new value of `field`, if it changed.
    #[must_use]
    pub fn get(&self, field: Level1Field) -> Option<i64> {
        self.changes
            .iter()
            .find(|change| change.field == field)
            .map(|change| change.value)
    }
}

/// Whether an order book message replaces or patches the book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BookState {
    /// Full snapshot.
    Snapshot,
    /// Incremental change; zero volume removes a level.
    Delta,
}

/// Price level of an order book message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookLevel {
    /// Price.
    pub price: i64,
    /// Aggregated volume.
    pub volume: i64,
    /// Number of orders, when the venue reports it.
    pub order_count: Option<u32>,
}

/// Order book snapshot or delta.
///
/// Bids are ordered best (highest) first, asks best (lowest) first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBook {
    /// Instrument.
    pub security_id: SecurityId,
    /// Venue timestamp.
    pub server_time: DateTime<Utc>,
    /// Snapshot or delta.
    pub state: BookState,
    /// Bid levels.
    pub bids: Vec<BookLevel>,
    /// Ask levels.
    pub asks: Vec<BookLevel>,
}

impl OrderBook {
    /// Best bid level.
    #[must_use]
    pub fn best_bid(&self) -> Option<&BookLevel> {
        self.bids.first()
    }

    /// Best ask level.
    #[must_use]
    pub fn best_ask(&self) -> Option<&BookLevel> {
        self.asks.first()
    }

    /// Best ask minus best bid.
    #[must_use]
    pub fn spread(&self) -> Option<i64> {
        Some(self.best_ask()?.price - self.best_bid()?.price)
    }
}

/// Anonymous trade print.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickTrade {
    /// Instrument.
    pub security_id: SecurityId,
    /// Venue trade id.
    pub trade_id: u64,
    /// Price.
    pub price: i64,
    /// Volume.
    pub volume: i64,
    /// Aggressor side, if known.
    pub side: Option<Side>,
    /// Venue timestamp.
    pub server_time: DateTime<Utc>,
}

/// Order log action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderLogAction {
    /// Order entered the book.
    Add,
    /// Order left the book.
    Cancel,
    /// Order (partly) matched.
    Match,
}

/// Order log entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLogEntry {
    /// Instrument.
    pub security_id: SecurityId,
    /// Venue order id.
    pub order_id: u64,
    /// What happened.
    pub action: OrderLogAction,
    /// Order side.
    pub side: Side,
    /// Price.
    pub price: i64,
    /// Volume affected.
    pub volume: i64,
    /// Trade id for matches.
    pub trade_id: Option<u64>,
    /// Venue timestamp.
    pub server_time: DateTime<Utc>,
}

/// Security type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SecurityType {
    /// Stock.
    Equity,
    /// Future contract.
    Future,
    /// Option contract.
    Option,
    /// Currency pair.
    Forex,
    /// Crypto asset.
    Crypto,
    /// Index.
    Index,
    /// Anything else.
    Other,
}

/// Instrument descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityInfo {
    /// Instrument.
    pub security_id: SecurityId,
    /// Type.
    pub security_type: SecurityType,
    /// Minimum price increment.
    pub tick_size: i64,
    /// Contract multiplier.
    pub multiplier: i64,
    /// Quote currency.
    pub currency: String,
}

/// Board (exchange segment) descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    /// Board code.
    pub code: String,
    /// Exchange the board belongs to.
    pub exchange: String,
    /// IANA time zone name.
    pub time_zone: String,
}

/// News item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct News {
    /// Venue news id.
    pub id: String,
    /// Headline.
    pub headline: String,
    /// Body, when delivered.
    pub story: Option<String>,
    /// Source.
    pub source: String,
    /// Related instrument.
    pub security_id: Option<SecurityId>,
    /// Venue timestamp.
    pub server_time: DateTime<Utc>,
}

/// Candle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CandleState {
    /// Still forming.
    Active,
    /// Closed.
    Finished,
}

/// OHLCV candle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candle {
    /// Instrument.
    pub security_id: SecurityId,
    /// Timeframe.
    #[serde(with = "nanos")]
    pub timeframe: TimeDelta,
    /// Opening time.
    pub open_time: DateTime<Utc>,
    /// Open price.
    pub open: i64,
    /// High price.
    pub high: i64,
    /// Low price.
    pub low: i64,
    /// Close price.
    pub close: i64,
    /// Total volume.
    pub volume: i64,
    /// Forming or finished.
    pub state: CandleState,
}

impl Candle {
    /// Close above open.
    #[must_use]
    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    /// Close below open.
    #[must_use]
    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }

    /// Returns true once the candle is closed.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.state == CandleState::Finished
    }
}

/// Own trade (fill).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnTrade {
    /// Venue trade id.
    pub trade_id: u64,
    /// Order that was filled.
    pub order_id: u64,
    /// Instrument.
    pub security_id: SecurityId,
    /// Order side.
    pub side: Side,
    /// Fill price.
    pub price: i64,
    /// Fill volume.
    pub volume: i64,
    /// Commission charged.
    pub commission: Option<i64>,
    /// Venue timestamp.
    pub server_time: DateTime<Utc>,
}

/// Order state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderState {
    /// Sent, not yet accepted.
    Pending,
    /// Working in the book.
    Active,
    /// Filled or cancelled.
    Done,
    /// Rejected.
    Failed,
}

/// Own order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Venue order id, once assigned.
    pub order_id: Option<u64>,
    /// Client transaction id.
    pub transaction_id: u64,
    /// Instrument.
    pub security_id: SecurityId,
    /// Account.
    pub portfolio: String,
    /// Side.
    pub side: Side,
    /// Limit price; zero for market orders.
    pub price: i64,
    /// Original volume.
    pub volume: i64,
    /// Unfilled volume.
    pub balance: i64,
    /// State.
    pub state: OrderState,
    /// Venue timestamp.
    pub server_time: DateTime<Utc>,
}

/// Failed order register, cancel or edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderFail {
    /// Venue order id, if known.
    pub order_id: Option<u64>,
    /// Client transaction id.
    pub transaction_id: u64,
    /// Reason.
    pub error: String,
    /// Venue timestamp.
    pub server_time: DateTime<Utc>,
}

/// Portfolio (account) state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Portfolio {
    /// Account name.
    pub name: String,
    /// Account currency.
    pub currency: String,
    /// Value at session start.
    pub begin_value: i64,
    /// Current value.
    pub current_value: i64,
}

/// Position in one instrument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    /// Account.
    pub portfolio: String,
    /// Instrument.
    pub security_id: SecurityId,
    /// Signed quantity.
    pub current_value: i64,
    /// Average entry price.
    pub average_price: Option<i64>,
    /// Venue timestamp.
    pub server_time: DateTime<Utc>,
}

/// Venue clock advance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeAdvance {
    /// Time elapsed since the previous advance.
    #[serde(with = "nanos")]
    pub diff: TimeDelta,
    /// Venue time after the advance.
    pub server_time: DateTime<Utc>,
}
