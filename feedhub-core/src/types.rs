//! Identifiers and subscription request specifications.

use crate::error::RequestError;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_SUBSCRIPTION_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique subscription identifier.
///
/// Identifiers are never reused within a process, so a re-subscription after
/// a stop always gets a fresh one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    /// Allocates the next identifier.
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_SUBSCRIPTION_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Wraps a raw value, e.g. one echoed back by a connector.
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Instrument reference: security code plus the board it trades on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SecurityId {
    /// Security code / ticker.
    pub code: String,
    /// Board (exchange segment) code.
    pub board: String,
}

impl SecurityId {
    /// Creates a security id.
    pub fn new(code: impl Into<String>, board: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            board: board.into(),
        }
    }
}

impl fmt::Display for SecurityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.code, self.board)
    }
}

/// Category of data a subscription asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataKind {
    /// Level 1 quotes (best bid/ask, last trade).
    Level1,
    /// Order book snapshots and deltas.
    MarketDepth,
    /// Tick trades.
    Ticks,
    /// Full order log.
    OrderLog,
    /// Security lookup.
    Securities,
    /// Board lookup.
    Boards,
    /// News feed.
    News,
    /// Candles for one timeframe.
    Candles,
    /// Own orders, trades and order failures.
    Transactions,
    /// Portfolio lookup.
    Portfolios,
    /// Positions of one portfolio.
    Positions,
    /// Venue time advances.
    MarketTime,
}

impl DataKind {
    /// Returns true if the request must name an instrument.
    #[must_use]
    pub const fn requires_security(self) -> bool {
        matches!(
            self,
            Self::Level1 | Self::MarketDepth | Self::Ticks | Self::OrderLog | Self::Candles
        )
    }

    /// Returns true if the request must name a portfolio.
    #[must_use]
    pub const fn requires_portfolio(self) -> bool {
        matches!(self, Self::Positions)
    }

    /// Returns true for connection-level kinds that need no instrument or account.
    #[must_use]
    pub const fn is_connection_level(self) -> bool {
        !self.requires_security() && !self.requires_portfolio()
    }

    /// Returns the snake_case name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Level1 => "level1",
            Self::MarketDepth => "market_depth",
            Self::Ticks => "ticks",
            Self::OrderLog => "order_log",
            Self::Securities => "securities",
            Self::Boards => "boards",
            Self::News => "news",
            Self::Candles => "candles",
            Self::Transactions => "transactions",
            Self::Portfolios => "portfolios",
            Self::Positions => "positions",
            Self::MarketTime => "market_time",
        }
    }
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What a consumer asks a connector for.
///
/// Two specs that compare equal describe the same feed; this is what the
/// provider's duplicate policy checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionSpec {
    /// Data category.
    pub kind: DataKind,
    /// Instrument, for market-data kinds.
    pub security_id: Option<SecurityId>,
    /// Board filter, for lookups.
    pub board: Option<String>,
    /// Account, for account kinds.
    pub portfolio: Option<String>,
    /// Candle timeframe.
    #[serde(default, with = "nanos_opt")]
    pub timeframe: Option<TimeDelta>,
    /// Start of the historical range.
    pub from: Option<DateTime<Utc>>,
    /// End of the historical range. `None` means "continue live".
    pub to: Option<DateTime<Utc>>,
    /// Maximum number of historical items.
    pub count: Option<u64>,
    /// Deliver the current snapshot only, without live updates.
    #[serde(default)]
    pub snapshot_only: bool,
    /// Connector that should serve the request.
    pub connector: Option<String>,
}

impl SubscriptionSpec {
    /// Creates a bare spec for the given kind.
    #[must_use]
    pub fn new(kind: DataKind) -> Self {
        Self {
            kind,
            security_id: None,
            board: None,
            portfolio: None,
            timeframe: None,
            from: None,
            to: None,
            count: None,
            snapshot_only: false,
            connector: None,
        }
    }

    /// Level 1 quotes for a security.
    #[must_use]
    pub fn level1(security_id: SecurityId) -> Self {
        Self::new(DataKind::Level1).security(security_id)
    }

    /// Order book for a security.
    #[must_use]
    pub fn market_depth(security_id: SecurityId) -> Self {
        Self::new(DataKind::MarketDepth).security(security_id)
    }

    /// Tick trades for a security.
    #[must_use]
    pub fn ticks(security_id: SecurityId) -> Self {
        Self::new(DataKind::Ticks).security(security_id)
    }

    /// Order log for a security.
    #[must_use]
    pub fn order_log(security_id: SecurityId) -> Self {
        Self::new(DataKind::OrderLog).security(security_id)
    }

    /// Candles of `timeframe` for a security.
    #[must_use]
    pub fn candles(security_id: SecurityId, timeframe: TimeDelta) -> Self {
        let mut spec = Self::new(DataKind::Candles).security(security_id);
        spec.timeframe = Some(timeframe);
        spec
    }

    /// Positions of a portfolio.
    #[must_use]
    pub fn positions(portfolio: impl Into<String>) -> Self {
        Self::new(DataKind::Positions).portfolio(portfolio)
    }

    /// Venue time advances.
    #[must_use]
    pub fn market_time() -> Self {
        Self::new(DataKind::MarketTime)
    }

    /// Sets the security.
    #[must_use]
    pub fn security(mut self, security_id: SecurityId) -> Self {
        self.security_id = Some(security_id);
        self
    }

    /// Sets the board filter.
    #[must_use]
    pub fn board(mut self, board: impl Into<String>) -> Self {
        self.board = Some(board.into());
        self
    }

    /// Sets the portfolio.
    #[must_use]
    pub fn portfolio(mut self, portfolio: impl Into<String>) -> Self {
        self.portfolio = Some(portfolio.into());
        self
    }

    /// Requests history starting at `from`, then live data.
    #[must_use]
    pub fn since(mut self, from: DateTime<Utc>) -> Self {
        self.from = Some(from);
        self
    }

    /// Requests the closed historical range `[from, to]`.
    #[must_use]
    pub fn range(mut self, from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        self.from = Some(from);
        self.to = Some(to);
        self
    }

    /// Caps the number of historical items.
    #[must_use]
    pub fn count(mut self, count: u64) -> Self {
        self.count = Some(count);
        self
    }

    /// Asks for the current snapshot only.
    #[must_use]
    pub fn snapshot_only(mut self) -> Self {
        self.snapshot_only = true;
        self
    }

    /// Routes the request to a named connector.
    #[must_use]
    pub fn via(mut self, connector: impl Into<String>) -> Self {
        self.connector = Some(connector.into());
        self
    }

    /// Checks that the request is well formed for its kind.
    ///
    /// # Errors
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<(), RequestError> {
        match &self.security_id {
            Some(security_id) if security_id.code.is_empty() => {
                return Err(RequestError::EmptyField {
                    field: "security code",
                });
            }
            None if self.kind.requires_security() => {
                return Err(RequestError::MissingSecurity { kind: self.kind });
            }
            _ => {}
        }

        match self.portfolio.as_deref() {
            Some("") => return Err(RequestError::EmptyField { field: "portfolio" }),
            None if self.kind.requires_portfolio() => {
                return Err(RequestError::MissingPortfolio { kind: self.kind });
            }
            _ => {}
        }

        if self.kind == DataKind::Candles {
            let timeframe = self.timeframe.unwrap_or_else(TimeDelta::zero);
            if timeframe <= TimeDelta::zero() {
                return Err(RequestError::InvalidTimeframe {
                    seconds: timeframe.num_seconds(),
                });
            }
        }

        if let (Some(from), Some(to)) = (self.from, self.to)
            && from > to
        {
            return Err(RequestError::InvalidRange {
                from: from.to_rfc3339(),
                to: to.to_rfc3339(),
            });
        }

        if self.count == Some(0) {
            return Err(RequestError::ZeroCount);
        }

        Ok(())
    }
}

impl fmt::Display for SubscriptionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(security_id) = &self.security_id {
            write!(f, " {security_id}")?;
        }
        if let Some(portfolio) = &self.portfolio {
            write!(f, " [{portfolio}]")?;
        }
        if let Some(timeframe) = self.timeframe {
            write!(f, " {}s", timeframe.num_seconds())?;
        }
        Ok(())
    }
}

/// Serde helpers storing a `TimeDelta` as whole nanoseconds.
pub mod nanos {
    use chrono::TimeDelta;
    use serde::{Deserialize, Deserializer, Serializer, ser::Error};

    pub(crate) fn to_nanos<E: Error>(delta: &TimeDelta) -> Result<i64, E> {
        delta
            .num_nanoseconds()
            .ok_or_else(|| E::custom("time delta too large for nanoseconds"))
    }

    /// Serializes as nanoseconds.
    ///
    /// # Errors
    /// Fails for deltas beyond roughly 292 years.
    pub fn serialize<S: Serializer>(delta: &TimeDelta, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(to_nanos::<S::Error>(delta)?)
    }

    /// Deserializes from nanoseconds.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<TimeDelta, D::Error> {
        Ok(TimeDelta::nanoseconds(i64::deserialize(deserializer)?))
    }
}

mod nanos_opt {
    use super::nanos::to_nanos;
    use chrono::TimeDelta;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        delta: &Option<TimeDelta>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match delta {
            Some(delta) => serializer.serialize_some(&to_nanos::<S::Error>(delta)?),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<TimeDelta>, D::Error> {
        Ok(Option::<i64>::deserialize(deserializer)?.map(TimeDelta::nanoseconds))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn aapl() -> SecurityId {
        SecurityId::new("AAPL", "NASDAQ")
    }

    #[test]
    fn test_subscription_ids_are_unique_and_increasing() {
        let a = SubscriptionId::next();
        let b = SubscriptionId::next();
        assert_ne!(a, b);
        assert!(b > a);
        assert_eq!(SubscriptionId::from_raw(a.get()), a);
    }

    #[test]
    fn test_security_id_display() {
        assert_eq!(aapl().to_string(), "AAPL@NASDAQ");
    }

    #[test]
    fn test_data_kind_requirements() {
        assert!(DataKind::Level1.requires_security());
        assert!(DataKind::Candles.requires_security());
        assert!(DataKind::Positions.requires_portfolio());
        assert!(DataKind::MarketTime.is_connection_level());
        assert!(DataKind::News.is_connection_level());
        assert!(!DataKind::Ticks.is_connection_level());
    }

    #[test]
    fn test_validate_ok() {
        assert!(SubscriptionSpec::level1(aapl()).validate().is_ok());
        assert!(SubscriptionSpec::market_time().validate().is_ok());
        assert!(SubscriptionSpec::positions("main").validate().is_ok());
        assert!(
            SubscriptionSpec::candles(aapl(), TimeDelta::minutes(5))
                .count(100)
                .validate()
                .is_ok()
        );
    }

    #[test]
    fn test_validate_missing_security() {
        let err = SubscriptionSpec::new(DataKind::Ticks).validate().unwrap_err();
        assert_eq!(
            err,
            RequestError::MissingSecurity {
                kind: DataKind::Ticks
            }
        );
    }

    #[test]
    fn test_validate_empty_security_code() {
        let spec = SubscriptionSpec::level1(SecurityId::new("", "NASDAQ"));
        assert!(matches!(
            spec.validate(),
            Err(RequestError::EmptyField { .. })
        ));
    }

    #[test]
    fn test_validate_missing_portfolio() {
        let err = SubscriptionSpec::new(DataKind::Positions)
            .validate()
            .unwrap_err();
        assert!(matches!(err, RequestError::MissingPortfolio { .. }));
    }

    #[test]
    fn test_validate_bad_timeframe() {
        let spec = SubscriptionSpec::candles(aapl(), TimeDelta::zero());
        assert!(matches!(
            spec.validate(),
            Err(RequestError::InvalidTimeframe { seconds: 0 })
        ));

        let mut spec = SubscriptionSpec::new(DataKind::Candles).security(aapl());
        spec.timeframe = None;
        assert!(spec.validate().is_err());
    }

    #[test]
    fn test_validate_range_and_count() {
        let from = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        let to = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

        let spec = SubscriptionSpec::ticks(aapl()).range(from, to);
        assert!(matches!(
            spec.validate(),
            Err(RequestError::InvalidRange { .. })
        ));

        let spec = SubscriptionSpec::ticks(aapl()).range(to, from);
        assert!(spec.validate().is_ok());

        let spec = SubscriptionSpec::ticks(aapl()).count(0);
        assert_eq!(spec.validate(), Err(RequestError::ZeroCount));
    }

    #[test]
    fn test_spec_equality_ignores_nothing() {
        let a = SubscriptionSpec::level1(aapl());
        let b = SubscriptionSpec::level1(aapl());
        assert_eq!(a, b);
        assert_ne!(a, b.clone().via("backup"));
        assert_ne!(a, SubscriptionSpec::ticks(aapl()));
    }

    #[test]
    fn test_spec_display() {
        let spec = SubscriptionSpec::candles(aapl(), TimeDelta::minutes(1));
        assert_eq!(spec.to_string(), "candles AAPL@NASDAQ 60s");
        assert_eq!(
            SubscriptionSpec::positions("main").to_string(),
            "positions [main]"
        );
    }
}
