//! Error types for subscription requests and failed feeds.

use crate::types::DataKind;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A malformed subscription request.
///
/// Raised synchronously by [`SubscriptionSpec::validate`](crate::SubscriptionSpec::validate)
/// before anything is registered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    /// The data kind needs an instrument but none was given.
    #[error("{kind} subscription requires a security id")]
    MissingSecurity {
        /// Requested data kind.
        kind: DataKind,
    },

    /// The data kind needs an account but none was given.
    #[error("{kind} subscription requires a portfolio")]
    MissingPortfolio {
        /// Requested data kind.
        kind: DataKind,
    },

    /// Candle timeframe is zero or negative.
    #[error("candle timeframe must be positive, got {seconds}s")]
    InvalidTimeframe {
        /// Timeframe in whole seconds.
        seconds: i64,
    },

    /// Historical range ends before it starts.
    #[error("invalid range: from {from} is after to {to}")]
    InvalidRange {
        /// Range start (RFC 3339).
        from: String,
        /// Range end (RFC 3339).
        to: String,
    },

    /// A `count` of zero was requested.
    #[error("count must be greater than zero")]
    ZeroCount,

    /// An identifier field is present but empty.
    #[error("{field} must not be empty")]
    EmptyField {
        /// Field name.
        field: &'static str,
    },
}

/// The error carried by a `Failed` lifecycle signal.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum SubscriptionError {
    /// The venue refused the request.
    #[error("rejected by venue: {reason}")]
    Rejected {
        /// Reason reported by the venue.
        reason: String,
    },

    /// The connector could not process the request.
    #[error("connector error: {message}")]
    Connector {
        /// Error message.
        message: String,
    },

    /// The connection to the venue was lost.
    #[error("disconnected: {message}")]
    Disconnected {
        /// Error message.
        message: String,
    },

    /// Any other failure.
    #[error("{message}")]
    Other {
        /// Error message.
        message: String,
    },
}

impl SubscriptionError {
    /// Creates a connector error from anything displayable.
    pub fn connector(message: impl Into<String>) -> Self {
        Self::Connector {
            message: message.into(),
        }
    }

    /// Creates a disconnect error.
    pub fn disconnected(message: impl Into<String>) -> Self {
        Self::Disconnected {
            message: message.into(),
        }
    }
}
