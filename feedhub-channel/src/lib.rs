//! # feedhub Channel
//!
//! Bounded multi-producer single-consumer queue used between the
//! subscription provider and connector adapter threads.
//!
//! Sends never block: a full queue hands the item back so the caller can
//! decide whether to fail the request. The consumer side can poll, wait with
//! a timeout, or block until every sender is gone.

pub mod mpsc;

pub use mpsc::{MpscReceiver, MpscSender, channel};

/// Error returned by channel operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelError<T> {
    /// Channel is full, item returned.
    Full(T),
    /// Receiver is gone, item returned.
    Disconnected(T),
}

impl<T> ChannelError<T> {
    /// Recovers the rejected item.
    pub fn into_inner(self) -> T {
        match self {
            Self::Full(item) | Self::Disconnected(item) => item,
        }
    }

    /// Returns true if the receiver is gone.
    #[must_use]
    pub fn is_disconnected(&self) -> bool {
        matches!(self, Self::Disconnected(_))
    }
}

impl<T> std::fmt::Display for ChannelError<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Full(_) => write!(f, "channel full"),
            Self::Disconnected(_) => write!(f, "channel disconnected"),
        }
    }
}

impl<T: std::fmt::Debug> std::error::Error for ChannelError<T> {}
