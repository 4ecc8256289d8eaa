//! Subscription lifecycle state machine.
//!
//! ```text
//! Pending --Started--> Active --Online--> Online
//!    |                   |                  |
//!    +------Stopped------+------------------+--> Stopped
//!    +------Failed-------+------------------+--> Failed
//! ```
//!
//! `Stopped` and `Failed` are terminal.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionState {
    /// Request sent, nothing acknowledged yet.
    Pending,
    /// Acknowledged; replaying history or streaming.
    Active,
    /// Caught up with real time.
    Online,
    /// Ended normally.
    Stopped,
    /// Ended with an error.
    Failed,
}

/// Lifecycle signal carried by an inbound envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleSignal {
    /// Connector acknowledged the request.
    Started,
    /// Feed caught up with real time.
    Online,
    /// Feed ended normally.
    Stopped,
    /// Feed ended with an error.
    Failed,
}

impl SubscriptionState {
    /// Returns true for `Stopped` and `Failed`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Stopped | Self::Failed)
    }

    /// Returns true while the feed may still deliver data.
    #[must_use]
    pub const fn is_live(self) -> bool {
        !self.is_terminal()
    }

    /// Returns the state reached by applying `signal`, or `None` when the
    /// signal has no edge out of the current state.
    #[must_use]
    pub const fn next(self, signal: LifecycleSignal) -> Option<Self> {
        match (self, signal) {
            (Self::Pending, LifecycleSignal::Started) => Some(Self::Active),
            (Self::Active, LifecycleSignal::Online) => Some(Self::Online),
            (Self::Pending | Self::Active | Self::Online, LifecycleSignal::Stopped) => {
                Some(Self::Stopped)
            }
            (Self::Pending | Self::Active | Self::Online, LifecycleSignal::Failed) => {
                Some(Self::Failed)
            }
            _ => None,
        }
    }
}

impl fmt::Display for SubscriptionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Online => "online",
            Self::Stopped => "stopped",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_STATES: [SubscriptionState; 5] = [
        SubscriptionState::Pending,
        SubscriptionState::Active,
        SubscriptionState::Online,
        SubscriptionState::Stopped,
        SubscriptionState::Failed,
    ];

    const ALL_SIGNALS: [LifecycleSignal; 4] = [
        LifecycleSignal::Started,
        LifecycleSignal::Online,
        LifecycleSignal::Stopped,
        LifecycleSignal::Failed,
    ];

    #[test]
    fn test_normal_path() {
        let state = SubscriptionState::Pending;
        let state = state.next(LifecycleSignal::Started).unwrap();
        assert_eq!(state, SubscriptionState::Active);
        let state = state.next(LifecycleSignal::Online).unwrap();
        assert_eq!(state, SubscriptionState::Online);
        let state = state.next(LifecycleSignal::Stopped).unwrap();
        assert_eq!(state, SubscriptionState::Stopped);
        assert!(state.is_terminal());
    }

    #[test]
    fn test_failure_from_every_live_state() {
        for state in ALL_STATES.iter().filter(|s| s.is_live()) {
            assert_eq!(
                state.next(LifecycleSignal::Failed),
                Some(SubscriptionState::Failed)
            );
        }
    }

    #[test]
    fn test_terminal_states_have_no_exits() {
        for state in ALL_STATES.iter().filter(|s| s.is_terminal()) {
            for signal in ALL_SIGNALS {
                assert_eq!(state.next(signal), None, "{state} on {signal:?}");
            }
        }
    }

    #[test]
    fn test_no_backward_edges() {
        assert_eq!(
            SubscriptionState::Active.next(LifecycleSignal::Started),
            None
        );
        assert_eq!(
            SubscriptionState::Online.next(LifecycleSignal::Started),
            None
        );
        assert_eq!(SubscriptionState::Online.next(LifecycleSignal::Online), None);
        assert_eq!(
            SubscriptionState::Pending.next(LifecycleSignal::Online),
            None
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(SubscriptionState::Online.to_string(), "online");
        assert_eq!(SubscriptionState::Failed.to_string(), "failed");
    }
}
