//! Error types for dispatch and listener registration.

use crate::listener::ListenerId;
use feedhub_core::{EventKind, SubscriptionId};
use thiserror::Error;

/// Problems found while dispatching an envelope.
///
/// None of these reach the consumer through a return value of a consumer
/// API; they go to the router's [`ErrorSink`](crate::ErrorSink). Producers
/// get them back from `dispatch` for information only.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// Envelope names a subscription that is not live.
    #[error("unknown subscription {id} for {kind} event (retired: {retired})")]
    UnknownSubscription {
        /// Subscription named by the envelope.
        id: SubscriptionId,
        /// Kind of the dropped event.
        kind: EventKind,
        /// True if the id was live earlier and has since ended.
        retired: bool,
    },

    /// A listener panicked.
    #[error("listener {listener} faulted on {kind} for subscription {subscription}: {message}")]
    ListenerFault {
        /// Subscription being dispatched.
        subscription: SubscriptionId,
        /// Kind being dispatched.
        kind: EventKind,
        /// Faulting listener.
        listener: ListenerId,
        /// Panic message.
        message: String,
    },

    /// A listener's expected payload type does not match the event.
    #[error("listener {listener} expects {expected} but {kind} carries {actual}")]
    PayloadMismatch {
        /// Listener that was skipped.
        listener: ListenerId,
        /// Kind being dispatched.
        kind: EventKind,
        /// Payload type the listener wants.
        expected: &'static str,
        /// Payload type the kind carries.
        actual: &'static str,
    },

    /// The router has been shut down.
    #[error("router disposed")]
    Disposed,
}

/// Listener registration failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    /// The payload type does not belong to the kind.
    #[error("{kind} carries {expected}, not {actual}")]
    PayloadType {
        /// Kind requested.
        kind: EventKind,
        /// Payload type of that kind.
        expected: &'static str,
        /// Payload type offered.
        actual: &'static str,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_error_display() {
        let err = DispatchError::UnknownSubscription {
            id: SubscriptionId::from_raw(9),
            kind: EventKind::Quote,
            retired: true,
        };
        assert_eq!(
            err.to_string(),
            "unknown subscription #9 for Quote event (retired: true)"
        );
        assert_eq!(DispatchError::Disposed.to_string(), "router disposed");
    }

    #[test]
    fn test_registration_error_display() {
        let err = RegistrationError::PayloadType {
            kind: EventKind::Candle,
            expected: "Candle",
            actual: "TickTrade",
        };
        assert_eq!(err.to_string(), "Candle carries Candle, not TickTrade");
    }
}
