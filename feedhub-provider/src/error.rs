//! Error types for the provider and its connectors.

use feedhub_core::{DataKind, RequestError, SubscriptionError, SubscriptionId};
use feedhub_router::RegistrationError;
use thiserror::Error;

/// Error type for provider operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// The request failed validation. Nothing was registered.
    #[error("invalid request: {0}")]
    InvalidRequest(#[from] RequestError),

    /// An equal request is already live and duplicates are rejected.
    #[error("duplicate of live subscription {existing}")]
    DuplicateSubscription {
        /// The live subscription with the same request.
        existing: SubscriptionId,
    },

    /// No registered connector serves the data kind.
    #[error("no connector serves {kind}")]
    NoConnector {
        /// Requested data kind.
        kind: DataKind,
    },

    /// The request names a connector that is not registered.
    #[error("unknown connector: {id}")]
    UnknownConnector {
        /// Connector id from the request.
        id: String,
    },

    /// Two connectors were registered under the same id.
    #[error("connector {id} registered twice")]
    DuplicateConnector {
        /// Connector id.
        id: String,
    },

    /// Listener registration failed.
    #[error(transparent)]
    Registration(#[from] RegistrationError),

    /// The provider has been disposed.
    #[error("provider disposed")]
    Disposed,
}

/// Error returned by a connector for an outbound request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectorError {
    /// The request queue is full.
    #[error("request queue full")]
    QueueFull,

    /// The adapter side is gone.
    #[error("connector disconnected")]
    Disconnected,

    /// The connector refused the request.
    #[error("request rejected: {reason}")]
    Rejected {
        /// Rejection reason.
        reason: String,
    },
}

impl From<ConnectorError> for SubscriptionError {
    fn from(error: ConnectorError) -> Self {
        match error {
            ConnectorError::QueueFull => SubscriptionError::connector("request queue full"),
            ConnectorError::Disconnected => {
                SubscriptionError::disconnected("connector disconnected")
            }
            ConnectorError::Rejected { reason } => SubscriptionError::Rejected { reason },
        }
    }
}
