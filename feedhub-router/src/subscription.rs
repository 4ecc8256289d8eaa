//! Registry-owned subscription handle.

use chrono::{DateTime, Utc};
use feedhub_core::{
    DataKind, FailureInfo, LifecycleSignal, SubscriptionError, SubscriptionId, SubscriptionSpec,
    SubscriptionState,
};
use parking_lot::{Mutex, ReentrantMutex, ReentrantMutexGuard};
use std::fmt;

#[derive(Debug)]
struct Status {
    state: SubscriptionState,
    error: Option<SubscriptionError>,
    provider_fault: bool,
    stop_requested: bool,
}

/// One logical feed request and its lifecycle state.
///
/// Consumers hold `Arc<Subscription>` handles and can read state at any
/// time; only the router changes it, by applying lifecycle envelopes.
/// Equality is identity: two handles are equal iff their ids are.
pub struct Subscription {
    id: SubscriptionId,
    spec: SubscriptionSpec,
    connector: String,
    created_at: DateTime<Utc>,
    status: Mutex<Status>,
    // Serializes dispatch per subscription. Re-entrant so a listener can
    // unsubscribe its own feed against a synchronous connector.
    sequence: ReentrantMutex<()>,
}

impl Subscription {
    /// Creates a `Pending` subscription with a fresh id.
    pub fn new(spec: SubscriptionSpec, connector: impl Into<String>) -> Self {
        Self {
            id: SubscriptionId::next(),
            spec,
            connector: connector.into(),
            created_at: Utc::now(),
            status: Mutex::new(Status {
                state: SubscriptionState::Pending,
                error: None,
                provider_fault: false,
                stop_requested: false,
            }),
            sequence: ReentrantMutex::new(()),
        }
    }

    /// Identifier.
    #[must_use]
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Request this subscription was created from.
    #[must_use]
    pub fn spec(&self) -> &SubscriptionSpec {
        &self.spec
    }

    /// Requested data kind.
    #[must_use]
    pub fn kind(&self) -> DataKind {
        self.spec.kind
    }

    /// Id of the connector serving this subscription.
    #[must_use]
    pub fn connector(&self) -> &str {
        &self.connector
    }

    /// Creation time (wall clock).
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> SubscriptionState {
        self.status.lock().state
    }

    /// Error recorded by the `Failed` transition.
    #[must_use]
    pub fn error(&self) -> Option<SubscriptionError> {
        self.status.lock().error.clone()
    }

    /// True if the failure was connector-wide.
    #[must_use]
    pub fn is_provider_fault(&self) -> bool {
        self.status.lock().provider_fault
    }

    /// True once `Stopped` or `Failed`.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.state().is_terminal()
    }

    /// True once a stop has been requested.
    #[must_use]
    pub fn is_stop_requested(&self) -> bool {
        self.status.lock().stop_requested
    }

    /// Marks that a stop was requested.
    ///
    /// Returns false (and changes nothing) if a stop was already requested or
    /// the subscription is terminal. Reached through
    /// [`EventRouter::begin_stop`](crate::EventRouter::begin_stop).
    pub(crate) fn request_stop(&self) -> bool {
        let mut status = self.status.lock();
        if status.stop_requested || status.state.is_terminal() {
            return false;
        }
        status.stop_requested = true;
        true
    }

    /// Applies a lifecycle signal. Returns `(from, to)` when an edge exists.
    pub(crate) fn apply(
        &self,
        signal: LifecycleSignal,
        failure: Option<&FailureInfo>,
    ) -> Option<(SubscriptionState, SubscriptionState)> {
        let mut status = self.status.lock();
        let from = status.state;
        let to = from.next(signal)?;
        status.state = to;
        if let Some(failure) = failure {
            status.error = Some(failure.error.clone());
            status.provider_fault = failure.is_provider_fault;
        }
        Some((from, to))
    }

    pub(crate) fn sequence(&self) -> ReentrantMutexGuard<'_, ()> {
        self.sequence.lock()
    }
}

impl PartialEq for Subscription {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Subscription {}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("spec", &self.spec)
            .field("connector", &self.connector)
            .field("state", &self.state())
            .finish()
    }
}

impl fmt::Display for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({})", self.id, self.spec, self.state())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use feedhub_core::SecurityId;

    fn quotes() -> Subscription {
        Subscription::new(
            SubscriptionSpec::level1(SecurityId::new("AAPL", "NASDAQ")),
            "sim",
        )
    }

    #[test]
    fn test_new_is_pending() {
        let sub = quotes();
        assert_eq!(sub.state(), SubscriptionState::Pending);
        assert_eq!(sub.kind(), DataKind::Level1);
        assert_eq!(sub.connector(), "sim");
        assert!(sub.error().is_none());
        assert!(!sub.is_terminal());
    }

    #[test]
    fn test_ids_differ() {
        assert_ne!(quotes().id(), quotes().id());
    }

    #[test]
    fn test_apply_follows_edges() {
        let sub = quotes();
        assert_eq!(
            sub.apply(LifecycleSignal::Online, None),
            None,
            "pending has no online edge"
        );
        assert_eq!(
            sub.apply(LifecycleSignal::Started, None),
            Some((SubscriptionState::Pending, SubscriptionState::Active))
        );
        assert_eq!(
            sub.apply(LifecycleSignal::Online, None),
            Some((SubscriptionState::Active, SubscriptionState::Online))
        );
    }

    #[test]
    fn test_apply_failure_records_error() {
        let sub = quotes();
        let failure = FailureInfo::provider(SubscriptionError::disconnected("lost"));

        sub.apply(LifecycleSignal::Failed, Some(&failure));
        assert_eq!(sub.state(), SubscriptionState::Failed);
        assert_eq!(sub.error(), Some(failure.error.clone()));
        assert!(sub.is_provider_fault());

        assert_eq!(sub.apply(LifecycleSignal::Stopped, None), None);
        assert_eq!(sub.state(), SubscriptionState::Failed);
    }

    #[test]
    fn test_request_stop_once() {
        let sub = quotes();
        assert!(sub.request_stop());
        assert!(!sub.request_stop());
        assert!(sub.is_stop_requested());
    }

    #[test]
    fn test_request_stop_after_terminal() {
        let sub = quotes();
        sub.apply(LifecycleSignal::Stopped, None);
        assert!(!sub.request_stop());
    }

    #[test]
    fn test_sequence_lock_is_reentrant() {
        let sub = quotes();
        let _outer = sub.sequence();
        let _inner = sub.sequence();
    }

    #[test]
    fn test_display() {
        let sub = quotes();
        let text = sub.to_string();
        assert!(text.contains("level1 AAPL@NASDAQ"));
        assert!(text.contains("pending"));
    }
}
