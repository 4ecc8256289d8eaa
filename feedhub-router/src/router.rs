//! Typed event router.
//!
//! Listeners are grouped by [`EventKind`]. Each listener stores the `TypeId`
//! of the payload it expects and a type-erased callback; the payload is
//! downcast once, here, right before the call.

use crate::error::{DispatchError, RegistrationError};
use crate::listener::{ListenerId, ListenerList};
use crate::registry::SubscriptionRegistry;
use crate::sink::{ErrorSink, TracingSink};
use crate::subscription::Subscription;
use feedhub_core::{
    Envelope, Event, EventKind, EventTag, FailureInfo, StopInfo, SubscriptionError,
    SubscriptionId,
};
use std::any::{Any, TypeId, type_name};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

type ErasedCall = dyn Fn(&Subscription, &(dyn Any + Send + Sync)) -> bool + Send + Sync;
type ReceivedFn = dyn Fn(&Subscription, &Event) + Send + Sync;
type ProviderFaultFn = dyn Fn(&str, &SubscriptionError) + Send + Sync;

const KIND_COUNT: usize = EventKind::ALL.len();

/// Work postponed because the thread was inside another subscription's
/// dispatch when it was requested.
enum Deferred {
    Route {
        envelope: Envelope,
        allow_cascade: bool,
    },
    ClearListeners,
}

thread_local! {
    // Sequence locks held by this thread, keyed by router address.
    static HELD: RefCell<Vec<(usize, SubscriptionId)>> = const { RefCell::new(Vec::new()) };
    // Work queued per router until this thread holds none of its locks.
    static DEFERRED: RefCell<VecDeque<(usize, Deferred)>> = const { RefCell::new(VecDeque::new()) };
}

/// Marks a sequence lock as held by the current thread while alive.
struct HeldFrame;

impl HeldFrame {
    fn enter(router: usize, id: SubscriptionId) -> Self {
        HELD.with_borrow_mut(|held| held.push((router, id)));
        Self
    }
}

impl Drop for HeldFrame {
    fn drop(&mut self) {
        HELD.with_borrow_mut(|held| {
            held.pop();
        });
    }
}

struct KindListener {
    expected: TypeId,
    expected_name: &'static str,
    call: Box<ErasedCall>,
}

impl KindListener {
    fn new<P, F>(f: F) -> Self
    where
        P: Any + Send + Sync,
        F: Fn(&Subscription, &P) + Send + Sync + 'static,
    {
        Self {
            expected: TypeId::of::<P>(),
            expected_name: type_name::<P>(),
            call: Box::new(
                move |subscription: &Subscription, payload: &(dyn Any + Send + Sync)| {
                    match payload.downcast_ref::<P>() {
                        Some(payload) => {
                            f(subscription, payload);
                            true
                        }
                        None => false,
                    }
                },
            ),
        }
    }
}

/// Router behaviour switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouterConfig {
    /// Fail every other live subscription of a connector when one of them
    /// reports a provider-scoped failure.
    pub cascade_provider_faults: bool,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            cascade_provider_faults: true,
        }
    }
}

/// Holds live subscriptions and fans envelopes out to listeners.
///
/// Envelopes for one subscription are delivered in arrival order; envelopes
/// for different subscriptions may run in parallel.
///
/// A thread never waits for one subscription's sequence lock while holding
/// another's. An envelope dispatched from inside a listener for a different
/// subscription is queued and routed once the outer dispatch has released
/// its lock.
pub struct EventRouter {
    registry: SubscriptionRegistry,
    kinds: [ListenerList<KindListener>; KIND_COUNT],
    received: ListenerList<ReceivedFn>,
    provider_faults: ListenerList<ProviderFaultFn>,
    sink: Arc<dyn ErrorSink>,
    config: RouterConfig,
    disposed: AtomicBool,
}

impl EventRouter {
    /// Creates a router with the default configuration.
    ///
    /// # Arguments
    /// * `sink` - Receives listener faults and protocol errors
    #[must_use]
    pub fn new(sink: Arc<dyn ErrorSink>) -> Self {
        Self::with_config(sink, RouterConfig::default())
    }

    /// Creates a router with an explicit configuration.
    #[must_use]
    pub fn with_config(sink: Arc<dyn ErrorSink>, config: RouterConfig) -> Self {
        Self {
            registry: SubscriptionRegistry::new(),
            kinds: std::array::from_fn(|_| ListenerList::new()),
            received: ListenerList::new(),
            provider_faults: ListenerList::new(),
            sink,
            config,
            disposed: AtomicBool::new(false),
        }
    }

    /// Router configuration.
    #[must_use]
    pub fn config(&self) -> RouterConfig {
        self.config
    }

    /// Error sink shared by this router.
    #[must_use]
    pub fn sink(&self) -> &Arc<dyn ErrorSink> {
        &self.sink
    }

    /// Subscription indexes.
    #[must_use]
    pub fn registry(&self) -> &SubscriptionRegistry {
        &self.registry
    }

    /// Makes a subscription known to the router.
    pub fn register(&self, subscription: Arc<Subscription>) {
        self.registry.insert(subscription);
    }

    /// Registers unless an equal request is already live.
    ///
    /// # Errors
    /// Returns the live subscription with the same spec.
    pub fn register_unique(
        &self,
        subscription: Arc<Subscription>,
    ) -> Result<(), Arc<Subscription>> {
        self.registry.insert_unique(subscription)
    }

    /// Looks up a live subscription.
    #[must_use]
    pub fn get(&self, id: SubscriptionId) -> Option<Arc<Subscription>> {
        self.registry.get(id)
    }

    /// Marks a live subscription as stopping.
    ///
    /// Returns false if the subscription is not live in this router, is
    /// terminal, or is already stopping. The caller that gets `true` owns
    /// the stop and must see it through to a terminal envelope.
    pub fn begin_stop(&self, subscription: &Subscription) -> bool {
        match self.registry.get(subscription.id()) {
            Some(live) => live.request_stop(),
            None => false,
        }
    }

    /// Ordered snapshot of non-terminal subscriptions.
    #[must_use]
    pub fn subscriptions(&self) -> Vec<Arc<Subscription>> {
        let mut live = self.registry.live();
        live.retain(|sub| !sub.is_terminal());
        live
    }

    /// Registers a listener for the kind named by `T`.
    ///
    /// The payload type is fixed by the tag, so this cannot fail.
    pub fn listen<T, F>(&self, f: F) -> ListenerId
    where
        T: EventTag,
        F: Fn(&Subscription, &T::Payload) + Send + Sync + 'static,
    {
        self.list(T::KIND)
            .push(Arc::new(KindListener::new::<T::Payload, F>(f)))
    }

    /// Registers a listener for `kind`, checking the payload type at runtime.
    ///
    /// # Errors
    /// Returns [`RegistrationError::PayloadType`] if `P` is not the payload
    /// type of `kind`.
    pub fn add_listener<P, F>(
        &self,
        kind: EventKind,
        f: F,
    ) -> Result<ListenerId, RegistrationError>
    where
        P: Any + Send + Sync,
        F: Fn(&Subscription, &P) + Send + Sync + 'static,
    {
        if TypeId::of::<P>() != kind.payload_type() {
            return Err(RegistrationError::PayloadType {
                kind,
                expected: kind.payload_type_name(),
                actual: type_name::<P>(),
            });
        }
        Ok(self.list(kind).push(Arc::new(KindListener::new::<P, F>(f))))
    }

    /// Registers a catch-all listener for every data event.
    pub fn on_received<F>(&self, f: F) -> ListenerId
    where
        F: Fn(&Subscription, &Event) + Send + Sync + 'static,
    {
        self.received.push(Arc::new(f))
    }

    /// Registers a listener for provider-scoped failures.
    ///
    /// Called once per faulting envelope with the connector id and error.
    pub fn on_provider_failed<F>(&self, f: F) -> ListenerId
    where
        F: Fn(&str, &SubscriptionError) + Send + Sync + 'static,
    {
        self.provider_faults.push(Arc::new(f))
    }

    /// Unregisters a listener of any kind. Returns false if unknown.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.kinds.iter().any(|list| list.remove(id))
            || self.received.remove(id)
            || self.provider_faults.remove(id)
    }

    /// Number of listeners registered for `kind`.
    #[must_use]
    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.list(kind).len()
    }

    /// Dispatches one envelope.
    ///
    /// Listener faults never surface here; they go to the error sink. The
    /// returned error is informational for the producer. Called from a
    /// listener for another subscription, the envelope is queued and this
    /// returns `Ok` before it is routed.
    ///
    /// # Errors
    /// `Disposed` after shutdown, `UnknownSubscription` for ids not live.
    pub fn dispatch(&self, envelope: Envelope) -> Result<(), DispatchError> {
        if self.is_disposed() {
            return Err(DispatchError::Disposed);
        }
        self.route(&envelope, true)
    }

    /// Shorthand for `dispatch(Envelope::new(id, event))`.
    ///
    /// # Errors
    /// See [`dispatch`](Self::dispatch).
    pub fn deliver(&self, id: SubscriptionId, event: Event) -> Result<(), DispatchError> {
        self.dispatch(Envelope::new(id, event))
    }

    /// Stops every live subscription and drops all listeners.
    ///
    /// Dispatches already running finish; later ones return `Disposed`.
    pub fn shutdown(&self, reason: Option<&str>) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        let live = self.registry.live();
        tracing::info!("Router shutting down with {} live subscriptions", live.len());
        for subscription in live {
            let stop = StopInfo {
                reason: reason.map(str::to_owned),
            };
            let _ = self.route(&Envelope::new(subscription.id(), Event::Stopped(stop)), false);
        }
        // Stops queued behind a running dispatch still reach their listeners.
        if self.holds_any() {
            self.defer(Deferred::ClearListeners);
        } else {
            self.clear_listeners();
        }
    }

    /// Returns true after [`shutdown`](Self::shutdown).
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    fn list(&self, kind: EventKind) -> &ListenerList<KindListener> {
        &self.kinds[kind as usize]
    }

    fn clear_listeners(&self) {
        for list in &self.kinds {
            list.clear();
        }
        self.received.clear();
        self.provider_faults.clear();
    }

    fn address(&self) -> usize {
        std::ptr::from_ref(self).addr()
    }

    fn holds_any(&self) -> bool {
        let router = self.address();
        HELD.with_borrow(|held| held.iter().any(|(r, _)| *r == router))
    }

    fn holds_other_than(&self, id: SubscriptionId) -> bool {
        let router = self.address();
        HELD.with_borrow(|held| held.iter().any(|(r, held_id)| *r == router && *held_id != id))
    }

    fn defer(&self, work: Deferred) {
        let router = self.address();
        DEFERRED.with_borrow_mut(|queue| queue.push_back((router, work)));
    }

    fn drain_deferred(&self) {
        let router = self.address();
        loop {
            let next = DEFERRED.with_borrow_mut(|queue| {
                let position = queue.iter().position(|(r, _)| *r == router)?;
                queue.remove(position).map(|(_, work)| work)
            });
            match next {
                Some(Deferred::Route {
                    envelope,
                    allow_cascade,
                }) => {
                    let _ = self.route(&envelope, allow_cascade);
                }
                Some(Deferred::ClearListeners) => self.clear_listeners(),
                None => break,
            }
        }
    }

    fn route(&self, envelope: &Envelope, allow_cascade: bool) -> Result<(), DispatchError> {
        let id = envelope.subscription;
        let kind = envelope.event.kind();

        let Some(subscription) = self.registry.get(id) else {
            return Err(self.unknown(id, kind));
        };

        if self.holds_other_than(id) {
            tracing::trace!("Deferred {} for subscription {}", kind, id);
            self.defer(Deferred::Route {
                envelope: envelope.clone(),
                allow_cascade,
            });
            return Ok(());
        }

        let result = self.route_sequenced(&subscription, envelope, allow_cascade);
        if !self.holds_any() {
            self.drain_deferred();
        }
        result
    }

    fn route_sequenced(
        &self,
        subscription: &Arc<Subscription>,
        envelope: &Envelope,
        allow_cascade: bool,
    ) -> Result<(), DispatchError> {
        let id = envelope.subscription;
        let event = &envelope.event;
        let kind = event.kind();

        let provider_fault = {
            let _sequence = subscription.sequence();
            let _frame = HeldFrame::enter(self.address(), id);

            if let Some(signal) = kind.lifecycle() {
                let failure = match event {
                    Event::Failed(failure) => Some(failure),
                    _ => None,
                };
                let Some((from, to)) = subscription.apply(signal, failure) else {
                    tracing::debug!(
                        "Ignored {} for subscription {} in state {}",
                        kind,
                        id,
                        subscription.state()
                    );
                    return Ok(());
                };
                tracing::debug!("Subscription {} {} -> {}", id, from, to);
            } else if subscription.is_terminal() {
                return Err(self.unknown(id, kind));
            }

            self.notify(subscription, event);

            if subscription.is_terminal() {
                self.registry.retire(id);
            }

            match event {
                Event::Failed(failure) if failure.is_provider_fault => {
                    tracing::error!(
                        "Provider fault on connector {} via subscription {}: {}",
                        subscription.connector(),
                        id,
                        failure.error
                    );
                    self.notify_provider_fault(subscription, &failure.error);
                    Some(failure.error.clone())
                }
                _ => None,
            }
        };

        if let Some(error) = provider_fault
            && allow_cascade
            && self.config.cascade_provider_faults
        {
            for other in self.registry.live_for_connector(subscription.connector()) {
                if other.id() == id {
                    continue;
                }
                let envelope =
                    Envelope::new(other.id(), Event::Failed(FailureInfo::provider(error.clone())));
                let _ = self.route(&envelope, false);
            }
        }

        Ok(())
    }

    fn notify(&self, subscription: &Subscription, event: &Event) {
        let kind = event.kind();
        let payload = event.payload();

        for (listener_id, listener) in self.list(kind).snapshot().iter() {
            let outcome = if listener.expected == Any::type_id(payload) {
                catch_unwind(AssertUnwindSafe(|| (listener.call)(subscription, payload)))
            } else {
                Ok(false)
            };
            match outcome {
                Ok(true) => {}
                Ok(false) => self.sink.report(&DispatchError::PayloadMismatch {
                    listener: *listener_id,
                    kind,
                    expected: listener.expected_name,
                    actual: kind.payload_type_name(),
                }),
                Err(panic) => self.fault(subscription, kind, *listener_id, panic.as_ref()),
            }
        }

        if event.is_lifecycle() {
            return;
        }
        for (listener_id, listener) in self.received.snapshot().iter() {
            if let Err(panic) = catch_unwind(AssertUnwindSafe(|| listener(subscription, event))) {
                self.fault(subscription, kind, *listener_id, panic.as_ref());
            }
        }
    }

    fn notify_provider_fault(&self, subscription: &Subscription, error: &SubscriptionError) {
        for (listener_id, listener) in self.provider_faults.snapshot().iter() {
            if let Err(panic) =
                catch_unwind(AssertUnwindSafe(|| listener(subscription.connector(), error)))
            {
                self.fault(subscription, EventKind::Failed, *listener_id, panic.as_ref());
            }
        }
    }

    fn fault(
        &self,
        subscription: &Subscription,
        kind: EventKind,
        listener: ListenerId,
        panic: &(dyn Any + Send),
    ) {
        self.sink.report(&DispatchError::ListenerFault {
            subscription: subscription.id(),
            kind,
            listener,
            message: panic_message(panic),
        });
    }

    fn unknown(&self, id: SubscriptionId, kind: EventKind) -> DispatchError {
        let error = DispatchError::UnknownSubscription {
            id,
            kind,
            retired: self.registry.is_retired(id),
        };
        self.sink.report(&error);
        error
    }
}

impl Default for EventRouter {
    fn default() -> Self {
        Self::new(Arc::new(TracingSink))
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "listener panicked".to_owned()
    }
}
