//! Subscription provider facade.

use crate::builder::{ProviderBuilder, ProviderConfig};
use crate::connector::{Ack, Connector, EventSink};
use crate::error::ProviderError;
use feedhub_core::messages::{
    Board, Candle, News, Order, OrderBook, OrderFail, OrderLogEntry, OwnTrade, Portfolio,
    Position, QuoteChange, SecurityInfo, TickTrade, TimeAdvance,
};
use feedhub_core::{
    Event, EventKind, EventTag, FailureInfo, StopInfo, SubscriptionError, SubscriptionSpec, tag,
};
use feedhub_router::{EventRouter, ListenerId, RegistrationError, Subscription};
use std::any::Any;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

macro_rules! data_listeners {
    ($($(#[$meta:meta])* $method:ident => $tag:ident($payload:ty);)*) => {
        $(
            $(#[$meta])*
            pub fn $method<F>(&self, f: F) -> ListenerId
            where
                F: Fn(&Subscription, &$payload) + Send + Sync + 'static,
            {
                self.router.listen::<tag::$tag, F>(f)
            }
        )*
    };
}

/// Consumer-facing entry point: subscribe, unsubscribe, listen.
///
/// Owns one [`EventRouter`] and the connectors built into it. Every method
/// takes `&self` and is safe to call from any thread, including from inside
/// a listener.
pub struct SubscriptionProvider {
    router: Arc<EventRouter>,
    connectors: Vec<Arc<dyn Connector>>,
    config: ProviderConfig,
    disposed: AtomicBool,
}

impl SubscriptionProvider {
    /// Starts building a provider.
    #[must_use]
    pub fn builder() -> ProviderBuilder {
        ProviderBuilder::new()
    }

    pub(crate) fn from_parts(
        router: Arc<EventRouter>,
        connectors: Vec<Arc<dyn Connector>>,
        config: ProviderConfig,
    ) -> Self {
        for connector in &connectors {
            connector.attach(EventSink::new(Arc::clone(&router)));
            tracing::info!("Attached connector {}", connector.id());
        }
        Self {
            router,
            connectors,
            config,
            disposed: AtomicBool::new(false),
        }
    }

    /// Router behind this provider.
    #[must_use]
    pub fn router(&self) -> &Arc<EventRouter> {
        &self.router
    }

    /// Inbound sink, for producers that are not registered connectors.
    #[must_use]
    pub fn sink(&self) -> EventSink {
        EventSink::new(Arc::clone(&self.router))
    }

    /// Provider configuration.
    #[must_use]
    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// Ids of the registered connectors, in registration order.
    #[must_use]
    pub fn connector_ids(&self) -> Vec<&str> {
        self.connectors.iter().map(|c| c.id()).collect()
    }

    /// Ordered snapshot of live subscriptions.
    #[must_use]
    pub fn subscriptions(&self) -> Vec<Arc<Subscription>> {
        self.router.subscriptions()
    }

    /// Creates a subscription and forwards it to a connector.
    ///
    /// The subscription starts `Pending`. If the connector cannot take the
    /// request, the subscription is still returned and fails through the
    /// normal `Failed` notification.
    ///
    /// # Errors
    /// `InvalidRequest`, `DuplicateSubscription` (when configured),
    /// `NoConnector`, `UnknownConnector` or `Disposed`. Nothing is
    /// registered on error.
    pub fn subscribe(&self, spec: SubscriptionSpec) -> Result<Arc<Subscription>, ProviderError> {
        if self.is_disposed() {
            return Err(ProviderError::Disposed);
        }
        spec.validate()?;
        let connector = self.select_connector(&spec)?;

        let subscription = Arc::new(Subscription::new(spec, connector.id()));
        if self.config.reject_duplicates {
            self.router
                .register_unique(Arc::clone(&subscription))
                .map_err(|existing| ProviderError::DuplicateSubscription {
                    existing: existing.id(),
                })?;
        } else {
            self.router.register(Arc::clone(&subscription));
        }
        // A dispose that ran after the first check may have missed it.
        if self.is_disposed() || self.router.is_disposed() {
            self.router.registry().retire(subscription.id());
            return Err(ProviderError::Disposed);
        }
        tracing::info!("Subscribed {} via {}", subscription, connector.id());

        if let Err(e) = connector.request_subscribe(subscription.id(), subscription.spec()) {
            tracing::warn!(
                "Connector {} refused {}: {}",
                connector.id(),
                subscription.id(),
                e
            );
            let failure = FailureInfo::subscription(e.into());
            let _ = self
                .router
                .deliver(subscription.id(), Event::Failed(failure));
        }
        Ok(subscription)
    }

    /// Stops a subscription.
    ///
    /// Idempotent: returns false and does nothing if the subscription is
    /// terminal, a stop was already requested, or it is not live in this
    /// provider. Safe to call from any listener; a stop for a subscription
    /// other than the one being dispatched lands after that dispatch ends.
    pub fn unsubscribe(&self, subscription: &Subscription) -> bool {
        if !self.router.begin_stop(subscription) {
            return false;
        }
        tracing::info!("Unsubscribing {}", subscription);

        let id = subscription.id();
        let outcome = match self.connector(subscription.connector()) {
            Some(connector) => connector.request_unsubscribe(id),
            None => Ok(Ack::Immediate),
        };
        let event = match outcome {
            Ok(Ack::Immediate) => Some(Event::Stopped(StopInfo::default())),
            Ok(Ack::Deferred) => None,
            Err(e) => {
                tracing::warn!("Unsubscribe of {} failed: {}", id, e);
                Some(Event::Failed(FailureInfo::subscription(e.into())))
            }
        };
        if let Some(event) = event {
            let _ = self.router.deliver(id, event);
        }
        true
    }

    /// Stops every live subscription and releases all listeners.
    ///
    /// Safe to call concurrently with dispatch and more than once. Also runs
    /// on drop.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        for subscription in self.router.subscriptions() {
            if !self.router.begin_stop(&subscription) {
                continue;
            }
            if let Some(connector) = self.connector(subscription.connector())
                && let Err(e) = connector.request_unsubscribe(subscription.id())
            {
                tracing::warn!(
                    "Unsubscribe of {} on dispose failed: {}",
                    subscription.id(),
                    e
                );
            }
        }
        self.router.shutdown(Some("provider disposed"));
        tracing::info!("Provider disposed");
    }

    /// Returns true after [`dispose`](Self::dispose).
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    data_listeners! {
        /// Level 1 changes.
        on_quote => Quote(QuoteChange);
        /// Order books.
        on_order_book => OrderBook(OrderBook);
        /// Tick trades.
        on_tick_trade => TickTrade(TickTrade);
        /// Order log entries.
        on_order_log => OrderLog(OrderLogEntry);
        /// Security descriptors.
        on_security => Security(SecurityInfo);
        /// Board descriptors.
        on_board => Board(Board);
        /// News.
        on_news => News(News);
        /// Candles.
        on_candle => Candle(Candle);
        /// Own trades.
        on_own_trade => OwnTrade(OwnTrade);
        /// Own orders.
        on_order => Order(Order);
        /// Order registration failures.
        on_order_register_fail => OrderRegisterFail(OrderFail);
        /// Order cancellation failures.
        on_order_cancel_fail => OrderCancelFail(OrderFail);
        /// Order edit failures.
        on_order_edit_fail => OrderEditFail(OrderFail);
        /// Portfolios.
        on_portfolio => Portfolio(Portfolio);
        /// Positions.
        on_position => Position(Position);
        /// Venue time advances.
        on_market_time => MarketTime(TimeAdvance);
    }

    /// Connector acknowledged a subscription.
    pub fn on_started<F>(&self, f: F) -> ListenerId
    where
        F: Fn(&Subscription) + Send + Sync + 'static,
    {
        self.router
            .listen::<tag::Started, _>(move |subscription, _: &()| f(subscription))
    }

    /// A subscription caught up with real time.
    pub fn on_online<F>(&self, f: F) -> ListenerId
    where
        F: Fn(&Subscription) + Send + Sync + 'static,
    {
        self.router
            .listen::<tag::Online, _>(move |subscription, _: &()| f(subscription))
    }

    /// A subscription ended normally, with an optional reason.
    pub fn on_stopped<F>(&self, f: F) -> ListenerId
    where
        F: Fn(&Subscription, Option<&str>) + Send + Sync + 'static,
    {
        self.router
            .listen::<tag::Stopped, _>(move |subscription, info: &StopInfo| {
                f(subscription, info.reason.as_deref());
            })
    }

    /// A subscription failed. The flag is true for provider-scoped faults.
    pub fn on_failed<F>(&self, f: F) -> ListenerId
    where
        F: Fn(&Subscription, &SubscriptionError, bool) + Send + Sync + 'static,
    {
        self.router
            .listen::<tag::Failed, _>(move |subscription, info: &FailureInfo| {
                f(subscription, &info.error, info.is_provider_fault);
            })
    }

    /// Every data event, whatever its kind.
    pub fn on_received<F>(&self, f: F) -> ListenerId
    where
        F: Fn(&Subscription, &Event) + Send + Sync + 'static,
    {
        self.router.on_received(f)
    }

    /// Provider-scoped failure of a connector, once per faulting envelope.
    pub fn on_provider_failed<F>(&self, f: F) -> ListenerId
    where
        F: Fn(&str, &SubscriptionError) + Send + Sync + 'static,
    {
        self.router.on_provider_failed(f)
    }

    /// Registers a listener for the kind named by `T`.
    pub fn listen<T, F>(&self, f: F) -> ListenerId
    where
        T: EventTag,
        F: Fn(&Subscription, &T::Payload) + Send + Sync + 'static,
    {
        self.router.listen::<T, F>(f)
    }

    /// Registers a listener for `kind` with a runtime payload check.
    ///
    /// # Errors
    /// Returns [`RegistrationError`] if `P` is not the payload of `kind`.
    pub fn add_listener<P, F>(
        &self,
        kind: EventKind,
        f: F,
    ) -> Result<ListenerId, RegistrationError>
    where
        P: Any + Send + Sync,
        F: Fn(&Subscription, &P) + Send + Sync + 'static,
    {
        self.router.add_listener::<P, F>(kind, f)
    }

    /// Unregisters any listener. Returns false if unknown.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.router.remove_listener(id)
    }

    fn connector(&self, id: &str) -> Option<&Arc<dyn Connector>> {
        self.connectors.iter().find(|c| c.id() == id)
    }

    fn select_connector(
        &self,
        spec: &SubscriptionSpec,
    ) -> Result<&Arc<dyn Connector>, ProviderError> {
        let connector = match &spec.connector {
            Some(id) => self
                .connector(id)
                .ok_or_else(|| ProviderError::UnknownConnector { id: id.clone() })?,
            None => self
                .connectors
                .iter()
                .find(|c| c.supports(spec.kind))
                .ok_or(ProviderError::NoConnector { kind: spec.kind })?,
        };
        if !connector.supports(spec.kind) {
            return Err(ProviderError::NoConnector { kind: spec.kind });
        }
        Ok(connector)
    }
}

impl Drop for SubscriptionProvider {
    fn drop(&mut self) {
        self.dispose();
    }
}
