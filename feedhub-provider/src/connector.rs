//! Connector seam between the provider and venue adapters.
//!
//! Outbound, the provider calls [`Connector::request_subscribe`] and
//! [`Connector::request_unsubscribe`]; both return immediately. Inbound,
//! adapters push events through the [`EventSink`] they were attached to.

use crate::error::ConnectorError;
use feedhub_channel::{ChannelError, MpscReceiver, MpscSender, channel};
use feedhub_core::{DataKind, Envelope, Event, SubscriptionId, SubscriptionSpec};
use feedhub_router::{DispatchError, EventRouter};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// How a connector acknowledges an unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ack {
    /// Already stopped; the provider synthesizes the `Stopped` event.
    Immediate,
    /// The connector will deliver `Stopped` itself.
    Deferred,
}

/// Inbound handle given to every connector.
///
/// Cheap to clone; safe to use from any thread.
#[derive(Clone)]
pub struct EventSink {
    router: Arc<EventRouter>,
}

impl EventSink {
    pub(crate) fn new(router: Arc<EventRouter>) -> Self {
        Self { router }
    }

    /// Delivers one event for a subscription.
    ///
    /// # Errors
    /// Returns the router's [`DispatchError`]; listener faults are not
    /// returned, they go to the error sink.
    pub fn deliver(&self, id: SubscriptionId, event: Event) -> Result<(), DispatchError> {
        self.router.deliver(id, event)
    }

    /// Delivers a prebuilt envelope.
    ///
    /// # Errors
    /// See [`deliver`](Self::deliver).
    pub fn dispatch(&self, envelope: Envelope) -> Result<(), DispatchError> {
        self.router.dispatch(envelope)
    }
}

impl std::fmt::Debug for EventSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSink")
            .field("disposed", &self.router.is_disposed())
            .finish()
    }
}

/// Adapter to one venue.
pub trait Connector: Send + Sync {
    /// Unique id of this connector within a provider.
    fn id(&self) -> &str;

    /// Returns true if this connector can serve `kind`.
    fn supports(&self, _kind: DataKind) -> bool {
        true
    }

    /// Hands the connector its inbound sink. Called once, at build time.
    fn attach(&self, sink: EventSink);

    /// Asks the venue to start a feed.
    ///
    /// # Errors
    /// Returns an error if the request could not be sent; the provider
    /// fails the subscription with it.
    fn request_subscribe(
        &self,
        id: SubscriptionId,
        spec: &SubscriptionSpec,
    ) -> Result<(), ConnectorError>;

    /// Asks the venue to stop a feed.
    ///
    /// # Errors
    /// Returns an error if the request could not be sent.
    fn request_unsubscribe(&self, id: SubscriptionId) -> Result<Ack, ConnectorError>;
}

/// Outbound request as seen by an adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectorRequest {
    /// Start a feed.
    Subscribe {
        /// Subscription to tag events with.
        id: SubscriptionId,
        /// What to stream.
        spec: SubscriptionSpec,
    },
    /// Stop a feed.
    Unsubscribe {
        /// Subscription to stop.
        id: SubscriptionId,
    },
}

impl ConnectorRequest {
    /// Subscription the request is about.
    #[must_use]
    pub fn id(&self) -> SubscriptionId {
        match self {
            Self::Subscribe { id, .. } | Self::Unsubscribe { id } => *id,
        }
    }
}

type SharedSink = Arc<RwLock<Option<EventSink>>>;

fn deliver_via(sink: &SharedSink, id: SubscriptionId, event: Event) -> Result<(), DispatchError> {
    match sink.read().as_ref() {
        Some(sink) => sink.deliver(id, event),
        None => Err(DispatchError::Disposed),
    }
}

fn kinds_allow(kinds: Option<&[DataKind]>, kind: DataKind) -> bool {
    kinds.is_none_or(|kinds| kinds.contains(&kind))
}

/// Connector that queues requests for an adapter thread.
///
/// The adapter owns the paired [`ConnectorHandle`]: it drains requests and
/// delivers events back. Unsubscribe is acknowledged `Deferred`, so the
/// adapter must deliver `Stopped` for every feed it stops.
pub struct ChannelConnector {
    id: String,
    kinds: Option<Vec<DataKind>>,
    requests: MpscSender<ConnectorRequest>,
    sink: SharedSink,
}

impl ChannelConnector {
    /// Creates a connector and its adapter handle.
    ///
    /// # Arguments
    /// * `id` - Connector id
    /// * `capacity` - Maximum number of queued requests
    #[must_use]
    pub fn new(id: impl Into<String>, capacity: usize) -> (Self, ConnectorHandle) {
        let (requests, receiver) = channel(capacity);
        let sink: SharedSink = Arc::new(RwLock::new(None));
        let connector = Self {
            id: id.into(),
            kinds: None,
            requests,
            sink: Arc::clone(&sink),
        };
        let handle = ConnectorHandle {
            id: connector.id.clone(),
            requests: receiver,
            sink,
        };
        (connector, handle)
    }

    /// Restricts the data kinds this connector serves.
    #[must_use]
    pub fn with_kinds(mut self, kinds: impl IntoIterator<Item = DataKind>) -> Self {
        self.kinds = Some(kinds.into_iter().collect());
        self
    }

    fn push(&self, request: ConnectorRequest) -> Result<(), ConnectorError> {
        self.requests.try_send(request).map_err(|e| match e {
            ChannelError::Full(request) => {
                tracing::warn!("Connector {} queue full, dropped {:?}", self.id, request);
                ConnectorError::QueueFull
            }
            ChannelError::Disconnected(_) => ConnectorError::Disconnected,
        })
    }
}

impl Connector for ChannelConnector {
    fn id(&self) -> &str {
        &self.id
    }

    fn supports(&self, kind: DataKind) -> bool {
        kinds_allow(self.kinds.as_deref(), kind)
    }

    fn attach(&self, sink: EventSink) {
        *self.sink.write() = Some(sink);
    }

    fn request_subscribe(
        &self,
        id: SubscriptionId,
        spec: &SubscriptionSpec,
    ) -> Result<(), ConnectorError> {
        self.push(ConnectorRequest::Subscribe {
            id,
            spec: spec.clone(),
        })
    }

    fn request_unsubscribe(&self, id: SubscriptionId) -> Result<Ack, ConnectorError> {
        self.push(ConnectorRequest::Unsubscribe { id })?;
        Ok(Ack::Deferred)
    }
}

/// Adapter side of a [`ChannelConnector`].
pub struct ConnectorHandle {
    id: String,
    requests: MpscReceiver<ConnectorRequest>,
    sink: SharedSink,
}

impl ConnectorHandle {
    /// Connector id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Takes the next queued request, if any.
    pub fn try_recv(&self) -> Option<ConnectorRequest> {
        self.requests.try_recv()
    }

    /// Waits up to `timeout` for the next request.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<ConnectorRequest> {
        self.requests.recv_timeout(timeout)
    }

    /// Takes every queued request.
    pub fn drain(&self) -> Vec<ConnectorRequest> {
        self.requests.drain().collect()
    }

    /// Number of queued requests.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.requests.len()
    }

    /// Delivers an event into the provider.
    ///
    /// # Errors
    /// `Disposed` if the connector was never attached or the provider is
    /// gone; otherwise whatever the router reports.
    pub fn deliver(&self, id: SubscriptionId, event: Event) -> Result<(), DispatchError> {
        deliver_via(&self.sink, id, event)
    }

    /// Returns the attached sink.
    #[must_use]
    pub fn sink(&self) -> Option<EventSink> {
        self.sink.read().clone()
    }
}

/// In-process stub connector.
///
/// Records every request and acknowledges unsubscribes immediately. With
/// [`auto_start`](Self::auto_start) it also acknowledges subscribes by
/// delivering `Started` synchronously.
pub struct LoopbackConnector {
    id: String,
    kinds: Option<Vec<DataKind>>,
    auto_start: bool,
    requests: Mutex<Vec<ConnectorRequest>>,
    sink: SharedSink,
}

impl LoopbackConnector {
    /// Creates a loopback connector.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kinds: None,
            auto_start: false,
            requests: Mutex::new(Vec::new()),
            sink: Arc::new(RwLock::new(None)),
        }
    }

    /// Restricts the data kinds this connector serves.
    #[must_use]
    pub fn with_kinds(mut self, kinds: impl IntoIterator<Item = DataKind>) -> Self {
        self.kinds = Some(kinds.into_iter().collect());
        self
    }

    /// Delivers `Started` as soon as a subscribe request arrives.
    ///
    /// The request is forwarded inside `subscribe`, so with this switch on
    /// `subscribe` hands back a subscription that is already `Active`
    /// instead of `Pending`. Meant for tests and demos; a real connector
    /// acknowledges asynchronously.
    #[must_use]
    pub fn auto_start(mut self) -> Self {
        self.auto_start = true;
        self
    }

    /// Requests received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<ConnectorRequest> {
        self.requests.lock().clone()
    }

    /// Delivers an event into the provider.
    ///
    /// # Errors
    /// `Disposed` if not attached; otherwise whatever the router reports.
    pub fn deliver(&self, id: SubscriptionId, event: Event) -> Result<(), DispatchError> {
        deliver_via(&self.sink, id, event)
    }
}

impl Connector for LoopbackConnector {
    fn id(&self) -> &str {
        &self.id
    }

    fn supports(&self, kind: DataKind) -> bool {
        kinds_allow(self.kinds.as_deref(), kind)
    }

    fn attach(&self, sink: EventSink) {
        *self.sink.write() = Some(sink);
    }

    fn request_subscribe(
        &self,
        id: SubscriptionId,
        spec: &SubscriptionSpec,
    ) -> Result<(), ConnectorError> {
        self.requests.lock().push(ConnectorRequest::Subscribe {
            id,
            spec: spec.clone(),
        });
        if self.auto_start
            && let Err(e) = self.deliver(id, Event::Started)
        {
            tracing::debug!("Loopback {} could not start {}: {}", self.id, id, e);
        }
        Ok(())
    }

    fn request_unsubscribe(&self, id: SubscriptionId) -> Result<Ack, ConnectorError> {
        self.requests
            .lock()
            .push(ConnectorRequest::Unsubscribe { id });
        Ok(Ack::Immediate)
    }
}
