//! Provider configuration and builder.

use crate::connector::{ChannelConnector, Connector, ConnectorHandle};
use crate::error::ProviderError;
use crate::provider::SubscriptionProvider;
use feedhub_router::{ErrorSink, EventRouter, RouterConfig, TracingSink};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

/// Scalar provider options.
///
/// Deserializable so a host application can load it from its own config.
/// Missing fields take their defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Reject a subscribe whose spec equals a live subscription's.
    pub reject_duplicates: bool,
    /// Fail all subscriptions of a connector on a provider-scoped fault.
    pub cascade_provider_faults: bool,
    /// Request queue capacity for connectors created by the builder.
    pub request_capacity: usize,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            reject_duplicates: false,
            cascade_provider_faults: true,
            request_capacity: 1024,
        }
    }
}

/// Builder for configuring and creating a [`SubscriptionProvider`].
pub struct ProviderBuilder {
    config: ProviderConfig,
    connectors: Vec<Arc<dyn Connector>>,
    sink: Option<Arc<dyn ErrorSink>>,
}

impl ProviderBuilder {
    /// Creates a builder with default settings and no connectors.
    #[must_use]
    pub fn new() -> Self {
        Self::from_config(ProviderConfig::default())
    }

    /// Creates a builder from loaded configuration.
    #[must_use]
    pub fn from_config(config: ProviderConfig) -> Self {
        Self {
            config,
            connectors: Vec::new(),
            sink: None,
        }
    }

    /// Adds a connector. Earlier connectors win when several serve a kind.
    #[must_use]
    pub fn connector<C: Connector + 'static>(self, connector: C) -> Self {
        self.shared_connector(Arc::new(connector))
    }

    /// Adds a connector the caller keeps a handle to.
    #[must_use]
    pub fn shared_connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connectors.push(connector);
        self
    }

    /// Adds a [`ChannelConnector`] sized by `request_capacity` and returns
    /// its adapter handle.
    #[must_use]
    pub fn channel_connector(self, id: impl Into<String>) -> (Self, ConnectorHandle) {
        let (connector, handle) = ChannelConnector::new(id, self.config.request_capacity);
        (self.connector(connector), handle)
    }

    /// Sets duplicate rejection.
    #[must_use]
    pub fn reject_duplicates(mut self, reject: bool) -> Self {
        self.config.reject_duplicates = reject;
        self
    }

    /// Sets provider-fault cascading.
    #[must_use]
    pub fn cascade_provider_faults(mut self, cascade: bool) -> Self {
        self.config.cascade_provider_faults = cascade;
        self
    }

    /// Sets the request queue capacity for builder-created connectors.
    #[must_use]
    pub fn request_capacity(mut self, capacity: usize) -> Self {
        self.config.request_capacity = capacity;
        self
    }

    /// Sets the error sink. Defaults to [`TracingSink`].
    #[must_use]
    pub fn error_sink<S: ErrorSink + 'static>(mut self, sink: S) -> Self {
        self.sink = Some(Arc::new(sink));
        self
    }

    /// Current configuration.
    #[must_use]
    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// Builds the provider and attaches every connector to it.
    ///
    /// # Errors
    /// Returns `DuplicateConnector` if two connectors share an id.
    pub fn build(self) -> Result<SubscriptionProvider, ProviderError> {
        let mut seen = HashSet::new();
        for connector in &self.connectors {
            if !seen.insert(connector.id().to_owned()) {
                return Err(ProviderError::DuplicateConnector {
                    id: connector.id().to_owned(),
                });
            }
        }

        let sink = self.sink.unwrap_or_else(|| Arc::new(TracingSink));
        let router = Arc::new(EventRouter::with_config(
            sink,
            RouterConfig {
                cascade_provider_faults: self.config.cascade_provider_faults,
            },
        ));
        Ok(SubscriptionProvider::from_parts(
            router,
            self.connectors,
            self.config,
        ))
    }
}

impl Default for ProviderBuilder {
    fn default() -> Self {
        Self::new()
    }
}
