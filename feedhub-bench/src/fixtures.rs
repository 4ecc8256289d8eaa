//! Ready-made routers, providers and events for benchmarks.

use chrono::{TimeZone, Utc};
use feedhub_core::{Event, Level1Change, Level1Field, QuoteChange, SecurityId, SubscriptionSpec};
use feedhub_provider::{LoopbackConnector, ProviderError, SubscriptionProvider};
use feedhub_router::{EventRouter, Subscription, TracingSink};
use std::hint::black_box;
use std::sync::Arc;

/// Security used by every fixture.
#[must_use]
pub fn security() -> SecurityId {
    SecurityId::new("ES", "CME")
}

/// Level 1 event carrying a last price.
#[must_use]
pub fn quote(price: i64) -> Event {
    Event::Quote(QuoteChange {
        security_id: security(),
        server_time: Utc.timestamp_nanos(1_700_000_000_000_000_000),
        changes: vec![
            Level1Change {
                field: Level1Field::LastPrice,
                value: price,
            },
            Level1Change {
                field: Level1Field::LastVolume,
                value: 1,
            },
        ],
    })
}

/// Router with one started subscription and `listeners` quote listeners.
#[must_use]
pub fn router_with_listeners(listeners: usize) -> (Arc<EventRouter>, Arc<Subscription>) {
    let router = Arc::new(EventRouter::new(Arc::new(TracingSink)));
    let subscription = Arc::new(Subscription::new(
        SubscriptionSpec::level1(security()),
        "bench",
    ));
    router.register(Arc::clone(&subscription));
    let _ = router.deliver(subscription.id(), Event::Started);

    for _ in 0..listeners {
        router.listen::<feedhub_core::tag::Quote, _>(|_, change: &QuoteChange| {
            black_box(change.get(Level1Field::LastPrice));
        });
    }
    (router, subscription)
}

/// Provider over an auto-starting loopback connector.
///
/// # Errors
/// Returns an error if the provider cannot be built.
pub fn loopback_provider() -> Result<(SubscriptionProvider, Arc<LoopbackConnector>), ProviderError> {
    let venue = Arc::new(LoopbackConnector::new("bench").auto_start());
    let provider = SubscriptionProvider::builder()
        .shared_connector(venue.clone())
        .build()?;
    Ok((provider, venue))
}

#[cfg(test)]
mod tests {
    use super::*;
    use feedhub_core::{EventKind, SubscriptionState};

    #[test]
    fn test_router_fixture() {
        let (router, subscription) = router_with_listeners(3);
        assert_eq!(subscription.state(), SubscriptionState::Active);
        assert_eq!(router.listener_count(EventKind::Quote), 3);
        assert!(router.deliver(subscription.id(), quote(100)).is_ok());
    }

    #[test]
    fn test_loopback_provider() {
        let (provider, _venue) = loopback_provider().unwrap();
        let sub = provider
            .subscribe(SubscriptionSpec::level1(security()))
            .unwrap();
        assert_eq!(sub.state(), SubscriptionState::Active);
    }
}
