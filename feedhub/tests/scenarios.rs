//! End-to-end scenarios across provider, router and clock.

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use feedhub::prelude::*;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

type Errors = Arc<Mutex<Vec<DispatchError>>>;

fn server_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 11, 14, 0, 0).unwrap()
}

fn msft() -> SecurityId {
    SecurityId::new("MSFT", "NASDAQ")
}

fn quote(security_id: SecurityId, price: i64) -> Event {
    Event::Quote(QuoteChange {
        security_id,
        server_time: server_time(),
        changes: vec![Level1Change {
            field: Level1Field::LastPrice,
            value: price,
        }],
    })
}

fn provider_with(connectors: Vec<Arc<LoopbackConnector>>) -> (SubscriptionProvider, Errors) {
    let errors: Errors = Arc::new(Mutex::new(Vec::new()));
    let errors_clone = Arc::clone(&errors);
    let mut builder = SubscriptionProvider::builder()
        .error_sink(move |error: &DispatchError| errors_clone.lock().push(error.clone()));
    for connector in connectors {
        builder = builder.shared_connector(connector);
    }
    (builder.build().unwrap(), errors)
}

#[test]
fn test_quote_feed_lifecycle() {
    let venue = Arc::new(LoopbackConnector::new("sim").auto_start());
    let (provider, errors) = provider_with(vec![Arc::clone(&venue)]);

    let log = Arc::new(Mutex::new(Vec::new()));
    let started = Arc::clone(&log);
    provider.on_started(move |_| started.lock().push("started".to_owned()));
    let online = Arc::clone(&log);
    provider.on_online(move |_| online.lock().push("online".to_owned()));
    let quotes = Arc::clone(&log);
    provider.on_quote(move |_, change| {
        let price = change.get(Level1Field::LastPrice).unwrap_or_default();
        quotes.lock().push(format!("quote {price}"));
    });
    let stopped = Arc::clone(&log);
    provider.on_stopped(move |_, _| stopped.lock().push("stopped".to_owned()));

    let sub = provider.subscribe(SubscriptionSpec::level1(msft())).unwrap();
    assert_eq!(sub.state(), SubscriptionState::Active);

    venue.deliver(sub.id(), quote(msft(), 40_010)).unwrap();
    venue.deliver(sub.id(), Event::Online).unwrap();
    venue.deliver(sub.id(), quote(msft(), 40_020)).unwrap();
    assert_eq!(sub.state(), SubscriptionState::Online);

    assert!(provider.unsubscribe(&sub));
    assert_eq!(sub.state(), SubscriptionState::Stopped);

    let late = venue.deliver(sub.id(), quote(msft(), 40_030));
    assert_eq!(
        late,
        Err(DispatchError::UnknownSubscription {
            id: sub.id(),
            kind: EventKind::Quote,
            retired: true,
        })
    );

    assert_eq!(
        *log.lock(),
        vec!["started", "quote 40010", "online", "quote 40020", "stopped"]
    );
    assert_eq!(errors.lock().len(), 1);
    assert!(provider.subscriptions().is_empty());
}

#[test]
fn test_provider_fault_stays_on_its_connector() {
    let primary = Arc::new(LoopbackConnector::new("primary").auto_start());
    let backup = Arc::new(LoopbackConnector::new("backup").auto_start());
    let (provider, _) = provider_with(vec![Arc::clone(&primary), Arc::clone(&backup)]);

    let faulted = Arc::new(Mutex::new(Vec::new()));
    let faulted_clone = Arc::clone(&faulted);
    provider.on_provider_failed(move |connector, _| {
        faulted_clone.lock().push(connector.to_owned());
    });
    let failed = Arc::new(Mutex::new(Vec::new()));
    let failed_clone = Arc::clone(&failed);
    provider.on_failed(move |sub, _, is_provider_fault| {
        failed_clone.lock().push((sub.id(), is_provider_fault));
    });

    let quotes = provider.subscribe(SubscriptionSpec::level1(msft())).unwrap();
    let trades = provider.subscribe(SubscriptionSpec::ticks(msft())).unwrap();
    let hedge = provider
        .subscribe(SubscriptionSpec::level1(msft()).via("backup"))
        .unwrap();
    assert_eq!(quotes.connector(), "primary");
    assert_eq!(hedge.connector(), "backup");

    let error = SubscriptionError::disconnected("session dropped");
    primary
        .deliver(quotes.id(), Event::Failed(FailureInfo::provider(error)))
        .unwrap();

    assert_eq!(quotes.state(), SubscriptionState::Failed);
    assert_eq!(trades.state(), SubscriptionState::Failed);
    assert!(trades.is_provider_fault());
    assert_eq!(hedge.state(), SubscriptionState::Active);

    assert_eq!(*faulted.lock(), vec!["primary".to_owned()]);
    assert_eq!(
        *failed.lock(),
        vec![(quotes.id(), true), (trades.id(), true)]
    );
    assert_eq!(provider.subscriptions().len(), 1);
}

#[test]
fn test_faulty_listener_is_reported_and_skipped() {
    let venue = Arc::new(LoopbackConnector::new("sim").auto_start());
    let (provider, errors) = provider_with(vec![Arc::clone(&venue)]);

    let seen = Arc::new(AtomicUsize::new(0));
    let faulty = provider.on_quote(|_, _| panic!("bad strategy"));
    let seen_clone = Arc::clone(&seen);
    provider.on_quote(move |_, _| {
        seen_clone.fetch_add(1, Ordering::SeqCst);
    });

    let sub = provider.subscribe(SubscriptionSpec::level1(msft())).unwrap();
    venue.deliver(sub.id(), quote(msft(), 1)).unwrap();
    venue.deliver(sub.id(), quote(msft(), 2)).unwrap();

    assert_eq!(seen.load(Ordering::SeqCst), 2);
    let errors = errors.lock();
    assert_eq!(errors.len(), 2);
    assert!(errors.iter().all(|e| matches!(
        e,
        DispatchError::ListenerFault { listener, message, .. }
            if *listener == faulty && message.contains("bad strategy")
    )));
}

#[test]
fn test_unsubscribe_is_idempotent() {
    let venue = Arc::new(LoopbackConnector::new("sim").auto_start());
    let (provider, _) = provider_with(vec![Arc::clone(&venue)]);
    let stops = Arc::new(AtomicUsize::new(0));
    let stops_clone = Arc::clone(&stops);
    provider.on_stopped(move |_, _| {
        stops_clone.fetch_add(1, Ordering::SeqCst);
    });

    let sub = provider.subscribe(SubscriptionSpec::market_depth(msft())).unwrap();
    assert!(provider.unsubscribe(&sub));
    assert!(!provider.unsubscribe(&sub));

    let unsubscribes = venue
        .requests()
        .into_iter()
        .filter(|r| matches!(r, ConnectorRequest::Unsubscribe { .. }))
        .count();
    assert_eq!(unsubscribes, 1);
    assert_eq!(stops.load(Ordering::SeqCst), 1);
}

#[test]
fn test_resubscribe_after_stop_gets_fresh_id() {
    let venue = Arc::new(LoopbackConnector::new("sim").auto_start());
    let provider = SubscriptionProvider::builder()
        .shared_connector(venue)
        .reject_duplicates(true)
        .build()
        .unwrap();

    let first = provider.subscribe(SubscriptionSpec::level1(msft())).unwrap();
    let duplicate = provider.subscribe(SubscriptionSpec::level1(msft()));
    assert_eq!(
        duplicate.err(),
        Some(ProviderError::DuplicateSubscription {
            existing: first.id()
        })
    );

    provider.unsubscribe(&first);
    let second = provider.subscribe(SubscriptionSpec::level1(msft())).unwrap();
    assert_ne!(first.id(), second.id());
}

#[test]
fn test_per_subscription_order_with_concurrent_producers() {
    let venue = Arc::new(LoopbackConnector::new("sim").auto_start());
    let (provider, errors) = provider_with(vec![Arc::clone(&venue)]);

    let seen: Arc<Mutex<HashMap<SubscriptionId, Vec<i64>>>> =
        Arc::new(Mutex::new(HashMap::new()));
    let seen_clone = Arc::clone(&seen);
    provider.on_quote(move |sub, change| {
        let price = change.get(Level1Field::LastPrice).unwrap_or_default();
        seen_clone.lock().entry(sub.id()).or_default().push(price);
    });

    let subs: Vec<_> = (0..4)
        .map(|i| {
            let security = SecurityId::new(format!("S{i}"), "TEST");
            provider.subscribe(SubscriptionSpec::level1(security)).unwrap()
        })
        .collect();

    // Two producers per subscription, each owning a disjoint price range.
    let handles: Vec<_> = subs
        .iter()
        .flat_map(|sub| {
            let security = sub.spec().security_id.clone().unwrap();
            (0..2).map(move |producer| (sub.id(), security.clone(), producer))
        })
        .map(|(id, security, producer)| {
            let venue = Arc::clone(&venue);
            thread::spawn(move || {
                for n in 0..200 {
                    venue
                        .deliver(id, quote(security.clone(), producer * 1_000 + n))
                        .unwrap();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    let seen = seen.lock();
    for sub in &subs {
        let prices = &seen[&sub.id()];
        assert_eq!(prices.len(), 400);
        for producer in 0..2 {
            let own: Vec<_> = prices
                .iter()
                .filter(|p| **p / 1_000 == producer)
                .collect();
            assert!(own.windows(2).all(|w| w[0] < w[1]));
        }
    }
    assert!(errors.lock().is_empty());
}

#[test]
fn test_timer_follows_venue_time() {
    let venue = Arc::new(LoopbackConnector::new("sim").auto_start());
    let (provider, _) = provider_with(vec![Arc::clone(&venue)]);

    let clock = MarketClock::new();
    clock.attach(&provider);
    let fired = Arc::new(AtomicUsize::new(0));
    let fired_clone = Arc::clone(&fired);
    let timer = IntervalTimer::new(Arc::clone(&clock), move || {
        fired_clone.fetch_add(1, Ordering::SeqCst);
    });
    timer.interval(TimeDelta::seconds(1)).unwrap();
    timer.start().unwrap();

    let sub = provider.subscribe(SubscriptionSpec::market_time()).unwrap();
    for _ in 0..10 {
        let advance = TimeAdvance {
            diff: TimeDelta::milliseconds(250),
            server_time: server_time(),
        };
        venue.deliver(sub.id(), Event::MarketTime(advance)).unwrap();
    }

    assert_eq!(clock.elapsed(), TimeDelta::milliseconds(2_500));
    assert_eq!(fired.load(Ordering::SeqCst), 2);
    assert_eq!(timer.elapsed(), TimeDelta::milliseconds(500));

    timer.stop();
    let advance = TimeAdvance {
        diff: TimeDelta::seconds(5),
        server_time: server_time(),
    };
    venue.deliver(sub.id(), Event::MarketTime(advance)).unwrap();
    assert_eq!(fired.load(Ordering::SeqCst), 2);
}

#[test]
fn test_dispose_stops_live_subscriptions() {
    let venue = Arc::new(LoopbackConnector::new("sim").auto_start());
    let (provider, _) = provider_with(vec![Arc::clone(&venue)]);
    let reasons = Arc::new(Mutex::new(Vec::new()));
    let reasons_clone = Arc::clone(&reasons);
    provider.on_stopped(move |_, reason| {
        reasons_clone.lock().push(reason.map(str::to_owned));
    });

    let a = provider.subscribe(SubscriptionSpec::level1(msft())).unwrap();
    let b = provider.subscribe(SubscriptionSpec::ticks(msft())).unwrap();
    provider.dispose();
    provider.dispose();

    assert_eq!(a.state(), SubscriptionState::Stopped);
    assert_eq!(b.state(), SubscriptionState::Stopped);
    assert_eq!(
        *reasons.lock(),
        vec![Some("provider disposed".to_owned()); 2]
    );
    assert_eq!(
        provider.subscribe(SubscriptionSpec::level1(msft())).err(),
        Some(ProviderError::Disposed)
    );
    assert_eq!(
        venue.deliver(a.id(), quote(msft(), 1)),
        Err(DispatchError::Disposed)
    );
}
