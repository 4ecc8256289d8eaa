//! Dispatch benchmarks.
//!
//! Measures:
//! - Quote dispatch through the router with 1, 4 and 16 listeners
//! - Subscribe/unsubscribe round trip through the provider
//! - Clock advance driving an interval timer
//! - Tail latency of single dispatches, reported from a histogram
//!
//! Run with: cargo bench -p feedhub-bench --bench dispatch

use chrono::TimeDelta;
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use feedhub_bench::fixtures::{loopback_provider, quote, router_with_listeners, security};
use feedhub_bench::latency::LatencyCollector;
use feedhub_clock::{IntervalTimer, MarketClock};
use feedhub_core::SubscriptionSpec;
use std::hint::black_box;
use std::sync::Arc;

fn benchmark_quote_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("quote_dispatch");
    group.throughput(Throughput::Elements(1));

    for listeners in [1usize, 4, 16] {
        let (router, subscription) = router_with_listeners(listeners);
        let id = subscription.id();
        group.bench_with_input(
            BenchmarkId::from_parameter(listeners),
            &listeners,
            |b, _| {
                let mut price = 0i64;
                b.iter(|| {
                    price += 1;
                    black_box(router.deliver(id, quote(black_box(price))))
                })
            },
        );
    }

    group.finish();
}

fn benchmark_subscription_cycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("subscription");
    group.throughput(Throughput::Elements(1));

    group.bench_function("subscribe_unsubscribe", |b| {
        let (provider, _venue) = loopback_provider().unwrap();
        b.iter(|| {
            let sub = provider
                .subscribe(SubscriptionSpec::level1(security()))
                .unwrap();
            black_box(provider.unsubscribe(&sub))
        })
    });

    group.finish();
}

fn benchmark_clock_advance(c: &mut Criterion) {
    let mut group = c.benchmark_group("market_clock");
    group.throughput(Throughput::Elements(1));

    group.bench_function("advance_with_timer", |b| {
        let clock = MarketClock::new();
        let timer = IntervalTimer::new(Arc::clone(&clock), || {
            black_box(());
        });
        timer.interval(TimeDelta::seconds(1)).unwrap();
        timer.start().unwrap();
        b.iter(|| black_box(clock.advance(TimeDelta::milliseconds(10))))
    });

    group.finish();
}

fn benchmark_dispatch_latency(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch_latency");

    group.bench_function("p99_4_listeners", |b| {
        let (router, subscription) = router_with_listeners(4);
        let id = subscription.id();
        let mut collector = LatencyCollector::new().unwrap();
        b.iter(|| collector.measure(|| black_box(router.deliver(id, quote(1)))));

        if let Some(stats) = collector.stats() {
            println!(
                "dispatch latency over {} samples: p50 {:?}, p99 {:?}, p99.9 {:?}, max {:?}",
                stats.count, stats.median, stats.p99, stats.p999, stats.max
            );
        }
    });

    group.finish();
}

criterion_group!(
    benches,
    benchmark_quote_dispatch,
    benchmark_subscription_cycle,
    benchmark_clock_advance,
    benchmark_dispatch_latency
);
criterion_main!(benches);
