//! Interval timer running on venue time.
//!
//! A simulated venue pushes market-time advances of uneven size. The clock
//! is fed from the provider and a timer fires every five venue seconds,
//! however fast the wall clock runs.
//!
//! Run with: `RUST_LOG=info cargo run --example market_timer`

use chrono::{TimeDelta, TimeZone, Utc};
use feedhub::prelude::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::Duration;

const STEPS_MILLIS: [i64; 10] = [1_500, 1_500, 1_000, 250, 3_000, 4_000, 500, 12_000, 1_000, 900];

fn run_venue(handle: ConnectorHandle) {
    let Some(mut server_time) = Utc.with_ymd_and_hms(2024, 6, 3, 10, 0, 0).single() else {
        return;
    };
    loop {
        let Some(request) = handle.recv_timeout(Duration::from_secs(5)) else {
            tracing::warn!("Venue idle, shutting down");
            return;
        };
        match request {
            ConnectorRequest::Subscribe { id, spec } => {
                tracing::info!("Venue serving {}", spec);
                let _ = handle.deliver(id, Event::Started);
                let _ = handle.deliver(id, Event::Online);
                for millis in STEPS_MILLIS {
                    let diff = TimeDelta::milliseconds(millis);
                    server_time += diff;
                    let advance = TimeAdvance { diff, server_time };
                    if let Err(e) = handle.deliver(id, Event::MarketTime(advance)) {
                        tracing::error!("Delivery failed: {}", e);
                    }
                }
            }
            ConnectorRequest::Unsubscribe { id } => {
                let _ = handle.deliver(id, Event::Stopped(StopInfo::default()));
                return;
            }
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let (builder, handle) = SubscriptionProvider::builder().channel_connector("venue");
    let provider = builder.build()?;

    let clock = MarketClock::new();
    clock.attach(&provider);

    let fired = Arc::new(AtomicU64::new(0));
    let fired_clone = Arc::clone(&fired);
    let weak_clock = Arc::downgrade(&clock);
    let timer = IntervalTimer::new(Arc::clone(&clock), move || {
        let n = fired_clone.fetch_add(1, Ordering::Relaxed) + 1;
        if let Some(clock) = weak_clock.upgrade() {
            println!(
                "Timer #{} at venue offset {}s (server time {:?})",
                n,
                clock.elapsed().num_milliseconds() as f64 / 1000.0,
                clock.last_server_time()
            );
        }
    });
    timer.interval(TimeDelta::seconds(5))?;
    timer.start()?;

    let (stopped_tx, stopped_rx) = feedhub::channel::channel(1);
    provider.on_stopped(move |sub, _| {
        let _ = stopped_tx.try_send(sub.id());
    });

    let venue = thread::spawn(move || run_venue(handle));
    let subscription = provider.subscribe(SubscriptionSpec::market_time())?;

    // Wait for the whole script before asking the venue to stop.
    let total = STEPS_MILLIS.iter().sum::<i64>();
    let deadline = std::time::Instant::now() + Duration::from_secs(5);
    while clock.elapsed() < TimeDelta::milliseconds(total) && std::time::Instant::now() < deadline
    {
        thread::sleep(Duration::from_millis(10));
    }

    provider.unsubscribe(&subscription);
    if stopped_rx.recv_timeout(Duration::from_secs(5)).is_none() {
        tracing::warn!("Venue never confirmed the stop");
    }
    if venue.join().is_err() {
        tracing::error!("Venue thread panicked");
    }

    timer.stop();
    clock.detach();
    println!(
        "Venue time: {}ms, timer fired {} times",
        clock.elapsed().num_milliseconds(),
        timer.fired()
    );
    Ok(())
}
