//! Counter-trend strategy on finished candles.
//!
//! Counts consecutive bullish and bearish candles and signals against the run
//! once it reaches `length`. A channel connector plays the venue on its own
//! thread and replays a fixed candle history.
//!
//! Run with: `RUST_LOG=info cargo run --example stairs_countertrend`

use chrono::{TimeDelta, TimeZone, Utc};
use feedhub::prelude::*;
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const CLOSES: [i64; 14] = [
    101, 103, 106, 110, 108, 104, 101, 97, 99, 100, 102, 105, 104, 103,
];

#[derive(Debug, Default)]
struct StairsState {
    subscription: Option<Arc<Subscription>>,
    bull_length: u32,
    bear_length: u32,
    position: i64,
    signals: u32,
}

/// Sells after `length` rising candles, buys after `length` falling ones.
struct StairsCountertrend {
    provider: Arc<SubscriptionProvider>,
    security: SecurityId,
    timeframe: TimeDelta,
    length: u32,
    volume: i64,
    state: Arc<Mutex<StairsState>>,
    listener: Mutex<Option<ListenerId>>,
}

impl StairsCountertrend {
    fn new(
        provider: Arc<SubscriptionProvider>,
        security: SecurityId,
        timeframe: TimeDelta,
    ) -> Self {
        Self {
            provider,
            security,
            timeframe,
            length: 3,
            volume: 1,
            state: Arc::new(Mutex::new(StairsState::default())),
            listener: Mutex::new(None),
        }
    }

    fn start(&self) -> Result<(), ProviderError> {
        let spec = SubscriptionSpec::candles(self.security.clone(), self.timeframe);
        let state = Arc::clone(&self.state);
        let length = self.length;
        let volume = self.volume;
        let filter = spec.clone();
        let listener = self.provider.on_candle(move |sub, candle| {
            // The venue may answer before `subscribe` returns, so match on the spec.
            if *sub.spec() != filter || !candle.is_finished() {
                return;
            }
            let mut state = state.lock();

            if candle.is_bullish() {
                state.bull_length += 1;
                state.bear_length = 0;
            } else if candle.is_bearish() {
                state.bull_length = 0;
                state.bear_length += 1;
            }

            if state.bull_length >= length && state.position >= 0 {
                let quantity = volume + state.position.abs();
                state.position -= quantity;
                state.signals += 1;
                tracing::info!(
                    "SELL {} at {} after {} rising candles, position {}",
                    quantity,
                    candle.close,
                    state.bull_length,
                    state.position
                );
            } else if state.bear_length >= length && state.position <= 0 {
                let quantity = volume + state.position.abs();
                state.position += quantity;
                state.signals += 1;
                tracing::info!(
                    "BUY {} at {} after {} falling candles, position {}",
                    quantity,
                    candle.close,
                    state.bear_length,
                    state.position
                );
            }
        });
        *self.listener.lock() = Some(listener);

        let subscription = self.provider.subscribe(spec)?;
        tracing::info!("Strategy subscribed: {}", subscription);
        self.state.lock().subscription = Some(subscription);
        Ok(())
    }

    fn stop(&self) {
        let subscription = self.state.lock().subscription.take();
        if let Some(subscription) = subscription {
            self.provider.unsubscribe(&subscription);
        }
        if let Some(listener) = self.listener.lock().take() {
            self.provider.remove_listener(listener);
        }
    }
}

fn run_venue(handle: ConnectorHandle) {
    let base = Utc.with_ymd_and_hms(2024, 6, 3, 13, 30, 0).single();
    loop {
        let Some(request) = handle.recv_timeout(Duration::from_secs(5)) else {
            tracing::warn!("Venue idle, shutting down");
            return;
        };
        match request {
            ConnectorRequest::Subscribe { id, spec } => {
                let (Some(security_id), Some(timeframe), Some(base)) =
                    (spec.security_id, spec.timeframe, base)
                else {
                    let _ = handle.deliver(
                        id,
                        Event::Failed(FailureInfo::subscription(SubscriptionError::Rejected {
                            reason: "only candle requests are served".to_owned(),
                        })),
                    );
                    continue;
                };
                let _ = handle.deliver(id, Event::Started);

                let mut open = 100;
                for (i, close) in CLOSES.into_iter().enumerate() {
                    let candle = Candle {
                        security_id: security_id.clone(),
                        timeframe,
                        open_time: base + timeframe * i as i32,
                        open,
                        high: open.max(close) + 1,
                        low: open.min(close) - 1,
                        close,
                        volume: 1_000 + 10 * i as i64,
                        state: CandleState::Finished,
                    };
                    let _ = handle.deliver(id, Event::Candle(candle));
                    open = close;
                }
                let _ = handle.deliver(id, Event::Online);
            }
            ConnectorRequest::Unsubscribe { id } => {
                let stop = StopInfo::with_reason("unsubscribed");
                let _ = handle.deliver(id, Event::Stopped(stop));
                return;
            }
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let (builder, handle) = SubscriptionProvider::builder().channel_connector("replay");
    let provider = Arc::new(builder.build()?);
    let venue = thread::spawn(move || run_venue(handle));

    let (online_tx, online_rx) = feedhub::channel::channel(1);
    provider.on_online(move |sub| {
        let _ = online_tx.try_send(sub.id());
    });
    provider.on_stopped(|sub, reason| {
        tracing::info!("{} stopped ({})", sub.id(), reason.unwrap_or("no reason"));
    });

    let strategy = StairsCountertrend::new(
        Arc::clone(&provider),
        SecurityId::new("SBER", "TQBR"),
        TimeDelta::minutes(5),
    );
    strategy.start()?;

    match online_rx.recv_timeout(Duration::from_secs(5)) {
        Some(id) => tracing::info!("History replayed for {}", id),
        None => tracing::warn!("Feed never went online"),
    }

    strategy.stop();
    if venue.join().is_err() {
        tracing::error!("Venue thread panicked");
    }

    let state = strategy.state.lock();
    println!("Signals: {}, final position: {}", state.signals, state.position);
    Ok(())
}
