//! Logical clock fed by venue time advances.

use crate::error::ClockError;
use chrono::{DateTime, TimeDelta, Utc};
use feedhub_core::TimeAdvance;
use feedhub_provider::SubscriptionProvider;
use feedhub_router::{EventRouter, ListenerId, ListenerList};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};

type TickFn = dyn Fn(&Tick) + Send + Sync;

/// One accepted time advance, as seen by tick listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    /// Size of this advance.
    pub diff: TimeDelta,
    /// Clock total after this advance.
    pub elapsed: TimeDelta,
    /// Latest venue server time, if any advance carried one.
    pub server_time: Option<DateTime<Utc>>,
}

#[derive(Debug)]
struct ClockState {
    elapsed: TimeDelta,
    last_server_time: Option<DateTime<Utc>>,
    rejected: u64,
}

/// Venue-time clock.
///
/// Time only moves through [`advance`](Self::advance), normally driven by
/// market-time events once the clock is [attached](Self::attach) to a
/// provider. Tick listeners run on the advancing thread, after the clock's
/// own lock is released.
pub struct MarketClock {
    state: Mutex<ClockState>,
    ticks: ListenerList<TickFn>,
    attachment: Mutex<Option<(Weak<EventRouter>, ListenerId)>>,
}

impl MarketClock {
    /// Creates a clock at zero, not attached to anything.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(ClockState {
                elapsed: TimeDelta::zero(),
                last_server_time: None,
                rejected: 0,
            }),
            ticks: ListenerList::new(),
            attachment: Mutex::new(None),
        })
    }

    /// Feeds this clock from `provider`'s market-time events.
    ///
    /// Replaces any earlier attachment. The provider does not keep the clock
    /// alive.
    pub fn attach(self: &Arc<Self>, provider: &SubscriptionProvider) -> ListenerId {
        self.detach();

        let clock = Arc::downgrade(self);
        let id = provider.on_market_time(move |subscription, advance: &TimeAdvance| {
            let Some(clock) = clock.upgrade() else {
                return;
            };
            if let Err(e) = clock.apply(advance.diff, Some(advance.server_time)) {
                tracing::warn!(
                    "Rejected time advance from subscription {}: {}",
                    subscription.id(),
                    e
                );
            }
        });
        *self.attachment.lock() = Some((Arc::downgrade(provider.router()), id));
        id
    }

    /// Stops listening to the attached provider. Returns false if detached.
    pub fn detach(&self) -> bool {
        let Some((router, id)) = self.attachment.lock().take() else {
            return false;
        };
        if let Some(router) = router.upgrade() {
            router.remove_listener(id);
        }
        true
    }

    /// Returns true while attached to a provider.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.attachment.lock().is_some()
    }

    /// Advances the clock by `diff`.
    ///
    /// # Errors
    /// `NonPositiveDelta` if `diff <= 0`; the clock is left unchanged and the
    /// rejection is counted.
    pub fn advance(&self, diff: TimeDelta) -> Result<(), ClockError> {
        self.apply(diff, None)
    }

    /// Advances the clock from a market-time payload.
    ///
    /// # Errors
    /// See [`advance`](Self::advance).
    pub fn advance_to(&self, advance: &TimeAdvance) -> Result<(), ClockError> {
        self.apply(advance.diff, Some(advance.server_time))
    }

    /// Registers a tick listener.
    pub fn on_tick<F>(&self, f: F) -> ListenerId
    where
        F: Fn(&Tick) + Send + Sync + 'static,
    {
        self.ticks.push(Arc::new(f))
    }

    /// Removes a tick listener. Returns false if unknown.
    pub fn remove_tick(&self, id: ListenerId) -> bool {
        self.ticks.remove(id)
    }

    /// Venue time accumulated since creation or the last reset.
    #[must_use]
    pub fn elapsed(&self) -> TimeDelta {
        self.state.lock().elapsed
    }

    /// Latest venue server time seen.
    #[must_use]
    pub fn last_server_time(&self) -> Option<DateTime<Utc>> {
        self.state.lock().last_server_time
    }

    /// Number of rejected advances.
    #[must_use]
    pub fn rejected(&self) -> u64 {
        self.state.lock().rejected
    }

    /// Sets accumulated time back to zero.
    pub fn reset(&self) {
        self.state.lock().elapsed = TimeDelta::zero();
    }

    fn apply(
        &self,
        diff: TimeDelta,
        server_time: Option<DateTime<Utc>>,
    ) -> Result<(), ClockError> {
        let tick = {
            let mut state = self.state.lock();
            if diff <= TimeDelta::zero() {
                state.rejected += 1;
                return Err(ClockError::NonPositiveDelta {
                    millis: diff.num_milliseconds(),
                });
            }
            state.elapsed = state
                .elapsed
                .checked_add(&diff)
                .ok_or(ClockError::Overflow)?;
            if server_time.is_some() {
                state.last_server_time = server_time;
            }
            Tick {
                diff,
                elapsed: state.elapsed,
                server_time: state.last_server_time,
            }
        };

        for (_, listener) in self.ticks.snapshot().iter() {
            listener(&tick);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use feedhub_core::{Event, SubscriptionSpec};
    use feedhub_provider::LoopbackConnector;

    #[test]
    fn test_advance_accumulates() {
        let clock = MarketClock::new();
        clock.advance(TimeDelta::seconds(2)).unwrap();
        clock.advance(TimeDelta::milliseconds(500)).unwrap();

        assert_eq!(clock.elapsed(), TimeDelta::milliseconds(2500));
        assert_eq!(clock.last_server_time(), None);
    }

    #[test]
    fn test_non_positive_advance_rejected() {
        let clock = MarketClock::new();
        clock.advance(TimeDelta::seconds(1)).unwrap();

        assert_eq!(
            clock.advance(TimeDelta::zero()),
            Err(ClockError::NonPositiveDelta { millis: 0 })
        );
        assert_eq!(
            clock.advance(TimeDelta::seconds(-3)),
            Err(ClockError::NonPositiveDelta { millis: -3000 })
        );
        assert_eq!(clock.elapsed(), TimeDelta::seconds(1));
        assert_eq!(clock.rejected(), 2);
    }

    #[test]
    fn test_tick_listeners() {
        let clock = MarketClock::new();
        let ticks = Arc::new(Mutex::new(Vec::new()));
        let ticks_clone = Arc::clone(&ticks);
        let id = clock.on_tick(move |tick| ticks_clone.lock().push(*tick));

        let server_time = Utc.with_ymd_and_hms(2024, 5, 6, 9, 30, 0).unwrap();
        clock
            .advance_to(&TimeAdvance {
                diff: TimeDelta::seconds(1),
                server_time,
            })
            .unwrap();
        clock.advance(TimeDelta::seconds(1)).unwrap();
        assert!(clock.remove_tick(id));
        clock.advance(TimeDelta::seconds(1)).unwrap();

        let ticks = ticks.lock();
        assert_eq!(ticks.len(), 2);
        assert_eq!(ticks[1].elapsed, TimeDelta::seconds(2));
        assert_eq!(ticks[1].server_time, Some(server_time));
    }

    #[test]
    fn test_listener_may_read_clock() {
        let clock = MarketClock::new();
        let weak = Arc::downgrade(&clock);
        let seen = Arc::new(Mutex::new(None));
        let seen_clone = Arc::clone(&seen);
        clock.on_tick(move |_| {
            if let Some(clock) = weak.upgrade() {
                *seen_clone.lock() = Some(clock.elapsed());
            }
        });

        clock.advance(TimeDelta::seconds(4)).unwrap();
        assert_eq!(*seen.lock(), Some(TimeDelta::seconds(4)));
    }

    #[test]
    fn test_reset() {
        let clock = MarketClock::new();
        clock.advance(TimeDelta::minutes(1)).unwrap();
        clock.reset();
        assert_eq!(clock.elapsed(), TimeDelta::zero());
    }

    #[test]
    fn test_attach_and_detach() {
        let venue = Arc::new(LoopbackConnector::new("sim"));
        let provider = SubscriptionProvider::builder()
            .shared_connector(venue.clone())
            .build()
            .unwrap();
        let clock = MarketClock::new();
        clock.attach(&provider);
        assert!(clock.is_attached());

        let sub = provider.subscribe(SubscriptionSpec::market_time()).unwrap();
        let server_time = Utc.with_ymd_and_hms(2024, 5, 6, 9, 30, 0).unwrap();
        let advance = |secs| {
            Event::MarketTime(TimeAdvance {
                diff: TimeDelta::seconds(secs),
                server_time,
            })
        };

        venue.deliver(sub.id(), advance(3)).unwrap();
        venue.deliver(sub.id(), advance(-1)).unwrap();
        assert_eq!(clock.elapsed(), TimeDelta::seconds(3));
        assert_eq!(clock.rejected(), 1);
        assert_eq!(clock.last_server_time(), Some(server_time));

        assert!(clock.detach());
        assert!(!clock.detach());
        venue.deliver(sub.id(), advance(3)).unwrap();
        assert_eq!(clock.elapsed(), TimeDelta::seconds(3));
    }
}
