//! Interval timer driven by a [`MarketClock`].

use crate::clock::MarketClock;
use crate::error::TimerError;
use chrono::TimeDelta;
use feedhub_router::ListenerId;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

#[derive(Debug)]
struct TimerState {
    interval: Option<TimeDelta>,
    elapsed: TimeDelta,
    registration: Option<ListenerId>,
}

struct Shared {
    state: Mutex<TimerState>,
    callback: Box<dyn Fn() + Send + Sync>,
    fired: AtomicU64,
}

impl Shared {
    fn on_tick(&self, diff: TimeDelta) {
        let fire = {
            let mut state = self.state.lock();
            let Some(interval) = state.interval else {
                return;
            };
            if state.registration.is_none() {
                return;
            }
            state.elapsed = state.elapsed.checked_add(&diff).unwrap_or(TimeDelta::MAX);
            if state.elapsed >= interval {
                // Reset to zero, not to the remainder: one tick fires at most once.
                state.elapsed = TimeDelta::zero();
                true
            } else {
                false
            }
        };

        if fire {
            self.fired.fetch_add(1, Ordering::Relaxed);
            (self.callback)();
        }
    }
}

/// Fires a callback every time `interval` of venue time has passed.
///
/// The callback runs on the thread that advanced the clock, without the
/// timer lock held, so it may call [`stop`](Self::stop),
/// [`interval`](Self::interval) or [`start`](Self::start). An interval
/// changed while the callback runs applies from the next tick on.
///
/// Dropping the timer stops it.
pub struct IntervalTimer {
    clock: Arc<MarketClock>,
    shared: Arc<Shared>,
}

impl IntervalTimer {
    /// Creates a stopped timer with no interval.
    ///
    /// # Arguments
    /// * `clock` - Clock whose ticks drive the timer
    /// * `callback` - Invoked once per interval crossing
    pub fn new<F>(clock: Arc<MarketClock>, callback: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self {
            clock,
            shared: Arc::new(Shared {
                state: Mutex::new(TimerState {
                    interval: None,
                    elapsed: TimeDelta::zero(),
                    registration: None,
                }),
                callback: Box::new(callback),
                fired: AtomicU64::new(0),
            }),
        }
    }

    /// Sets the interval and clears accumulated time.
    ///
    /// # Errors
    /// `OutOfRange` if `interval <= 0`; the previous setting is kept.
    pub fn interval(&self, interval: TimeDelta) -> Result<(), TimerError> {
        if interval <= TimeDelta::zero() {
            return Err(TimerError::OutOfRange {
                millis: interval.num_milliseconds(),
            });
        }
        let mut state = self.shared.state.lock();
        state.interval = Some(interval);
        state.elapsed = TimeDelta::zero();
        Ok(())
    }

    /// Starts listening to clock ticks. No-op if already started.
    ///
    /// # Errors
    /// `NotConfigured` if no interval has been set.
    pub fn start(&self) -> Result<(), TimerError> {
        let mut state = self.shared.state.lock();
        if state.interval.is_none() {
            return Err(TimerError::NotConfigured);
        }
        if state.registration.is_some() {
            return Ok(());
        }
        let shared: Weak<Shared> = Arc::downgrade(&self.shared);
        let id = self.clock.on_tick(move |tick| {
            if let Some(shared) = shared.upgrade() {
                shared.on_tick(tick.diff);
            }
        });
        state.registration = Some(id);
        tracing::debug!("Interval timer started on listener {}", id);
        Ok(())
    }

    /// Stops listening. Returns false if already stopped.
    pub fn stop(&self) -> bool {
        let Some(id) = self.shared.state.lock().registration.take() else {
            return false;
        };
        self.clock.remove_tick(id);
        tracing::debug!("Interval timer stopped on listener {}", id);
        true
    }

    /// Returns true while started.
    #[must_use]
    pub fn is_started(&self) -> bool {
        self.shared.state.lock().registration.is_some()
    }

    /// Venue time accumulated toward the next firing.
    #[must_use]
    pub fn elapsed(&self) -> TimeDelta {
        self.shared.state.lock().elapsed
    }

    /// Configured interval.
    #[must_use]
    pub fn configured_interval(&self) -> Option<TimeDelta> {
        self.shared.state.lock().interval
    }

    /// Number of times the callback has fired.
    #[must_use]
    pub fn fired(&self) -> u64 {
        self.shared.fired.load(Ordering::Relaxed)
    }
}

impl Drop for IntervalTimer {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::thread;

    fn counting_timer(clock: &Arc<MarketClock>) -> (IntervalTimer, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = Arc::clone(&count);
        let timer = IntervalTimer::new(Arc::clone(clock), move || {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });
        (timer, count)
    }

    #[test]
    fn test_start_requires_interval() {
        let clock = MarketClock::new();
        let (timer, _) = counting_timer(&clock);
        assert_eq!(timer.start(), Err(TimerError::NotConfigured));
        assert!(!timer.is_started());
    }

    #[test]
    fn test_interval_out_of_range() {
        let clock = MarketClock::new();
        let (timer, _) = counting_timer(&clock);

        assert_eq!(
            timer.interval(TimeDelta::zero()),
            Err(TimerError::OutOfRange { millis: 0 })
        );
        assert_eq!(
            timer.interval(TimeDelta::seconds(-1)),
            Err(TimerError::OutOfRange { millis: -1000 })
        );
        assert_eq!(timer.configured_interval(), None);
    }

    #[test]
    fn test_fires_when_interval_reached() {
        let clock = MarketClock::new();
        let (timer, count) = counting_timer(&clock);
        timer.interval(TimeDelta::seconds(5)).unwrap();
        timer.start().unwrap();

        clock.advance(TimeDelta::seconds(2)).unwrap();
        clock.advance(TimeDelta::seconds(2)).unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(timer.elapsed(), TimeDelta::seconds(4));

        clock.advance(TimeDelta::seconds(1)).unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(timer.elapsed(), TimeDelta::zero());
    }

    #[test]
    fn test_large_tick_fires_once_and_resets() {
        let clock = MarketClock::new();
        let (timer, count) = counting_timer(&clock);
        timer.interval(TimeDelta::seconds(10)).unwrap();
        timer.start().unwrap();

        clock.advance(TimeDelta::seconds(20)).unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(timer.elapsed(), TimeDelta::zero());

        clock.advance(TimeDelta::seconds(35)).unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 2);
        assert_eq!(timer.fired(), 2);
    }

    #[test]
    fn test_start_and_stop_are_idempotent() {
        let clock = MarketClock::new();
        let (timer, count) = counting_timer(&clock);
        timer.interval(TimeDelta::seconds(1)).unwrap();

        timer.start().unwrap();
        timer.start().unwrap();
        clock.advance(TimeDelta::seconds(1)).unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1);

        assert!(timer.stop());
        assert!(!timer.stop());
        clock.advance(TimeDelta::seconds(1)).unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_interval_change_resets_elapsed() {
        let clock = MarketClock::new();
        let (timer, _) = counting_timer(&clock);
        timer.interval(TimeDelta::seconds(10)).unwrap();
        timer.start().unwrap();
        clock.advance(TimeDelta::seconds(4)).unwrap();

        timer.interval(TimeDelta::seconds(3)).unwrap();
        assert_eq!(timer.elapsed(), TimeDelta::zero());
    }

    #[test]
    fn test_callback_may_stop_timer() {
        let clock = MarketClock::new();
        let slot: Arc<Mutex<Option<Arc<IntervalTimer>>>> = Arc::new(Mutex::new(None));
        let slot_clone = Arc::clone(&slot);
        let timer = Arc::new(IntervalTimer::new(Arc::clone(&clock), move || {
            if let Some(timer) = slot_clone.lock().as_ref() {
                timer.stop();
            }
        }));
        *slot.lock() = Some(Arc::clone(&timer));

        timer.interval(TimeDelta::seconds(1)).unwrap();
        timer.start().unwrap();
        clock.advance(TimeDelta::seconds(1)).unwrap();

        assert!(!timer.is_started());
        assert_eq!(timer.fired(), 1);
        slot.lock().take();
    }

    #[test]
    fn test_drop_stops_timer() {
        let clock = MarketClock::new();
        let (timer, count) = counting_timer(&clock);
        timer.interval(TimeDelta::seconds(1)).unwrap();
        timer.start().unwrap();
        drop(timer);

        clock.advance(TimeDelta::seconds(5)).unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_concurrent_ticks() {
        let clock = MarketClock::new();
        let (timer, count) = counting_timer(&clock);
        timer.interval(TimeDelta::milliseconds(100)).unwrap();
        timer.start().unwrap();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let clock = Arc::clone(&clock);
                thread::spawn(move || {
                    for _ in 0..250 {
                        clock.advance(TimeDelta::milliseconds(10)).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        // 1000 ticks of 10ms with a 100ms interval, elapsed reset on each fire.
        assert_eq!(count.load(Ordering::SeqCst), 100);
        assert_eq!(timer.elapsed(), TimeDelta::zero());
    }
}
