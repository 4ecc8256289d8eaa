//! Throughput measurement.

use std::time::{Duration, Instant};

/// Result of a throughput run.
#[derive(Debug, Clone)]
pub struct ThroughputResult {
    /// Total events processed.
    pub events: u64,
    /// Total duration.
    pub duration: Duration,
}

impl ThroughputResult {
    /// Returns events per second.
    #[must_use]
    pub fn events_per_second(&self) -> f64 {
        self.events as f64 / self.duration.as_secs_f64()
    }

    /// Returns mean time per event.
    #[must_use]
    pub fn per_event(&self) -> Duration {
        match u32::try_from(self.events) {
            Ok(0) => Duration::ZERO,
            Ok(events) => self.duration / events,
            Err(_) => Duration::from_secs_f64(self.duration.as_secs_f64() / self.events as f64),
        }
    }
}

/// Runs `process_fn` `event_count` times and times the whole run.
pub fn run_throughput_benchmark<F>(event_count: u64, mut process_fn: F) -> ThroughputResult
where
    F: FnMut(u64),
{
    let start = Instant::now();

    for n in 0..event_count {
        process_fn(n);
    }

    ThroughputResult {
        events: event_count,
        duration: start.elapsed(),
    }
}
