//! Error types for the clock and timer.

use thiserror::Error;

/// Error type for clock updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ClockError {
    /// Time advances must be strictly positive.
    #[error("time advance must be positive, got {millis}ms")]
    NonPositiveDelta {
        /// Offending delta in milliseconds.
        millis: i64,
    },

    /// Accumulated time no longer fits in a `TimeDelta`.
    #[error("clock overflow")]
    Overflow,
}

/// Error type for timer configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TimerError {
    /// Interval must be strictly positive.
    #[error("interval must be positive, got {millis}ms")]
    OutOfRange {
        /// Rejected interval in milliseconds.
        millis: i64,
    },

    /// `start` was called before an interval was set.
    #[error("timer interval not configured")]
    NotConfigured,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            ClockError::NonPositiveDelta { millis: -5 }.to_string(),
            "time advance must be positive, got -5ms"
        );
        assert_eq!(
            TimerError::NotConfigured.to_string(),
            "timer interval not configured"
        );
    }
}
