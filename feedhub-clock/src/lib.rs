//! # feedhub Clock
//!
//! Scheduling keyed to venue time instead of wall-clock time.
//!
//! This crate provides:
//! - [`MarketClock`], fed by market-time events from a provider
//! - [`IntervalTimer`], which fires a callback each time a configured amount
//!   of venue time has passed

pub mod clock;
pub mod error;
pub mod timer;

pub use clock::{MarketClock, Tick};
pub use error::{ClockError, TimerError};
pub use timer::IntervalTimer;
