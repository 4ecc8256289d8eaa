//! # Feedhub Bench
//!
//! Benchmarking utilities for feedhub dispatch performance.

pub mod fixtures;
pub mod latency;
pub mod throughput;
