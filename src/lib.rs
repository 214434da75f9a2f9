//! Per-application foreground time for the current day, computed from a usage event log.
//! Usable as a library through [stats::UsageStatsService], from a terminal, or embedded into
//! another application through the json method [channel].
//!

pub mod channel;
pub mod cli;
pub mod platform;
pub mod stats;
pub mod usage;
pub mod utils;
