//! Turns a chronological usage event log into per-application foreground time.
//! [aggregator::aggregate_usage] is the only piece of logic here, the rest are the entities it
//! works with.

pub mod aggregator;
pub mod entities;
