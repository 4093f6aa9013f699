//! Metrics emitted through the `metrics` facade
//!
//! Nothing is recorded unless the host application installs a recorder
//! (e.g. a Prometheus exporter). All names share the `proofa_realtime_`
//! prefix.

pub mod counters;
