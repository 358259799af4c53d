// src/observability/mod.rs
//! Metrics, tracing, and logging initialization
//!
//! The engine emits `tracing` events and `metrics` counters
//! (`capacity.reservations.admitted` / `.denied` / `.expired`,
//! `capacity.queue.evicted` / `.expired`) throughout the capacity core;
//! hosts call these once at startup to wire them somewhere visible.

use crate::utils::errors::{EngineError, Result};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber.
///
/// Filter comes from `RUST_LOG`, defaulting to `info`. Safe to call once;
/// a second call reports the error instead of panicking.
pub fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .map_err(|e| EngineError::TracingInit(e.to_string()))
}

/// Install the Prometheus metrics recorder.
pub fn init_metrics() -> Result<()> {
    PrometheusBuilder::new()
        .install()
        .map_err(|e| EngineError::MetricsInit(e.to_string()))
}
