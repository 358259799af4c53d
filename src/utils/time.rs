// src/utils/time.rs
//! Epoch-millisecond clock helper
//!
//! Core capacity functions take an explicit `now_ms` so tests can pin the
//! clock; this helper is the single place callers read the real one.

use chrono::Utc;

/// Current wall-clock time as milliseconds since the Unix epoch.
///
/// Clamped at zero so a pre-epoch system clock cannot produce a negative
/// timestamp.
pub fn now_ms() -> u64 {
    Utc::now().timestamp_millis().max(0) as u64
}
