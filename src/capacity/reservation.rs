// src/capacity/reservation.rs
//! Reservation manager and capacity leases
//!
//! `try_reserve` performs check-then-reserve under a single mutex guard, so
//! no other task can observe a state between the check and the reservation
//! append — the no-over-admission guarantee. A successful reservation hands
//! back a [`CapacityLease`], an opaque handle that stays safe even if an
//! expiry sweep removes the underlying record first: every lifecycle call on
//! a missing or already-released lease is a silent no-op. That keeps callers
//! with retries and early returns free of double-free-style bugs.

use crate::capacity::checker::{check, sanitize_count, CheckResult, RequestedCapacity};
use crate::capacity::state::{RuntimeState, SharedRuntimeState};
use crate::utils::time::now_ms;
use metrics::counter;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Lease lifetime when the caller does not specify one
pub const DEFAULT_RESERVATION_TTL_MS: u64 = 60_000;

/// Tool name recorded when the caller supplies none
const UNKNOWN_TOOL: &str = "unknown";

/// A provisional grant of capacity.
///
/// Counts toward `reserved_requests`/`reserved_llm` until consumed, and
/// occupies a slot in the reservation list until released.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationRecord {
    /// Unique per process: monotonic sequence + creation timestamp
    pub id: String,

    /// Tool the capacity was reserved for
    pub tool_name: String,

    /// Reserved network-request slots
    pub additional_requests: u64,

    /// Reserved inference slots
    pub additional_llm: u64,

    /// Creation time (epoch ms)
    pub created_at_ms: u64,

    /// Last heartbeat time
    pub heartbeat_at_ms: u64,

    /// Reclaim deadline for abandoned leases
    pub expires_at_ms: u64,

    /// Set once the promise became real in-flight usage
    pub consumed_at_ms: Option<u64>,
}

impl ReservationRecord {
    /// Build a record; blank tool names default to `"unknown"` and amounts
    /// are already-sanitized non-negative integers.
    pub fn new(
        id: String,
        tool_name: &str,
        additional_requests: u64,
        additional_llm: u64,
        now_ms: u64,
        ttl_ms: u64,
    ) -> Self {
        let tool_name = if tool_name.trim().is_empty() {
            UNKNOWN_TOOL.to_string()
        } else {
            tool_name.to_string()
        };

        Self {
            id,
            tool_name,
            additional_requests,
            additional_llm,
            created_at_ms: now_ms,
            heartbeat_at_ms: now_ms,
            expires_at_ms: now_ms.saturating_add(ttl_ms),
            consumed_at_ms: None,
        }
    }
}

/// Outcome of a reservation attempt
#[derive(Debug)]
pub struct ReserveResult {
    /// The admission decision, unmodified on denial
    pub check: CheckResult,

    /// Lease for the admitted capacity; `None` when denied
    pub reservation: Option<CapacityLease>,
}

/// Handle to one reservation record.
///
/// Bound to the record by id lookup against the shared state, so it remains
/// correct when concurrent releases reorder the underlying list, and remains
/// a safe no-op when a sweep already removed the record.
#[derive(Debug)]
pub struct CapacityLease {
    state: SharedRuntimeState,
    id: String,
    released: AtomicBool,
}

impl CapacityLease {
    fn new(state: SharedRuntimeState, id: String) -> Self {
        Self {
            state,
            id,
            released: AtomicBool::new(false),
        }
    }

    /// Reservation id this lease controls
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Convert the promise into in-flight usage.
    ///
    /// First call sets `consumed_at_ms`; the record stops contributing to
    /// reserved totals immediately but stays in the list until released.
    /// Repeat calls are no-ops.
    pub fn consume(&self) {
        if self.released.load(Ordering::SeqCst) {
            return;
        }
        let now = now_ms();
        let mut state = self.state.lock();
        if let Some(record) = state.reservations.iter_mut().find(|r| r.id == self.id) {
            if record.consumed_at_ms.is_none() {
                trace!(id = %self.id, "reservation consumed");
                record.consumed_at_ms = Some(now);
            }
        }
    }

    /// Refresh the reclaim deadline. No-op after release.
    pub fn heartbeat(&self, ttl_ms: Option<u64>) {
        if self.released.load(Ordering::SeqCst) {
            return;
        }
        let now = now_ms();
        let ttl = ttl_ms.unwrap_or(DEFAULT_RESERVATION_TTL_MS);
        let mut state = self.state.lock();
        if let Some(record) = state.reservations.iter_mut().find(|r| r.id == self.id) {
            record.heartbeat_at_ms = now;
            record.expires_at_ms = now.saturating_add(ttl);
        }
    }

    /// Return the capacity. Idempotent: the first call removes the record,
    /// every later call (and any later heartbeat) is a no-op.
    pub fn release(&self) {
        if self.released.swap(true, Ordering::SeqCst) {
            return;
        }
        let mut state = self.state.lock();
        let before = state.reservations.len();
        state.reservations.retain(|r| r.id != self.id);
        if state.reservations.len() < before {
            trace!(id = %self.id, "reservation released");
        }
    }
}

/// Check capacity and, if allowed, append a reservation — atomically with
/// respect to every other task, because both happen under one guard.
///
/// Denial returns the checker's result untouched; no state mutates.
pub fn try_reserve(
    shared: &SharedRuntimeState,
    requested: RequestedCapacity,
    tool_name: Option<&str>,
    reservation_ttl_ms: Option<u64>,
    now_ms: u64,
) -> ReserveResult {
    let mut state = shared.lock();

    let result = check(&state, requested);
    if !result.allowed {
        debug!(
            tool = tool_name.unwrap_or(UNKNOWN_TOOL),
            reasons = ?result.reasons,
            "reservation denied"
        );
        counter!("capacity.reservations.denied").increment(1);
        return ReserveResult {
            check: result,
            reservation: None,
        };
    }

    let id = state.next_reservation_id(now_ms);
    let record = ReservationRecord::new(
        id.clone(),
        tool_name.unwrap_or(""),
        sanitize_count(requested.additional_requests),
        sanitize_count(requested.additional_llm),
        now_ms,
        reservation_ttl_ms.unwrap_or(DEFAULT_RESERVATION_TTL_MS),
    );
    debug!(
        id = %record.id,
        tool = %record.tool_name,
        requests = record.additional_requests,
        llm = record.additional_llm,
        "reservation admitted"
    );
    state.reservations.push(record);
    counter!("capacity.reservations.admitted").increment(1);
    drop(state);

    ReserveResult {
        check: result,
        reservation: Some(CapacityLease::new(Arc::clone(shared), id)),
    }
}

/// Remove unconsumed reservations whose reclaim deadline has passed.
///
/// Consumed records are live usage owned by the counters and are left for
/// their lease's `release`. Idempotent at a fixed `now_ms`. Called by the
/// ops layer before admission work; hosts may also run it periodically.
pub fn sweep_expired(state: &mut RuntimeState, now_ms: u64) -> usize {
    let before = state.reservations.len();
    state
        .reservations
        .retain(|r| r.consumed_at_ms.is_some() || r.expires_at_ms > now_ms);
    let swept = before - state.reservations.len();
    if swept > 0 {
        warn!(swept, "reclaimed expired reservations");
        counter!("capacity.reservations.expired").increment(swept as u64);
    }
    swept
}
