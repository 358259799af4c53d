// src/capacity/state.rs
//! Process-wide runtime state store
//!
//! The single shared, mutable record of live counters, the pending-admission
//! queue, and active reservations. Every reader and writer must observe the
//! same instance — no component may hold a private copy. Access goes through
//! one mutex so the check-then-reserve sequence executes under a single
//! guard with no suspension point inside it.
//!
//! Counters are signed on purpose: a buggy over-release can drive them
//! negative, and the snapshot layer clamps rather than corrupting aggregates.

use crate::capacity::limits::CapacityLimits;
use crate::capacity::queue::QueueEntry;
use crate::capacity::reservation::ReservationRecord;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Shared handle to the runtime state
pub type SharedRuntimeState = Arc<Mutex<RuntimeState>>;

/// Live counters for single-shot sub-agent invocations
#[derive(Debug, Clone, Copy, Default)]
pub struct SubagentCounters {
    /// Outstanding network requests held by sub-agent runs
    pub active_run_requests: i64,

    /// Concurrent inference slots held by sub-agent runs
    pub active_agents: i64,
}

/// Live counters for multi-member team runs
#[derive(Debug, Clone, Copy, Default)]
pub struct TeamCounters {
    /// Outstanding team runs (each holds one network-request slot)
    pub active_team_runs: i64,

    /// Concurrent teammates (each holds one inference slot)
    pub active_teammates: i64,
}

/// Pending-admission queue state and dispatch bookkeeping
#[derive(Debug, Clone, Default)]
pub struct QueueState {
    /// Orchestrations currently dispatched
    pub active_orchestrations: i64,

    /// Entries waiting for a dispatch turn
    pub pending: Vec<QueueEntry>,

    /// Tenant that won the most recent dispatch turn
    pub last_dispatched_tenant_key: Option<String>,

    /// Consecutive dispatch turns granted per tenant
    pub consecutive_dispatches_by_tenant: HashMap<String, u32>,

    /// Entries evicted because the queue was full
    pub evicted_total: u64,
}

/// The process-wide runtime state
#[derive(Debug, Clone)]
pub struct RuntimeState {
    /// Capacity ceilings; survives `reset_transient`
    pub limits: CapacityLimits,

    /// Sub-agent counters
    pub subagents: SubagentCounters,

    /// Team counters
    pub teams: TeamCounters,

    /// Admission queue
    pub queue: QueueState,

    /// Active reservations, insertion-ordered
    pub reservations: Vec<ReservationRecord>,

    /// Monotonic sequence for reservation ids
    next_reservation_seq: u64,
}

impl RuntimeState {
    /// Create a fresh state with the given limits and zeroed counters
    pub fn new(limits: CapacityLimits) -> Self {
        Self {
            limits,
            subagents: SubagentCounters::default(),
            teams: TeamCounters::default(),
            queue: QueueState::default(),
            reservations: Vec::new(),
            next_reservation_seq: 0,
        }
    }

    /// Zero all counters and clear the queue and reservation list.
    ///
    /// `limits` (and therefore the version string) are untouched, so a
    /// session boundary can clear load without losing configuration.
    pub fn reset_transient(&mut self) {
        debug!("resetting transient runtime state");
        self.subagents = SubagentCounters::default();
        self.teams = TeamCounters::default();
        self.queue = QueueState::default();
        self.reservations.clear();
        self.next_reservation_seq = 0;
    }

    /// Next reservation id: monotonic per-process sequence plus a timestamp
    pub fn next_reservation_id(&mut self, now_ms: u64) -> String {
        self.next_reservation_seq += 1;
        format!("resv-{}-{}", self.next_reservation_seq, now_ms)
    }
}

impl Default for RuntimeState {
    fn default() -> Self {
        Self::new(CapacityLimits::default())
    }
}

static STATE: Lazy<SharedRuntimeState> =
    Lazy::new(|| Arc::new(Mutex::new(RuntimeState::default())));

/// The process-wide shared state, created on first use
pub fn shared_state() -> SharedRuntimeState {
    Arc::clone(&STATE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shared_state_is_single_instance() {
        let a = shared_state();
        let b = shared_state();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_reset_transient_keeps_limits() {
        let limits = CapacityLimits {
            max_total_active_requests: 99,
            ..Default::default()
        };
        let mut state = RuntimeState::new(limits.clone());
        state.subagents.active_run_requests = 7;
        state.teams.active_teammates = 3;
        state.queue.active_orchestrations = 2;
        state.queue.evicted_total = 5;

        state.reset_transient();

        assert_eq!(state.limits, limits);
        assert_eq!(state.subagents.active_run_requests, 0);
        assert_eq!(state.teams.active_teammates, 0);
        assert_eq!(state.queue.active_orchestrations, 0);
        assert_eq!(state.queue.evicted_total, 0);
        assert!(state.reservations.is_empty());
        assert!(state.queue.pending.is_empty());
    }

    #[test]
    fn test_reservation_ids_are_distinct() {
        let mut state = RuntimeState::default();
        let a = state.next_reservation_id(1_000);
        let b = state.next_reservation_id(1_000);
        let c = state.next_reservation_id(1_000);
        assert_ne!(a, b);
        assert_ne!(b, c);
        assert!(a.starts_with("resv-1-"));
        assert!(c.starts_with("resv-3-"));
    }
}
