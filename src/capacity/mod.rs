// src/capacity/mod.rs
//! Runtime capacity and admission control
//!
//! The core engine: shared state store, pure snapshot, capacity checker,
//! reservation leases, and the priority admission queue.
//!
//! # Architecture
//!
//! ```text
//! caller ──► try_reserve ──► check(snapshot(state)) ──► CheckResult
//!                │                                        │ allowed
//!                │                                        ▼
//!                │                              append ReservationRecord
//!                │                                        │
//!                ▼                                        ▼
//!         Priority Queue ◄── denied callers        CapacityLease
//!         (poll / dispatch)                   (consume / heartbeat / release)
//! ```
//!
//! The checker-then-mutate sequence inside `try_reserve` runs under one
//! mutex guard, so no interleaved task can over-commit capacity against a
//! stale snapshot.

pub mod checker;
pub mod limits;
pub mod queue;
pub mod reservation;
pub mod snapshot;
pub mod state;
pub mod wait;

// Re-export commonly used types
pub use checker::{check, sanitize_count, CheckResult, RequestedCapacity};
pub use limits::CapacityLimits;
pub use queue::{
    dispatch_next, enqueue, orchestration_finished, QueueEntry, QueuePriority,
    MAX_CONSECUTIVE_DISPATCHES,
};
pub use reservation::{
    sweep_expired, try_reserve, CapacityLease, ReservationRecord, ReserveResult,
    DEFAULT_RESERVATION_TTL_MS,
};
pub use snapshot::{snapshot, CapacitySnapshot, PriorityStats, QUEUED_TOOLS_DISPLAY_CAP};
pub use state::{shared_state, RuntimeState, SharedRuntimeState};
pub use wait::{reserve_when_available, WaitOutcome};
