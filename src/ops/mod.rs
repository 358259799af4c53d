// src/ops/mod.rs
//! Operations exposed to the hosting agent
//!
//! Thin callable surface over the capacity core: structured request in,
//! structured response out (human-readable summary plus machine-readable
//! details). This is an in-process library boundary, not a process one.
//!
//! Each operation has an `*_on` form taking an explicit state handle (used
//! by tests and embedders) and a top-level form bound to the process-wide
//! shared state. Both admission entry points sweep expired reservations
//! before deciding, which is the engine's reclaim strategy for abandoned
//! leases.

use crate::capacity::checker::{check, CheckResult, RequestedCapacity};
use crate::capacity::reservation::{sweep_expired, try_reserve, CapacityLease};
use crate::capacity::snapshot::{snapshot, CapacitySnapshot};
use crate::capacity::state::{shared_state, SharedRuntimeState};
use crate::utils::time::now_ms;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

/// Structured operation response: a one-line human summary plus
/// machine-readable details
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpResponse<T> {
    /// Human-readable outcome line
    pub summary: String,

    /// Machine-readable payload
    pub details: T,
}

/// Arguments for the capacity operations.
///
/// Counts arrive as raw JSON values: anything non-numeric (or negative, or
/// non-finite) sanitizes to zero rather than failing the call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CapacityArgs {
    /// Additional outstanding network requests
    pub additional_requests: Value,

    /// Additional concurrent inference calls
    pub additional_llm: Value,

    /// Tool the capacity is for
    pub tool_name: Option<String>,

    /// Reservation lifetime override (ms)
    pub reservation_ttl_ms: Option<u64>,
}

impl CapacityArgs {
    /// Plain numeric constructor for in-process callers
    pub fn new(additional_requests: u64, additional_llm: u64) -> Self {
        Self {
            additional_requests: additional_requests.into(),
            additional_llm: additional_llm.into(),
            tool_name: None,
            reservation_ttl_ms: None,
        }
    }

    pub fn with_tool(mut self, tool_name: impl Into<String>) -> Self {
        self.tool_name = Some(tool_name.into());
        self
    }

    fn requested(&self) -> RequestedCapacity {
        RequestedCapacity::new(
            self.additional_requests.as_f64().unwrap_or(0.0),
            self.additional_llm.as_f64().unwrap_or(0.0),
        )
    }
}

/// Details of a reservation attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReserveDetails {
    /// The admission decision
    #[serde(flatten)]
    pub check: CheckResult,

    /// Id of the reservation, when admitted
    pub reservation_id: Option<String>,
}

fn check_summary(result: &CheckResult) -> String {
    if result.allowed {
        format!(
            "Capacity available: projected requests {}/{}, llm {}/{}",
            result.projected_requests,
            result.snapshot.limits.max_total_active_requests,
            result.projected_llm,
            result.snapshot.limits.max_total_active_llm
        )
    } else {
        format!("Capacity denied: {}", result.reasons.join("; "))
    }
}

/// Check whether additional load fits, against an explicit state handle
pub fn check_capacity_on(
    shared: &SharedRuntimeState,
    args: &CapacityArgs,
) -> OpResponse<CheckResult> {
    let now = now_ms();
    let mut state = shared.lock();
    sweep_expired(&mut state, now);
    let result = check(&state, args.requested());
    OpResponse {
        summary: check_summary(&result),
        details: result,
    }
}

/// Check whether additional load fits, against the process-wide state
pub fn check_capacity(args: &CapacityArgs) -> OpResponse<CheckResult> {
    check_capacity_on(&shared_state(), args)
}

/// Reserve capacity, against an explicit state handle.
///
/// The lease is returned alongside the serializable response; it cannot
/// cross a process boundary and belongs to the in-process caller.
pub fn try_reserve_capacity_on(
    shared: &SharedRuntimeState,
    args: &CapacityArgs,
) -> (OpResponse<ReserveDetails>, Option<CapacityLease>) {
    let now = now_ms();
    sweep_expired(&mut shared.lock(), now);

    let result = try_reserve(
        shared,
        args.requested(),
        args.tool_name.as_deref(),
        args.reservation_ttl_ms,
        now,
    );

    let reservation_id = result.reservation.as_ref().map(|l| l.id().to_string());
    let summary = match &reservation_id {
        Some(id) => format!("{} (reserved {})", check_summary(&result.check), id),
        None => check_summary(&result.check),
    };

    (
        OpResponse {
            summary,
            details: ReserveDetails {
                check: result.check,
                reservation_id,
            },
        },
        result.reservation,
    )
}

/// Reserve capacity against the process-wide state
pub fn try_reserve_capacity(
    args: &CapacityArgs,
) -> (OpResponse<ReserveDetails>, Option<CapacityLease>) {
    try_reserve_capacity_on(&shared_state(), args)
}

/// Current capacity snapshot, against an explicit state handle
pub fn get_snapshot_on(shared: &SharedRuntimeState) -> OpResponse<CapacitySnapshot> {
    let snap = snapshot(&shared.lock());
    OpResponse {
        summary: format_status_line_from(&snap, None),
        details: snap,
    }
}

/// Current capacity snapshot of the process-wide state
pub fn get_snapshot() -> OpResponse<CapacitySnapshot> {
    get_snapshot_on(&shared_state())
}

fn format_status_line_from(snap: &CapacitySnapshot, title: Option<&str>) -> String {
    format!(
        "{}: requests {}/{} ({} reserved), llm {}/{} ({} reserved), queue {}, orchestrations {}/{}, reservations {}",
        title.unwrap_or("Capacity"),
        snap.total_active_requests,
        snap.limits.max_total_active_requests,
        snap.reserved_requests,
        snap.total_active_llm,
        snap.limits.max_total_active_llm,
        snap.reserved_llm,
        snap.queued_orchestrations,
        snap.active_orchestrations,
        snap.limits.max_concurrent_orchestrations,
        snap.active_reservations,
    )
}

/// One-line load view for dashboards, against an explicit state handle
pub fn format_status_line_on(shared: &SharedRuntimeState, title: Option<&str>) -> String {
    format_status_line_from(&snapshot(&shared.lock()), title)
}

/// One-line load view of the process-wide state
pub fn format_status_line(title: Option<&str>) -> String {
    format_status_line_on(&shared_state(), title)
}

/// Zero all transient state, keeping limits, on an explicit handle
pub fn reset_transient_state_on(shared: &SharedRuntimeState) {
    info!("resetting transient capacity state");
    shared.lock().reset_transient();
}

/// Zero all transient process-wide state, keeping limits
pub fn reset_transient_state() {
    reset_transient_state_on(&shared_state());
}
