// src/capacity/wait.rs
//! Poll-until-capacity with timeout and abort
//!
//! A caller that cannot be admitted immediately may wait: re-check every
//! `capacity_poll_ms` for up to `capacity_wait_ms`. Exceeding the window is
//! a distinct `TimedOut` outcome; external cancellation is `Aborted`. The
//! two are mutually exclusive and both differ from an immediate denial.
//!
//! Suspension only ever happens between admission attempts — each attempt
//! itself runs under the state mutex with no await point inside.

use crate::capacity::checker::RequestedCapacity;
use crate::capacity::reservation::{try_reserve, CapacityLease};
use crate::capacity::state::SharedRuntimeState;
use crate::utils::time::now_ms;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// Result of waiting for capacity
#[derive(Debug)]
pub enum WaitOutcome {
    /// Capacity was reserved before the window closed
    Acquired(CapacityLease),

    /// The wait window elapsed without capacity becoming available
    TimedOut,

    /// The caller was cancelled while waiting
    Aborted,
}

impl WaitOutcome {
    pub fn is_timed_out(&self) -> bool {
        matches!(self, Self::TimedOut)
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted)
    }
}

/// Try to reserve capacity, polling until admitted, timed out, or aborted.
///
/// The poll interval is re-read from `limits` on every turn, so a
/// collaborator lowering ceilings (and bumping the limits version) between
/// polls takes effect without restarting the wait.
pub async fn reserve_when_available(
    shared: &SharedRuntimeState,
    requested: RequestedCapacity,
    tool_name: Option<&str>,
    reservation_ttl_ms: Option<u64>,
    cancel: &CancellationToken,
) -> WaitOutcome {
    let wait_ms = shared.lock().limits.capacity_wait_ms;
    let deadline = Instant::now() + Duration::from_millis(wait_ms);

    loop {
        let result = try_reserve(shared, requested, tool_name, reservation_ttl_ms, now_ms());
        if let Some(lease) = result.reservation {
            return WaitOutcome::Acquired(lease);
        }

        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            debug!(
                tool = tool_name.unwrap_or("unknown"),
                wait_ms, "capacity wait window elapsed"
            );
            return WaitOutcome::TimedOut;
        }

        let poll_ms = shared.lock().limits.capacity_poll_ms;
        let pause = Duration::from_millis(poll_ms).min(remaining);
        trace!(pause_ms = pause.as_millis() as u64, "capacity busy, polling");

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return WaitOutcome::Aborted,
            _ = sleep(pause) => {}
        }
    }
}
