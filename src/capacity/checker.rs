// src/capacity/checker.rs
//! Capacity checker
//!
//! Decides admissibility of a hypothetical additional load against the
//! current state. Pure and total: denial is a declarative result, never an
//! error, and malformed input coerces to zero instead of panicking —
//! admission must survive buggy or adversarial callers.

use crate::capacity::snapshot::{snapshot, CapacitySnapshot};
use crate::capacity::state::RuntimeState;
use serde::{Deserialize, Serialize};

/// Hypothetical additional load, as supplied by a caller.
///
/// Carried as `f64` so the sanitizer can absorb whatever arrived at the
/// boundary (NaN, infinities, negatives, fractions).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct RequestedCapacity {
    /// Additional outstanding network requests
    pub additional_requests: f64,

    /// Additional concurrent inference calls
    pub additional_llm: f64,
}

impl RequestedCapacity {
    pub fn new(additional_requests: f64, additional_llm: f64) -> Self {
        Self {
            additional_requests,
            additional_llm,
        }
    }
}

impl From<(u64, u64)> for RequestedCapacity {
    fn from((requests, llm): (u64, u64)) -> Self {
        Self::new(requests as f64, llm as f64)
    }
}

/// Outcome of a capacity check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    /// May the load start now?
    pub allowed: bool,

    /// One entry per violated dimension; empty when allowed
    pub reasons: Vec<String>,

    /// Active + reserved + requested network requests
    pub projected_requests: u64,

    /// Active + reserved + requested inference calls
    pub projected_llm: u64,

    /// The snapshot the decision was made against
    pub snapshot: CapacitySnapshot,
}

/// Coerce a caller-supplied count to a safe non-negative integer.
///
/// Total: non-finite and negative values map to 0, fractions truncate
/// toward zero. Never panics.
pub fn sanitize_count(value: f64) -> u64 {
    if !value.is_finite() || value <= 0.0 {
        return 0;
    }
    // as-cast saturates at u64::MAX for oversized values
    value.trunc() as u64
}

/// Check whether the requested additional load fits under the limits.
///
/// Both currencies are evaluated independently and both can contribute a
/// reason in the same call. Equality with the limit is allowed. Pure: two
/// calls against unchanged state return equal results.
pub fn check(state: &RuntimeState, requested: RequestedCapacity) -> CheckResult {
    let snap = snapshot(state);
    let additional_requests = sanitize_count(requested.additional_requests);
    let additional_llm = sanitize_count(requested.additional_llm);

    let projected_requests = snap
        .total_active_requests
        .saturating_add(snap.reserved_requests)
        .saturating_add(additional_requests);
    let projected_llm = snap
        .total_active_llm
        .saturating_add(snap.reserved_llm)
        .saturating_add(additional_llm);

    let mut reasons = Vec::new();
    if projected_requests > snap.limits.max_total_active_requests {
        reasons.push(format!(
            "active requests would exceed capacity: projected {} > limit {}",
            projected_requests, snap.limits.max_total_active_requests
        ));
    }
    if projected_llm > snap.limits.max_total_active_llm {
        reasons.push(format!(
            "active llm calls would exceed capacity: projected {} > limit {}",
            projected_llm, snap.limits.max_total_active_llm
        ));
    }

    CheckResult {
        allowed: reasons.is_empty(),
        reasons,
        projected_requests,
        projected_llm,
        snapshot: snap,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capacity::limits::CapacityLimits;
    use proptest::prelude::*;

    fn state_with_request_limit(limit: u64) -> RuntimeState {
        RuntimeState::new(CapacityLimits {
            max_total_active_requests: limit,
            ..Default::default()
        })
    }

    #[test]
    fn test_zero_load_is_always_allowed() {
        let state = RuntimeState::default();
        let result = check(&state, RequestedCapacity::new(0.0, 0.0));
        assert!(result.allowed);
        assert!(result.reasons.is_empty());
    }

    #[test]
    fn test_equality_with_limit_is_allowed() {
        let state = state_with_request_limit(5);
        let result = check(&state, RequestedCapacity::new(5.0, 0.0));
        assert!(result.allowed);
        assert_eq!(result.projected_requests, 5);
    }

    #[test]
    fn test_exceeding_limit_is_denied_with_reason() {
        let state = state_with_request_limit(5);
        let result = check(&state, RequestedCapacity::new(6.0, 0.0));
        assert!(!result.allowed);
        assert_eq!(result.reasons.len(), 1);
        assert!(result.reasons[0].contains("projected 6"));
        assert!(result.reasons[0].contains("limit 5"));
        assert_eq!(result.projected_requests, 6);
    }

    #[test]
    fn test_both_dimensions_can_fail_together() {
        let state = RuntimeState::new(CapacityLimits {
            max_total_active_requests: 2,
            max_total_active_llm: 2,
            ..Default::default()
        });
        let result = check(&state, RequestedCapacity::new(3.0, 3.0));
        assert!(!result.allowed);
        assert_eq!(result.reasons.len(), 2);
        assert!(result.reasons[0].contains("requests"));
        assert!(result.reasons[1].contains("llm"));
    }

    #[test]
    fn test_projection_includes_active_and_reserved() {
        let mut state = state_with_request_limit(10);
        state.subagents.active_run_requests = 3;
        state.teams.active_team_runs = 2;
        state.reservations.push(
            crate::capacity::reservation::ReservationRecord::new(
                "resv-1-0".into(),
                "t",
                4,
                0,
                0,
                60_000,
            ),
        );

        let result = check(&state, RequestedCapacity::new(1.0, 0.0));
        assert_eq!(result.projected_requests, 10); // 5 active + 4 reserved + 1
        assert!(result.allowed);

        let result = check(&state, RequestedCapacity::new(2.0, 0.0));
        assert!(!result.allowed);
    }

    #[test]
    fn test_malformed_input_coerces_to_zero() {
        let state = RuntimeState::default();
        for value in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY, -3.0, -0.1] {
            let result = check(&state, RequestedCapacity::new(value, value));
            assert!(result.allowed, "value {value} should sanitize to 0");
            assert_eq!(result.projected_requests, 0);
            assert_eq!(result.projected_llm, 0);
        }
    }

    #[test]
    fn test_fractional_input_truncates() {
        let state = state_with_request_limit(5);
        let result = check(&state, RequestedCapacity::new(5.9, 0.0));
        assert!(result.allowed);
        assert_eq!(result.projected_requests, 5);
    }

    #[test]
    fn test_check_is_idempotent() {
        let mut state = state_with_request_limit(5);
        state.subagents.active_run_requests = 2;
        let a = check(&state, RequestedCapacity::new(1.0, 1.0));
        let b = check(&state, RequestedCapacity::new(1.0, 1.0));
        assert_eq!(a, b);
    }

    proptest! {
        #[test]
        fn prop_sanitize_count_is_total(value in proptest::num::f64::ANY) {
            // Must never panic and always produce a plain integer
            let _ = sanitize_count(value);
        }

        #[test]
        fn prop_sanitize_count_never_negative_or_fractional(value in proptest::num::f64::ANY) {
            let sanitized = sanitize_count(value);
            if value.is_finite() && value >= 1.0 {
                prop_assert!(sanitized >= 1);
            }
            if !value.is_finite() || value < 0.0 {
                prop_assert_eq!(sanitized, 0);
            }
        }
    }
}
