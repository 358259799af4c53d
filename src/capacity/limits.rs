// src/capacity/limits.rs
//! Capacity ceilings and admission timing knobs
//!
//! An immutable-per-snapshot record of the concurrency ceilings the engine
//! enforces, plus the polling window used while waiting for capacity. The
//! derived version string lets any consumer detect a ceiling change without
//! a deep comparison — external collaborators may lower effective ceilings
//! between calls, so projections computed against an older version are stale.

use serde::{Deserialize, Serialize};

/// Concurrency ceilings and timing knobs for admission control
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CapacityLimits {
    /// Total outstanding network requests across all execution kinds
    pub max_total_active_requests: u64,

    /// Total concurrent model-inference calls across all execution kinds
    pub max_total_active_llm: u64,

    /// Parallel sub-agents a single run may hold
    pub max_parallel_subagents_per_run: u64,

    /// Parallel team runs a single run may hold
    pub max_parallel_teams_per_run: u64,

    /// Parallel teammates within one team
    pub max_parallel_teammates_per_team: u64,

    /// Concurrently dispatched orchestrations
    pub max_concurrent_orchestrations: u64,

    /// Bounded depth of the pending admission queue
    pub max_queue_depth: u64,

    /// Total time a caller may poll for capacity before timing out
    pub capacity_wait_ms: u64,

    /// Re-check interval while polling for capacity
    pub capacity_poll_ms: u64,
}

impl Default for CapacityLimits {
    fn default() -> Self {
        Self {
            max_total_active_requests: 24,
            max_total_active_llm: 12,
            max_parallel_subagents_per_run: 8,
            max_parallel_teams_per_run: 4,
            max_parallel_teammates_per_team: 6,
            max_concurrent_orchestrations: 16,
            max_queue_depth: 256,
            capacity_wait_ms: 30_000, // 30s
            capacity_poll_ms: 250,
        }
    }
}

impl CapacityLimits {
    /// Deterministic join of every field.
    ///
    /// Equal limits always produce equal versions, and any ceiling change
    /// changes the version.
    pub fn version(&self) -> String {
        format!(
            "r{}-l{}-sa{}-tm{}-tt{}-o{}-q{}-w{}-p{}",
            self.max_total_active_requests,
            self.max_total_active_llm,
            self.max_parallel_subagents_per_run,
            self.max_parallel_teams_per_run,
            self.max_parallel_teammates_per_team,
            self.max_concurrent_orchestrations,
            self.max_queue_depth,
            self.capacity_wait_ms,
            self.capacity_poll_ms,
        )
    }

    /// Validate limits
    pub fn validate(&self) -> Result<(), String> {
        if self.max_total_active_requests == 0 {
            return Err("max_total_active_requests cannot be 0".to_string());
        }

        if self.max_total_active_llm == 0 {
            return Err("max_total_active_llm cannot be 0".to_string());
        }

        if self.max_queue_depth == 0 {
            return Err("max_queue_depth cannot be 0".to_string());
        }

        if self.capacity_poll_ms == 0 {
            return Err("capacity_poll_ms cannot be 0".to_string());
        }

        if self.capacity_poll_ms > self.capacity_wait_ms {
            return Err(format!(
                "capacity_poll_ms ({}) cannot exceed capacity_wait_ms ({})",
                self.capacity_poll_ms, self.capacity_wait_ms
            ));
        }

        Ok(())
    }

    /// Create strict limits (for constrained hosts)
    pub fn strict() -> Self {
        Self {
            max_total_active_requests: 8,
            max_total_active_llm: 4,
            max_parallel_subagents_per_run: 2,
            max_parallel_teams_per_run: 1,
            max_parallel_teammates_per_team: 3,
            max_concurrent_orchestrations: 4,
            max_queue_depth: 64,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_limits_validate() {
        assert!(CapacityLimits::default().validate().is_ok());
        assert!(CapacityLimits::strict().validate().is_ok());
    }

    #[test]
    fn test_version_is_deterministic() {
        let a = CapacityLimits::default();
        let b = CapacityLimits::default();
        assert_eq!(a.version(), b.version());
    }

    #[test]
    fn test_version_changes_with_any_ceiling() {
        let base = CapacityLimits::default();

        let changed = CapacityLimits {
            max_total_active_requests: base.max_total_active_requests + 1,
            ..base.clone()
        };
        assert_ne!(base.version(), changed.version());

        let changed = CapacityLimits {
            capacity_poll_ms: base.capacity_poll_ms + 1,
            ..base.clone()
        };
        assert_ne!(base.version(), changed.version());
    }

    #[test]
    fn test_validation_rejects_zero_ceilings() {
        let invalid = CapacityLimits {
            max_total_active_requests: 0,
            ..Default::default()
        };
        assert!(invalid.validate().is_err());

        let invalid = CapacityLimits {
            capacity_poll_ms: 0,
            ..Default::default()
        };
        assert!(invalid.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_poll_longer_than_wait() {
        let invalid = CapacityLimits {
            capacity_wait_ms: 100,
            capacity_poll_ms: 500,
            ..Default::default()
        };
        assert!(invalid.validate().is_err());
    }
}
