// src/collaborators/adaptive.rs
//! Adaptive rate control and runtime parallelism interfaces
//!
//! A real controller learns a lower concurrency ceiling from observed
//! rate-limit failures and decays back toward the default over time; a real
//! adjuster exposes an operator-tunable per-model override. The engine only
//! consumes the resulting numbers.

/// Learned concurrency ceiling per provider/model
pub trait AdaptiveRateController: Send + Sync {
    /// Effective ceiling, at most `default_limit` once learning kicks in
    fn effective_limit(&self, provider: &str, model: &str, default_limit: u64) -> u64;
}

/// Default: nothing learned, the default limit stands.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughRateController;

impl AdaptiveRateController for PassthroughRateController {
    fn effective_limit(&self, _provider: &str, _model: &str, default_limit: u64) -> u64 {
        default_limit
    }
}

/// Runtime-tunable per-model parallelism override
pub trait ParallelismAdjuster: Send + Sync {
    /// Override for this provider/model, or `None` to leave limits alone
    fn parallelism(&self, provider: &str, model: &str) -> Option<u64>;
}

/// Default: no override.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAdjustment;

impl ParallelismAdjuster for NoAdjustment {
    fn parallelism(&self, _provider: &str, _model: &str) -> Option<u64> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_passthrough_keeps_default() {
        let controller = PassthroughRateController;
        assert_eq!(controller.effective_limit("openai", "gpt-4o", 12), 12);
        assert_eq!(controller.effective_limit("anthropic", "claude", 0), 0);
    }

    #[test]
    fn test_no_adjustment_returns_none() {
        assert_eq!(NoAdjustment.parallelism("openai", "gpt-4o"), None);
    }
}
