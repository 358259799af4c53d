// src/collaborators/mod.rs
//! External collaborator interfaces
//!
//! The engine consumes these as narrow capability traits; real
//! implementations live outside this crate. Each trait ships one trivial
//! default so the core composes and unit-tests without them:
//!
//! - **Coordinator**: cross-process share of a provider quota
//! - **Adaptive**: learned concurrency ceilings and runtime parallelism overrides
//! - **Provider**: static/tiered provider limits
//! - **Retry**: backoff delay computation (the core never computes delays)

pub mod adaptive;
pub mod coordinator;
pub mod provider;
pub mod retry;

pub use adaptive::{
    AdaptiveRateController, NoAdjustment, ParallelismAdjuster, PassthroughRateController,
};
pub use coordinator::{CrossInstanceCoordinator, SoloCoordinator};
pub use provider::{ProviderLimitResolver, ProviderLimits, ProviderTier, StaticProviderLimits};
pub use retry::{FixedRetrySchedule, RetrySchedule};

use crate::capacity::limits::CapacityLimits;

/// Effective concurrent-inference ceiling after every collaborator has had
/// its say.
///
/// Reads `limits` fresh on each call — collaborators may lower ceilings
/// between calls, and a changed limits version means earlier projections are
/// stale. Floors at 1 so a misconfigured collaborator cannot wedge the
/// engine at zero inference slots.
pub fn effective_llm_limit(
    limits: &CapacityLimits,
    coordinator: &dyn CrossInstanceCoordinator,
    controller: &dyn AdaptiveRateController,
    adjuster: &dyn ParallelismAdjuster,
    provider: &str,
    model: &str,
) -> u64 {
    let mut limit = limits.max_total_active_llm;

    if coordinator.is_initialized() {
        if let Some(share) = coordinator.my_parallel_limit() {
            limit = limit.min(share);
        }
    }

    limit = controller.effective_limit(provider, model, limit);

    if let Some(parallelism) = adjuster.parallelism(provider, model) {
        limit = limit.min(parallelism);
    }

    limit.max(1)
}
