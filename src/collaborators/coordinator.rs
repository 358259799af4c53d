// src/collaborators/coordinator.rs
//! Cross-instance coordinator interface
//!
//! Sibling processes sharing one external provider quota negotiate a fair
//! per-process share elsewhere; the engine only asks for the result and
//! scales its inference ceiling down accordingly.

/// Negotiated view of sibling processes sharing a provider quota
pub trait CrossInstanceCoordinator: Send + Sync {
    /// This process's negotiated parallelism share, if any
    fn my_parallel_limit(&self) -> Option<u64>;

    /// Has the coordinator joined a cohort yet?
    fn is_initialized(&self) -> bool;

    /// Sibling instances currently using this provider/model
    fn active_instances_for_model(&self, provider: &str, model: &str) -> u64;
}

/// Default for a process running alone: uncoordinated, no share override.
#[derive(Debug, Clone, Copy, Default)]
pub struct SoloCoordinator;

impl CrossInstanceCoordinator for SoloCoordinator {
    fn my_parallel_limit(&self) -> Option<u64> {
        None
    }

    fn is_initialized(&self) -> bool {
        false
    }

    fn active_instances_for_model(&self, _provider: &str, _model: &str) -> u64 {
        1
    }
}
