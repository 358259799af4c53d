// src/lib.rs
//! Agent Capacity Engine Library
//!
//! Admission control for concurrent AI agent workloads: decide cheaply and
//! correctly whether new work may start now, reserve its share of capacity
//! until it actually starts, release that share when it finishes or is
//! abandoned, and expose a live, consistent view of current load.
//!
//! # Architecture
//!
//! The engine is structured into several key modules:
//!
//! - **capacity**: the core — state store, snapshot, checker, reservation
//!   leases, priority admission queue, polling wait
//! - **collaborators**: capability interfaces for cross-instance
//!   coordination, adaptive rate control, provider limits, and retry timing
//! - **ops**: the operation surface exposed to the hosting agent
//! - **observability**: metrics, tracing, and logging
//! - **utils**: configuration, errors, and common helpers
//!
//! Two scarce currencies are tracked independently: outstanding network
//! requests and outstanding concurrent model-inference calls. Admission
//! outcomes are declarative result values, never errors, and every
//! admission function is total on caller-controlled input.

// Public module exports
pub mod capacity;
pub mod collaborators;
pub mod observability;
pub mod ops;
pub mod utils;

// Re-export commonly used types
pub use capacity::{
    shared_state, snapshot, try_reserve, CapacityLease, CapacityLimits, CapacitySnapshot,
    CheckResult, QueueEntry, QueuePriority, RequestedCapacity, RuntimeState, SharedRuntimeState,
    WaitOutcome,
};
pub use ops::{CapacityArgs, OpResponse};
pub use utils::config::EngineConfig;
pub use utils::errors::{EngineError, Result};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
