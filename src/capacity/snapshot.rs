// src/capacity/snapshot.rs
//! Pure capacity snapshot
//!
//! Turns the runtime state into a consistent read-only view. Recomputed on
//! every query, never stored; identical state always yields an identical
//! snapshot. Every derived number clamps to zero so negative transient
//! counters never leak into dashboards or admission math.

use crate::capacity::limits::CapacityLimits;
use crate::capacity::queue::QueuePriority;
use crate::capacity::state::RuntimeState;
use serde::{Deserialize, Serialize};

/// Queued tool names shown in the snapshot, at most
pub const QUEUED_TOOLS_DISPLAY_CAP: usize = 16;

/// Pending-entry counts per priority bucket.
///
/// All five buckets are always present; the counts sum to
/// `queued_orchestrations`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityStats {
    pub critical: u64,
    pub high: u64,
    pub normal: u64,
    pub low: u64,
    pub background: u64,
}

impl PriorityStats {
    /// Sum across all buckets
    pub fn total(&self) -> u64 {
        self.critical + self.high + self.normal + self.low + self.background
    }
}

/// Consistent point-in-time view of aggregate resource usage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapacitySnapshot {
    /// Network-request slots held by sub-agent runs
    pub subagent_active_requests: u64,

    /// Inference slots held by sub-agent runs
    pub subagent_active_agents: u64,

    /// Network-request slots held by team runs
    pub team_active_runs: u64,

    /// Inference slots held by teammates
    pub team_active_agents: u64,

    /// Request slots promised by unconsumed reservations
    pub reserved_requests: u64,

    /// Inference slots promised by unconsumed reservations
    pub reserved_llm: u64,

    /// Unconsumed reservations outstanding
    pub active_reservations: u64,

    /// Orchestrations currently dispatched
    pub active_orchestrations: u64,

    /// True pending-queue length, uncapped
    pub queued_orchestrations: u64,

    /// First pending entries as `"tool:priority"`, capped for display
    pub queued_tools: Vec<String>,

    /// All network-request slots in flight (sub-agent requests + team runs)
    pub total_active_requests: u64,

    /// All inference slots in flight (sub-agent agents + teammates)
    pub total_active_llm: u64,

    /// Ceilings in force when the snapshot was taken
    pub limits: CapacityLimits,

    /// Version string of those ceilings
    pub limits_version: String,

    /// Pending-entry histogram by priority bucket
    pub priority_stats: PriorityStats,
}

fn clamp(value: i64) -> u64 {
    value.max(0) as u64
}

/// Compute a snapshot from the runtime state. Pure: no side effects, no
/// clock reads.
pub fn snapshot(state: &RuntimeState) -> CapacitySnapshot {
    let subagent_active_requests = clamp(state.subagents.active_run_requests);
    let subagent_active_agents = clamp(state.subagents.active_agents);
    let team_active_runs = clamp(state.teams.active_team_runs);
    let team_active_agents = clamp(state.teams.active_teammates);

    // Consumed reservations are live usage already tracked by the counters;
    // counting them here would double-bill.
    let mut reserved_requests: u64 = 0;
    let mut reserved_llm: u64 = 0;
    let mut active_reservations: u64 = 0;
    for record in &state.reservations {
        if record.consumed_at_ms.is_none() {
            reserved_requests += record.additional_requests;
            reserved_llm += record.additional_llm;
            active_reservations += 1;
        }
    }

    let queued_tools = state
        .queue
        .pending
        .iter()
        .take(QUEUED_TOOLS_DISPLAY_CAP)
        .map(|e| format!("{}:{}", e.tool_name, e.priority))
        .collect();

    let mut priority_stats = PriorityStats::default();
    for entry in &state.queue.pending {
        match entry.priority {
            QueuePriority::Critical => priority_stats.critical += 1,
            QueuePriority::High => priority_stats.high += 1,
            QueuePriority::Normal => priority_stats.normal += 1,
            QueuePriority::Low => priority_stats.low += 1,
            QueuePriority::Background => priority_stats.background += 1,
        }
    }

    CapacitySnapshot {
        subagent_active_requests,
        subagent_active_agents,
        team_active_runs,
        team_active_agents,
        reserved_requests,
        reserved_llm,
        active_reservations,
        active_orchestrations: clamp(state.queue.active_orchestrations),
        queued_orchestrations: state.queue.pending.len() as u64,
        queued_tools,
        total_active_requests: subagent_active_requests + team_active_runs,
        total_active_llm: subagent_active_agents + team_active_agents,
        limits: state.limits.clone(),
        limits_version: state.limits.version(),
        priority_stats,
    }
}
