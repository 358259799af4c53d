// src/capacity/queue.rs
//! Priority admission queue
//!
//! Orders and bounds work waiting for a dispatch turn. Dispatch prefers
//! higher priority buckets; within a bucket an anti-starvation rule stops a
//! single tenant from monopolizing consecutive turns. The queue is bounded
//! by `limits.max_queue_depth`; overflow evicts deterministically (lowest
//! priority first, then oldest enqueued) and every eviction is counted.

use crate::capacity::state::RuntimeState;
use metrics::counter;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, trace, warn};
use ulid::Ulid;

/// Consecutive dispatch turns one tenant may win before another same-bucket
/// tenant is preferred
pub const MAX_CONSECUTIVE_DISPATCHES: u32 = 3;

/// Tenant key used for entries that did not declare one
const ANONYMOUS_TENANT: &str = "anonymous";

/// Priority bucket for queued work
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum QueuePriority {
    /// Sheddable background work
    Background = 0,
    /// Low
    Low = 1,
    /// Normal (default)
    #[default]
    Normal = 2,
    /// High
    High = 3,
    /// Critical (dispatched first)
    Critical = 4,
}

impl QueuePriority {
    /// Lowercase name, matching the serde representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Background => "background",
            Self::Low => "low",
            Self::Normal => "normal",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for QueuePriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A unit of work waiting for a dispatch turn
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueEntry {
    /// Unique entry id
    pub id: String,

    /// Tool requesting dispatch
    pub tool_name: String,

    /// Priority bucket (`Normal` when unspecified)
    #[serde(default)]
    pub priority: QueuePriority,

    /// Enqueue time (epoch ms)
    pub enqueued_at_ms: u64,

    /// Caller's duration estimate
    pub estimated_duration_ms: Option<u64>,

    /// Caller's round-count estimate
    pub estimated_rounds: Option<u32>,

    /// Absolute deadline; entries past it are dropped at dispatch time
    pub deadline_ms: Option<u64>,

    /// Origin of the request
    pub source: Option<String>,

    /// Scheduling class label
    pub queue_class: Option<String>,

    /// Fairness identity for anti-starvation bookkeeping
    pub tenant_key: Option<String>,

    /// Request slots the entry will need once dispatched
    pub additional_requests: Option<u64>,

    /// Inference slots the entry will need once dispatched
    pub additional_llm: Option<u64>,

    /// Times this entry was passed over by the anti-starvation rule
    pub skip_count: u32,
}

impl QueueEntry {
    /// Create an entry with a fresh ULID and `Normal` priority
    pub fn new(tool_name: impl Into<String>, now_ms: u64) -> Self {
        Self {
            id: Ulid::new().to_string(),
            tool_name: tool_name.into(),
            priority: QueuePriority::Normal,
            enqueued_at_ms: now_ms,
            estimated_duration_ms: None,
            estimated_rounds: None,
            deadline_ms: None,
            source: None,
            queue_class: None,
            tenant_key: None,
            additional_requests: None,
            additional_llm: None,
            skip_count: 0,
        }
    }

    pub fn with_priority(mut self, priority: QueuePriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_tenant(mut self, tenant_key: impl Into<String>) -> Self {
        self.tenant_key = Some(tenant_key.into());
        self
    }

    pub fn with_deadline(mut self, deadline_ms: u64) -> Self {
        self.deadline_ms = Some(deadline_ms);
        self
    }

    /// Is this entry past its deadline?
    pub fn is_expired(&self, now_ms: u64) -> bool {
        self.deadline_ms.map(|d| now_ms >= d).unwrap_or(false)
    }

    fn tenant(&self) -> &str {
        self.tenant_key.as_deref().unwrap_or(ANONYMOUS_TENANT)
    }
}

/// Outcome of an enqueue attempt
#[derive(Debug, Clone)]
pub struct EnqueueOutcome {
    /// Id of the entry that was enqueued
    pub entry_id: String,

    /// Entry evicted to make room, if the queue was full
    pub evicted: Option<QueueEntry>,
}

/// Add an entry to the pending queue, evicting if the bound is exceeded.
///
/// Eviction is deterministic: the lowest-priority entry goes first, oldest
/// `enqueued_at_ms` breaking ties. The incoming entry itself may lose that
/// comparison and be evicted immediately.
pub fn enqueue(state: &mut RuntimeState, entry: QueueEntry) -> EnqueueOutcome {
    let entry_id = entry.id.clone();
    let max_depth = state.limits.max_queue_depth as usize;

    trace!(
        tool = %entry.tool_name,
        priority = %entry.priority,
        "enqueueing admission request"
    );
    state.queue.pending.push(entry);

    let mut evicted = None;
    if state.queue.pending.len() > max_depth {
        let mut victim_idx = 0;
        for (i, candidate) in state.queue.pending.iter().enumerate().skip(1) {
            let victim = &state.queue.pending[victim_idx];
            if candidate.priority < victim.priority
                || (candidate.priority == victim.priority
                    && candidate.enqueued_at_ms < victim.enqueued_at_ms)
            {
                victim_idx = i;
            }
        }

        let victim = state.queue.pending.remove(victim_idx);
        warn!(
            tool = %victim.tool_name,
            priority = %victim.priority,
            "admission queue full, evicting entry"
        );
        state.queue.evicted_total += 1;
        counter!("capacity.queue.evicted").increment(1);
        evicted = Some(victim);
    }

    EnqueueOutcome { entry_id, evicted }
}

/// Pull the next entry due a dispatch turn, or `None` when nothing is
/// dispatchable.
///
/// Deadline-expired entries are dropped first. Dispatch is blocked while
/// `active_orchestrations` is at the ceiling. Within the winning priority
/// bucket the oldest entry wins, unless its tenant has just taken
/// [`MAX_CONSECUTIVE_DISPATCHES`] turns and another tenant is waiting in the
/// same bucket; then the oldest other-tenant entry wins and the passed-over
/// entry's `skip_count` increments.
pub fn dispatch_next(state: &mut RuntimeState, now_ms: u64) -> Option<QueueEntry> {
    let before = state.queue.pending.len();
    state.queue.pending.retain(|e| !e.is_expired(now_ms));
    let expired = before - state.queue.pending.len();
    if expired > 0 {
        debug!(expired, "dropped deadline-expired queue entries");
        counter!("capacity.queue.expired").increment(expired as u64);
    }

    if state.queue.active_orchestrations >= state.limits.max_concurrent_orchestrations as i64 {
        return None;
    }

    let best_priority = state.queue.pending.iter().map(|e| e.priority).max()?;

    // Oldest entry in the winning bucket
    let mut chosen_idx = None;
    for (i, entry) in state.queue.pending.iter().enumerate() {
        if entry.priority != best_priority {
            continue;
        }
        match chosen_idx {
            None => chosen_idx = Some(i),
            Some(j) if entry.enqueued_at_ms < state.queue.pending[j].enqueued_at_ms => {
                chosen_idx = Some(i)
            }
            _ => {}
        }
    }
    let mut chosen_idx = chosen_idx?;

    // Anti-starvation: after a streak by one tenant, prefer another tenant
    // from the same bucket.
    let chosen_tenant = state.queue.pending[chosen_idx].tenant().to_string();
    let streak = state
        .queue
        .consecutive_dispatches_by_tenant
        .get(&chosen_tenant)
        .copied()
        .unwrap_or(0);
    let on_streak = state.queue.last_dispatched_tenant_key.as_deref() == Some(chosen_tenant.as_str())
        && streak >= MAX_CONSECUTIVE_DISPATCHES;

    if on_streak {
        let alternative = state
            .queue
            .pending
            .iter()
            .enumerate()
            .filter(|(_, e)| e.priority == best_priority && e.tenant() != chosen_tenant)
            .min_by_key(|(_, e)| e.enqueued_at_ms)
            .map(|(i, _)| i);

        if let Some(alt_idx) = alternative {
            state.queue.pending[chosen_idx].skip_count += 1;
            trace!(
                tenant = %chosen_tenant,
                "tenant hit dispatch streak limit, yielding turn"
            );
            chosen_idx = alt_idx;
        }
    }

    let entry = state.queue.pending.remove(chosen_idx);
    let winner = entry.tenant().to_string();

    if state.queue.last_dispatched_tenant_key.as_deref() == Some(winner.as_str()) {
        *state
            .queue
            .consecutive_dispatches_by_tenant
            .entry(winner.clone())
            .or_insert(0) += 1;
    } else {
        state
            .queue
            .consecutive_dispatches_by_tenant
            .insert(winner.clone(), 1);
    }
    state.queue.last_dispatched_tenant_key = Some(winner);
    state.queue.active_orchestrations += 1;

    debug!(
        tool = %entry.tool_name,
        priority = %entry.priority,
        waited_ms = now_ms.saturating_sub(entry.enqueued_at_ms),
        "dispatching queued entry"
    );
    Some(entry)
}

/// Record completion of a previously dispatched orchestration
pub fn orchestration_finished(state: &mut RuntimeState) {
    state.queue.active_orchestrations -= 1;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capacity::limits::CapacityLimits;

    fn state_with_depth(depth: u64) -> RuntimeState {
        RuntimeState::new(CapacityLimits {
            max_queue_depth: depth,
            ..Default::default()
        })
    }

    fn entry(tool: &str, priority: QueuePriority, at_ms: u64) -> QueueEntry {
        QueueEntry::new(tool, at_ms).with_priority(priority)
    }

    #[test]
    fn test_priority_ordering() {
        assert!(QueuePriority::Critical > QueuePriority::High);
        assert!(QueuePriority::High > QueuePriority::Normal);
        assert!(QueuePriority::Normal > QueuePriority::Low);
        assert!(QueuePriority::Low > QueuePriority::Background);
        assert_eq!(QueuePriority::default(), QueuePriority::Normal);
    }

    #[test]
    fn test_dispatch_prefers_priority_then_age() {
        let mut state = state_with_depth(16);
        enqueue(&mut state, entry("low", QueuePriority::Low, 10));
        enqueue(&mut state, entry("normal_old", QueuePriority::Normal, 20));
        enqueue(&mut state, entry("normal_new", QueuePriority::Normal, 30));
        enqueue(&mut state, entry("critical", QueuePriority::Critical, 40));

        assert_eq!(dispatch_next(&mut state, 100).unwrap().tool_name, "critical");
        assert_eq!(
            dispatch_next(&mut state, 100).unwrap().tool_name,
            "normal_old"
        );
        assert_eq!(
            dispatch_next(&mut state, 100).unwrap().tool_name,
            "normal_new"
        );
        assert_eq!(dispatch_next(&mut state, 100).unwrap().tool_name, "low");
        assert!(dispatch_next(&mut state, 100).is_none());
    }

    #[test]
    fn test_eviction_prefers_lowest_priority_then_oldest() {
        let mut state = state_with_depth(2);
        enqueue(&mut state, entry("bg_old", QueuePriority::Background, 10));
        enqueue(&mut state, entry("bg_new", QueuePriority::Background, 20));

        let outcome = enqueue(&mut state, entry("high", QueuePriority::High, 30));
        let evicted = outcome.evicted.unwrap();
        assert_eq!(evicted.tool_name, "bg_old");
        assert_eq!(state.queue.evicted_total, 1);
        assert_eq!(state.queue.pending.len(), 2);
    }

    #[test]
    fn test_incoming_entry_can_be_evicted() {
        let mut state = state_with_depth(2);
        enqueue(&mut state, entry("high_a", QueuePriority::High, 10));
        enqueue(&mut state, entry("high_b", QueuePriority::High, 20));

        let outcome = enqueue(&mut state, entry("bg", QueuePriority::Background, 30));
        assert_eq!(outcome.evicted.unwrap().tool_name, "bg");
        assert_eq!(state.queue.pending.len(), 2);
    }

    #[test]
    fn test_deadline_expired_entries_are_dropped() {
        let mut state = state_with_depth(16);
        enqueue(
            &mut state,
            entry("stale", QueuePriority::Critical, 10).with_deadline(50),
        );
        enqueue(&mut state, entry("fresh", QueuePriority::Normal, 20));

        assert_eq!(dispatch_next(&mut state, 100).unwrap().tool_name, "fresh");
        assert!(state.queue.pending.is_empty());
    }

    #[test]
    fn test_dispatch_blocked_at_orchestration_ceiling() {
        let mut state = RuntimeState::new(CapacityLimits {
            max_concurrent_orchestrations: 1,
            ..Default::default()
        });
        enqueue(&mut state, entry("a", QueuePriority::Normal, 10));
        enqueue(&mut state, entry("b", QueuePriority::Normal, 20));

        assert!(dispatch_next(&mut state, 100).is_some());
        assert!(dispatch_next(&mut state, 100).is_none());

        orchestration_finished(&mut state);
        assert!(dispatch_next(&mut state, 100).is_some());
    }

    #[test]
    fn test_anti_starvation_yields_to_other_tenant() {
        let mut state = state_with_depth(16);
        for i in 0..4 {
            enqueue(
                &mut state,
                entry("a_tool", QueuePriority::Normal, 10 + i).with_tenant("tenant-a"),
            );
        }
        enqueue(
            &mut state,
            entry("b_tool", QueuePriority::Normal, 50).with_tenant("tenant-b"),
        );

        // Tenant A wins the first three turns (it holds the oldest entries)
        for _ in 0..MAX_CONSECUTIVE_DISPATCHES {
            let e = dispatch_next(&mut state, 100).unwrap();
            assert_eq!(e.tenant_key.as_deref(), Some("tenant-a"));
        }

        // Fourth turn yields to tenant B despite A's older entry
        let e = dispatch_next(&mut state, 100).unwrap();
        assert_eq!(e.tenant_key.as_deref(), Some("tenant-b"));

        // The passed-over entry recorded the skip
        assert_eq!(state.queue.pending[0].skip_count, 1);

        // A resumes once the streak is broken
        let e = dispatch_next(&mut state, 100).unwrap();
        assert_eq!(e.tenant_key.as_deref(), Some("tenant-a"));
    }

    #[test]
    fn test_single_tenant_is_not_blocked_by_its_own_streak() {
        let mut state = state_with_depth(16);
        for i in 0..6 {
            enqueue(
                &mut state,
                entry("only", QueuePriority::Normal, 10 + i).with_tenant("solo"),
            );
        }
        for _ in 0..6 {
            assert!(dispatch_next(&mut state, 100).is_some());
        }
    }
}
