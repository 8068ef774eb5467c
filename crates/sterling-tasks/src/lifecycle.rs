//! Task Lifecycle (spec.md §4.5 — component C5): eligibility and TTL
//! evaluation over the blocked-reason registry.

use crate::blocked_reason::{self, TtlPolicy};
use crate::task::{Task, TaskStatus};

const ELIGIBLE_STATUSES: [TaskStatus; 3] = [TaskStatus::Pending, TaskStatus::Active, TaskStatus::InProgress];

/// `isTaskEligible(task, now)` (spec.md §4.5). Blocked-reason and backoff
/// gate independently — either alone is enough to make a task ineligible.
pub fn is_task_eligible(task: &Task, now_ms: i64) -> bool {
    if !ELIGIBLE_STATUSES.contains(&task.status) {
        return false;
    }
    if task.status == TaskStatus::Pending && task.steps.is_empty() {
        return false;
    }
    if task.metadata.blocked_reason.is_some() {
        return false;
    }
    if let Some(next) = task.metadata.next_eligible_at {
        if now_ms < next {
            return false;
        }
    }
    true
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BlockState {
    NoAction,
    ShouldFail { fail_reason: String },
}

pub const DEFAULT_TTL_MS: i64 = 120_000;

/// `evaluateTaskBlockState(task, now, defaultTtlMs)` (spec.md §4.5).
pub fn evaluate_task_block_state(task: &Task, now_ms: i64, default_ttl_ms: i64) -> BlockState {
    let Some(reason) = task.metadata.blocked_reason.as_deref() else {
        return BlockState::NoAction;
    };
    let policy = blocked_reason::lookup(reason)
        .map(|entry| entry.ttl_policy)
        .unwrap_or(TtlPolicy::Default);

    let ttl_ms = match policy {
        TtlPolicy::Exempt => return BlockState::NoAction,
        TtlPolicy::Default => default_ttl_ms,
        TtlPolicy::Millis(ms) => ms as i64,
    };

    let blocked_at = task.metadata.blocked_at.unwrap_or(now_ms);
    if now_ms - blocked_at > ttl_ms {
        BlockState::ShouldFail {
            fail_reason: format!("blocked-ttl-exceeded:{reason}"),
        }
    } else {
        BlockState::NoAction
    }
}
