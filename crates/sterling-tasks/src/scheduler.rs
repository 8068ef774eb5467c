//! Expansion-retry scheduler (spec.md §4.5 — component C5). Drives
//! `pending_planning` tasks blocked on a transient reason back toward
//! eligibility with exponential backoff, or terminates them once
//! `MAX_EXPANSION_RETRIES` is exhausted.

use async_trait::async_trait;
use tracing::warn;

use crate::blocked_reason::Classification;
use crate::task::{Step, Task, TaskStatus};
use crate::{blocked_reason, lifecycle};

pub const MAX_EXPANSION_RETRIES: u32 = 6;
const BASE_BACKOFF_MS: i64 = 30_000;
const MAX_BACKOFF_MS: i64 = 300_000;
const DEFAULT_RETRY_BUDGET: usize = 3;

/// Collaborator that turns a task's intent into executable steps. Grounded
/// on `sterling-leaves::Leaf`'s async-trait dispatch shape, not a concrete
/// reasoner implementation — `sterling-sim` supplies a stub, `sterling`
/// wires a real one.
#[async_trait]
pub trait ExpansionClient: Send + Sync {
    async fn expand(&self, task: &Task) -> Result<Vec<Step>, String>;
}

/// `nextEligibleAt` delta for the given retry count: `min(30000 * 2^n, 300000)`.
pub fn backoff_delay_ms(retry_count: u32) -> i64 {
    let scaled = BASE_BACKOFF_MS.saturating_mul(1_i64 << retry_count.min(32));
    scaled.min(MAX_BACKOFF_MS)
}

fn is_expansion_retry_candidate(task: &Task, now_ms: i64) -> bool {
    if task.status != TaskStatus::PendingPlanning {
        return false;
    }
    let Some(reason) = task.metadata.blocked_reason.as_deref() else {
        return false;
    };
    let is_transient = blocked_reason::lookup(reason)
        .map(|entry| entry.classification == Classification::Transient)
        .unwrap_or(false);
    if !is_transient {
        return false;
    }
    if task.metadata.expansion_retry_count >= MAX_EXPANSION_RETRIES {
        return false;
    }
    match task.metadata.next_eligible_at {
        Some(next) => now_ms >= next,
        None => true,
    }
}

/// One tick of the expansion-retry scheduler: selects up to `retry_budget`
/// candidate tasks (in `tasks` order), attempts expansion, and mutates each
/// task in place. Returns the ids of tasks it touched. Callers (the
/// executor's tick loop) are responsible for running TTL evaluation
/// ([`lifecycle::evaluate_task_block_state`]) before this, and eligible-task
/// selection after — this function only handles the retry step in between.
pub async fn retry_expansion(
    tasks: &mut [Task],
    client: &dyn ExpansionClient,
    now_ms: i64,
    retry_budget: usize,
) -> Vec<String> {
    let mut touched = Vec::new();
    for task in tasks.iter_mut() {
        if touched.len() >= retry_budget {
            break;
        }
        if !is_expansion_retry_candidate(task, now_ms) {
            continue;
        }

        match client.expand(task).await {
            Ok(steps) => {
                task.steps = steps;
                task.status = TaskStatus::Pending;
                task.clear_block();
                task.metadata.expansion_retry_count = 0;
                task.metadata.updated_at = now_ms;
            }
            Err(detail) => {
                task.metadata.expansion_retry_count += 1;
                task.metadata.updated_at = now_ms;
                if task.metadata.expansion_retry_count >= MAX_EXPANSION_RETRIES {
                    warn!(task_id = %task.id, %detail, "expansion retries exhausted");
                    task.metadata.blocked_reason = Some("expansion_retries_exhausted".to_string());
                    task.metadata.blocked_at = Some(now_ms);
                    task.metadata.next_eligible_at = None;
                } else {
                    let delay = backoff_delay_ms(task.metadata.expansion_retry_count);
                    task.metadata.next_eligible_at = Some(now_ms + delay);
                }
            }
        }
        touched.push(task.id.as_str().to_string());
    }
    touched
}

pub fn default_retry_budget() -> usize {
    DEFAULT_RETRY_BUDGET
}

/// Convenience wrapper combining TTL evaluation and expansion retry for a
/// single task, for callers that process tasks one at a time rather than in
/// a batch slice (spec.md §4.5's ordering rule: TTL eval before retry).
pub fn apply_ttl(task: &mut Task, now_ms: i64, default_ttl_ms: i64) {
    if let lifecycle::BlockState::ShouldFail { fail_reason } =
        lifecycle::evaluate_task_block_state(task, now_ms, default_ttl_ms)
    {
        warn!(task_id = %task.id, %fail_reason, "task failed on blocked-reason ttl");
        task.status = TaskStatus::Failed;
        task.metadata.updated_at = now_ms;
    }
}
