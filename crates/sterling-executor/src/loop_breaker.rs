//! Loop breaker (spec.md §4.7): escalates a recurring `(task, leaf,
//! failure_code)` triple to `blocked_infra_error_tripped` before the
//! executor spins forever retrying something that will never succeed.

use std::collections::HashMap;

use sterling_core::TaskId;

const DEFAULT_TRIP_THRESHOLD: u32 = 3;

/// Result of recording one failure occurrence for a `(task, leaf,
/// failure_code)` triple.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoopBreakerOutcome {
    pub occurrences: u32,
    pub tripped: bool,
}

#[derive(Clone, Debug, Hash, Eq, PartialEq)]
struct Triple {
    task_id: TaskId,
    leaf: String,
    failure_code: String,
}

/// Evaluated after each episode; set `loop_breaker_evaluated = true` in the
/// golden-run report regardless of outcome.
#[derive(Default)]
pub struct LoopBreaker {
    counts: HashMap<Triple, u32>,
    trip_threshold: u32,
}

impl LoopBreaker {
    pub fn new() -> Self {
        Self {
            counts: HashMap::new(),
            trip_threshold: DEFAULT_TRIP_THRESHOLD,
        }
    }

    pub fn with_threshold(trip_threshold: u32) -> Self {
        Self {
            counts: HashMap::new(),
            trip_threshold,
        }
    }

    /// Records one failure occurrence and reports the new occurrence count
    /// plus whether the triple has now recurred often enough to trip.
    pub fn record_failure(&mut self, task_id: &TaskId, leaf: &str, failure_code: &str) -> LoopBreakerOutcome {
        let key = Triple {
            task_id: task_id.clone(),
            leaf: leaf.to_string(),
            failure_code: failure_code.to_string(),
        };
        let count = self.counts.entry(key).or_insert(0);
        *count += 1;
        LoopBreakerOutcome {
            occurrences: *count,
            tripped: *count >= self.trip_threshold,
        }
    }

    pub fn clear_task(&mut self, task_id: &TaskId) {
        self.counts.retain(|k, _| &k.task_id != task_id);
    }
}
