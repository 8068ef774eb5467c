//! Impasse tracking for the Dynamic Creation Flow (spec.md §4.6 —
//! component C6). Partitioned strictly by `taskId`: failures on one task
//! never count toward another's impasse.

use std::collections::BTreeMap;

use sterling_core::TaskId;

#[derive(Clone, Copy, Debug, Default)]
pub struct ImpasseState {
    pub consecutive_failures: u32,
    pub last_failure_at: Option<i64>,
    pub last_proposal_at: Option<i64>,
    pub proposals_this_hour: u32,
    hour_window_start: i64,
}

#[derive(Clone, Copy, Debug)]
pub struct ImpasseConfig {
    pub failure_threshold: u32,
    pub time_window_ms: i64,
    pub debounce_ms: i64,
    pub hourly_proposal_cap: u32,
}

impl Default for ImpasseConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            time_window_ms: 60_000,
            debounce_ms: 300_000,
            hourly_proposal_cap: 4,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImpasseCheck {
    pub is_impasse: bool,
    pub reason: Option<String>,
}

/// `checkImpasse(taskId, failure) -> {isImpasse, reason?}` plus the
/// debounce/rate-limit bookkeeping the dynamic flow needs before it asks
/// the reasoner for a proposal.
#[derive(Default)]
pub struct ImpasseTracker {
    states: BTreeMap<TaskId, ImpasseState>,
    config: ImpasseConfig,
}

impl ImpasseTracker {
    pub fn new(config: ImpasseConfig) -> Self {
        Self {
            states: BTreeMap::new(),
            config,
        }
    }

    /// Records a failure for `task_id` and reports whether this constitutes
    /// an impasse. Failures outside `time_window_ms` of the previous one
    /// reset the streak rather than accumulating indefinitely.
    pub fn check_impasse(&mut self, task_id: &TaskId, now_ms: i64) -> ImpasseCheck {
        let state = self.states.entry(task_id.clone()).or_default();

        let within_window = state
            .last_failure_at
            .map(|last| now_ms - last <= self.config.time_window_ms)
            .unwrap_or(false);
        state.consecutive_failures = if within_window { state.consecutive_failures + 1 } else { 1 };
        state.last_failure_at = Some(now_ms);

        if state.consecutive_failures < self.config.failure_threshold {
            return ImpasseCheck {
                is_impasse: false,
                reason: None,
            };
        }

        let debounced = state
            .last_proposal_at
            .map(|last| now_ms < last + self.config.debounce_ms)
            .unwrap_or(false);
        if debounced {
            return ImpasseCheck {
                is_impasse: false,
                reason: Some("debounced".to_string()),
            };
        }

        ImpasseCheck {
            is_impasse: true,
            reason: Some(format!(
                "{} consecutive failures within {}ms",
                state.consecutive_failures, self.config.time_window_ms
            )),
        }
    }

    pub fn record_success(&mut self, task_id: &TaskId) {
        if let Some(state) = self.states.get_mut(task_id) {
            state.consecutive_failures = 0;
            state.last_failure_at = None;
        }
    }

    /// Rolls the hourly proposal-count window and consumes one slot.
    /// Returns `false` when the hourly cap has already been spent.
    pub fn try_reserve_proposal(&mut self, task_id: &TaskId, now_ms: i64) -> bool {
        let state = self.states.entry(task_id.clone()).or_default();
        if now_ms >= state.hour_window_start + 3_600_000 {
            state.hour_window_start = now_ms;
            state.proposals_this_hour = 0;
        }
        if state.proposals_this_hour >= self.config.hourly_proposal_cap {
            return false;
        }
        state.proposals_this_hour += 1;
        state.last_proposal_at = Some(now_ms);
        true
    }

    pub fn state_of(&self, task_id: &TaskId) -> Option<&ImpasseState> {
        self.states.get(task_id)
    }

    /// Read-only check: would a proposal request for `task_id` right now be
    /// suppressed by the debounce window (as opposed to never having been
    /// proposed, or the hourly cap)? Used by the executor to choose between
    /// `suppressed_lease_cooldown` and `suppressed_hourly_cap` without
    /// mutating tracker state.
    pub fn is_debounced(&self, task_id: &TaskId, now_ms: i64) -> bool {
        self.states
            .get(task_id)
            .and_then(|s| s.last_proposal_at)
            .map(|last| now_ms < last + self.config.debounce_ms)
            .unwrap_or(false)
    }

    /// Read-only check against the hourly proposal cap, without rolling the
    /// window or consuming a slot.
    pub fn is_hourly_capped(&self, task_id: &TaskId, now_ms: i64) -> bool {
        let Some(state) = self.states.get(task_id) else {
            return false;
        };
        if now_ms >= state.hour_window_start + 3_600_000 {
            return false;
        }
        state.proposals_this_hour >= self.config.hourly_proposal_cap
    }
}
