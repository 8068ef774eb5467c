//! Option (skill) types: shadow stats, quota, and shadow-run lifecycle
//! (spec.md §3, §4.6 — component C6).

use serde::{Deserialize, Serialize};
use sterling_bt::CompiledTree;
use sterling_leaves::Provenance;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionState {
    Shadow,
    Active,
    Retired,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct ShadowConfig {
    pub promotion_threshold: f64,
    pub max_shadow_runs: u32,
    pub auto_retirement_threshold: f64,
    pub min_runs_before_retirement: u32,
    pub grace_period_ms: i64,
}

impl Default for ShadowConfig {
    fn default() -> Self {
        Self {
            promotion_threshold: 0.8,
            max_shadow_runs: 10,
            auto_retirement_threshold: 0.3,
            min_runs_before_retirement: 5,
            grace_period_ms: 60_000,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct ShadowStats {
    pub total_runs: u32,
    pub successes: u32,
    pub failures: u32,
    pub last_run: Option<i64>,
}

impl ShadowStats {
    pub fn success_rate(&self) -> f64 {
        if self.total_runs == 0 {
            0.0
        } else {
            self.successes as f64 / self.total_runs as f64
        }
    }

    pub fn record(&mut self, success: bool, now_ms: i64) {
        self.total_runs += 1;
        if success {
            self.successes += 1;
        } else {
            self.failures += 1;
        }
        self.last_run = Some(now_ms);
    }
}

/// Token-bucket quota keyed by optionId (spec.md §4.6). A new window begins
/// once `now >= window_start + window_ms`, refilling to `limit` tokens.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Quota {
    pub limit: u32,
    pub window_ms: i64,
    pub tokens: u32,
    pub window_start: i64,
}

impl Quota {
    pub fn new(limit: u32, window_ms: i64, now_ms: i64) -> Self {
        Self {
            limit,
            window_ms,
            tokens: limit,
            window_start: now_ms,
        }
    }

    fn roll_window(&mut self, now_ms: i64) {
        if now_ms >= self.window_start + self.window_ms {
            self.tokens = self.limit;
            self.window_start = now_ms;
        }
    }

    /// `checkQuota(optionId) -> boolean`: rolls the window if expired, then
    /// consumes one token if available.
    pub fn check_and_consume(&mut self, now_ms: i64) -> bool {
        self.roll_window(now_ms);
        if self.tokens == 0 {
            return false;
        }
        self.tokens -= 1;
        true
    }
}

#[derive(Clone, Debug)]
pub struct RegisteredOption {
    pub id: sterling_core::OptionId,
    pub compiled: CompiledTree,
    pub provenance: Provenance,
    pub shadow_config: ShadowConfig,
    pub state: OptionState,
    pub stats: ShadowStats,
}
